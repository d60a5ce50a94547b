//! Integration tests for timer-driven cleanup through the sweeper.

mod helpers;

use chrono::{Duration, Utc};

use slotgate_core::events::SessionNotice;
use slotgate_core::types::id::SessionId;

#[tokio::test]
async fn test_lapsed_hold_freed_without_disconnect() {
    let mut app = helpers::TestApp::new(1, 600, 120);
    let event_id = app.event(1).await;
    let session_id = SessionId::new();
    app.gateway.connect(session_id, None).await.unwrap();
    let hold = app.gateway.reserve(session_id, event_id).await.unwrap();
    app.drain();

    let report = app.sweeper.sweep_at(Utc::now() + Duration::seconds(121)).await;

    assert_eq!(report.expired_holds, 1);
    assert_eq!(app.available(event_id).await, 1);
    assert!(app.notices_for(session_id).contains(&SessionNotice::ReservationExpired {
        reservation_id: hold.id,
        event_id,
    }));
}

#[tokio::test]
async fn test_lapsed_choice_requeues_and_promotes_head() {
    let mut app = helpers::TestApp::new(1, 600, 120);
    let first = SessionId::new();
    let second = SessionId::new();
    app.gateway.connect(first, None).await.unwrap();
    app.gateway.connect(second, None).await.unwrap();
    app.drain();

    let report = app.sweeper.sweep_at(Utc::now() + Duration::seconds(121)).await;
    assert_eq!(report.requeued, 1);

    let coordinator = app.gateway.coordinator();
    assert!(coordinator.is_active(&second).await);
    assert_eq!(coordinator.position(&first).await, Some(1));

    let outbound = app.drain();
    let for_session = |id: SessionId| {
        outbound
            .iter()
            .filter_map(move |o| match o {
                slotgate_core::events::Outbound::Session { session_id, notice } if *session_id == id => {
                    Some(notice.clone())
                }
                _ => None,
            })
            .collect::<Vec<_>>()
    };
    assert!(for_session(second).contains(&SessionNotice::Admitted));
    assert!(for_session(first).iter().any(|n| matches!(
        n,
        SessionNotice::RequeuedToTail { position: 1, .. }
    )));
}

#[tokio::test]
async fn test_stale_queue_entry_is_told_and_dropped() {
    let mut app = helpers::TestApp::new(1, 30, 120);
    let active = SessionId::new();
    let waiting = SessionId::new();
    app.gateway.connect(active, None).await.unwrap();
    app.gateway.connect(waiting, None).await.unwrap();
    app.drain();

    app.sweeper.sweep_at(Utc::now() + Duration::seconds(31)).await;

    assert_eq!(app.gateway.coordinator().position(&waiting).await, None);
    assert!(app.notices_for(waiting).contains(&SessionNotice::QueueTimedOut));
}
