//! Integration tests for the admission bound and queue fairness.

mod helpers;

use slotgate_core::events::SessionNotice;
use slotgate_core::types::id::SessionId;
use slotgate_service::Placement;

#[tokio::test]
async fn test_concurrent_connects_respect_max_active() {
    let app = helpers::TestApp::new(2, 600, 120);

    let mut tasks = Vec::new();
    for _ in 0..5 {
        let gateway = app.gateway.clone();
        tasks.push(tokio::spawn(async move {
            gateway.connect(SessionId::new(), None).await
        }));
    }

    let mut admitted = 0;
    let mut positions = Vec::new();
    for task in tasks {
        match task.await.unwrap().unwrap() {
            Placement::Admitted { .. } => admitted += 1,
            Placement::Queued { position, .. } => positions.push(position),
        }
    }
    positions.sort_unstable();

    assert_eq!(admitted, 2);
    assert_eq!(positions, vec![1, 2, 3]);

    let counts = app.gateway.coordinator().counts().await;
    assert_eq!(counts.active, 2);
    assert_eq!(counts.waiting, 3);
}

#[tokio::test]
async fn test_release_promotes_longest_waiting() {
    let mut app = helpers::TestApp::new(1, 600, 120);
    let first = SessionId::new();
    let second = SessionId::new();
    let third = SessionId::new();

    app.gateway.connect(first, None).await.unwrap();
    app.gateway.connect(second, None).await.unwrap();
    app.gateway.connect(third, None).await.unwrap();
    app.drain();

    app.gateway.disconnect(first).await;

    let coordinator = app.gateway.coordinator();
    assert!(coordinator.is_active(&second).await);
    assert_eq!(coordinator.position(&third).await, Some(1));

    let notices = app.notices_for(second);
    assert_eq!(notices[0], SessionNotice::Admitted);
    assert!(matches!(
        notices[1],
        SessionNotice::ChoiceTimerStart { seconds: 120 }
    ));
}

#[tokio::test]
async fn test_disconnect_twice_is_noop() {
    let app = helpers::TestApp::new(1, 600, 120);
    let first = SessionId::new();
    let second = SessionId::new();
    let third = SessionId::new();

    app.gateway.connect(first, None).await.unwrap();
    app.gateway.connect(second, None).await.unwrap();
    app.gateway.connect(third, None).await.unwrap();

    app.gateway.disconnect(first).await;
    app.gateway.disconnect(first).await;

    // Only one slot was freed, so only one session was promoted.
    let coordinator = app.gateway.coordinator();
    assert!(coordinator.is_active(&second).await);
    assert_eq!(coordinator.position(&third).await, Some(1));
    let counts = coordinator.counts().await;
    assert_eq!(counts.active, 1);
    assert_eq!(counts.waiting, 1);
}

#[tokio::test]
async fn test_queued_session_cannot_reserve() {
    let mut app = helpers::TestApp::new(1, 600, 120);
    let event_id = app.event(5).await;
    let active = SessionId::new();
    let waiting = SessionId::new();

    app.gateway.connect(active, None).await.unwrap();
    app.gateway.connect(waiting, None).await.unwrap();
    app.drain();

    assert!(app.gateway.reserve(waiting, event_id).await.is_err());
    assert_eq!(app.available(event_id).await, 5);
    assert!(app.notices_for(waiting).iter().any(|n| matches!(
        n,
        SessionNotice::ReservationRejected { .. }
    )));
}
