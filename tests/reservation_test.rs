//! Integration tests for holds, capacity, and cancellation.

mod helpers;

use slotgate_core::events::{RejectionReason, SessionNotice};
use slotgate_core::types::id::SessionId;

#[tokio::test]
async fn test_parallel_holds_on_last_slot() {
    let app = helpers::TestApp::new(20, 600, 120);
    let event_id = app.event(1).await;

    let mut sessions = Vec::new();
    for _ in 0..20 {
        let session_id = SessionId::new();
        app.gateway.connect(session_id, None).await.unwrap();
        sessions.push(session_id);
    }

    let mut tasks = Vec::new();
    for session_id in sessions {
        let gateway = app.gateway.clone();
        tasks.push(tokio::spawn(async move {
            gateway.reserve(session_id, event_id).await
        }));
    }

    let mut held = 0;
    let mut full = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => held += 1,
            Err(RejectionReason::NoCapacity) => full += 1,
            Err(other) => panic!("unexpected rejection {other:?}"),
        }
    }

    assert_eq!(held, 1);
    assert_eq!(full, 19);
    assert_eq!(app.available(event_id).await, 0);
}

#[tokio::test]
async fn test_second_hold_on_same_event_is_duplicate() {
    let app = helpers::TestApp::new(1, 600, 120);
    let event_id = app.event(3).await;
    let session_id = SessionId::new();
    app.gateway.connect(session_id, None).await.unwrap();

    app.gateway.reserve(session_id, event_id).await.unwrap();
    assert_eq!(
        app.gateway.reserve(session_id, event_id).await.unwrap_err(),
        RejectionReason::DuplicateHold
    );
    assert_eq!(app.available(event_id).await, 2);
}

#[tokio::test]
async fn test_cancel_twice_frees_one_slot() {
    let app = helpers::TestApp::new(2, 600, 120);
    let event_id = app.event(2).await;
    let first = SessionId::new();
    let second = SessionId::new();
    app.gateway.connect(first, None).await.unwrap();
    app.gateway.connect(second, None).await.unwrap();

    let hold = app.gateway.reserve(first, event_id).await.unwrap();
    app.gateway.reserve(second, event_id).await.unwrap();
    assert_eq!(app.available(event_id).await, 0);

    assert!(app.gateway.cancel(first, hold.id).await.unwrap().is_some());
    assert!(app.gateway.cancel(first, hold.id).await.unwrap().is_none());
    assert_eq!(app.available(event_id).await, 1);
}

#[tokio::test]
async fn test_confirm_keeps_slot_after_disconnect() {
    let mut app = helpers::TestApp::new(1, 600, 120);
    let event_id = app.event(1).await;
    let session_id = SessionId::new();
    app.gateway.connect(session_id, None).await.unwrap();

    let hold = app.gateway.reserve(session_id, event_id).await.unwrap();
    let confirmed = app
        .gateway
        .confirm(session_id, hold.id, "Ada Lovelace", "+44 20 7946 0000")
        .await
        .unwrap();
    assert_eq!(confirmed.holder_name.as_deref(), Some("Ada Lovelace"));

    app.gateway.disconnect(session_id).await;
    assert_eq!(app.available(event_id).await, 0);

    assert!(app.drain().iter().any(|o| matches!(
        o,
        slotgate_core::events::Outbound::Session {
            notice: SessionNotice::ReservationConfirmed { .. },
            ..
        }
    )));
}

#[tokio::test]
async fn test_blank_holder_is_rejected() {
    let app = helpers::TestApp::new(1, 600, 120);
    let event_id = app.event(1).await;
    let session_id = SessionId::new();
    app.gateway.connect(session_id, None).await.unwrap();
    let hold = app.gateway.reserve(session_id, event_id).await.unwrap();

    assert_eq!(
        app.gateway
            .confirm(session_id, hold.id, "   ", "555-0100")
            .await
            .unwrap_err(),
        RejectionReason::InvalidHolder
    );
}
