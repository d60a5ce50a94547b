//! WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::USER_AGENT;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use slotgate_realtime::connection::heartbeat::run_heartbeat;

use crate::state::AppState;

/// GET /ws: every connection is one anonymous session.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let browser_info = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    ws.on_upgrade(move |socket| handle_ws_connection(state, browser_info, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, browser_info: Option<String>, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let opened = state.realtime.connections.open(browser_info).await;
    let handle = opened.handle;
    let session_id = handle.session_id;
    let mut outbound_rx = opened.outbound;

    info!(
        session_id = %session_id,
        admitted = opened.placement.is_ok(),
        "WebSocket connection established"
    );

    // Forward queued frames to the socket
    let outbound_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let mut heartbeat = tokio::spawn(run_heartbeat(handle.clone(), state.realtime.heartbeat));
    let mut shutdown = state.realtime.shutdown_receiver();

    loop {
        tokio::select! {
            _ = &mut heartbeat => break,
            _ = shutdown.changed() => break,
            next = ws_rx.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    state
                        .realtime
                        .connections
                        .handle_inbound(session_id, text.as_str())
                        .await;
                }
                Some(Ok(Message::Pong(_))) => handle.record_pong().await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    // Cleanup: the disconnect path releases admission and holds.
    heartbeat.abort();
    state.realtime.connections.close(session_id).await;
    outbound_task.abort();

    info!(session_id = %session_id, "WebSocket connection closed");
}
