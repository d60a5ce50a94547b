//! Connection manager: connection lifecycle and inbound message routing.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use slotgate_core::config::RealtimeConfig;
use slotgate_core::events::RejectionReason;
use slotgate_core::types::id::SessionId;
use slotgate_service::{Placement, SessionGateway};

use crate::message::types::{InboundMessage, OutboundMessage};
use crate::metrics::EngineMetrics;

use super::handle::ConnectionHandle;
use super::pool::ConnectionPool;

/// A freshly opened connection.
#[derive(Debug)]
pub struct OpenedConnection {
    /// Handle registered in the pool.
    pub handle: Arc<ConnectionHandle>,
    /// Serialized frames for the socket writer.
    pub outbound: mpsc::Receiver<String>,
    /// Admission outcome. `Err` leaves the session connected but unadmitted.
    pub placement: Result<Placement, RejectionReason>,
}

/// Manages all active WebSocket connections.
#[derive(Debug)]
pub struct ConnectionManager {
    pool: ConnectionPool,
    gateway: Arc<SessionGateway>,
    metrics: Arc<EngineMetrics>,
    config: RealtimeConfig,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        gateway: Arc<SessionGateway>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(),
            gateway,
            metrics,
            config,
        }
    }

    /// Open a connection and run it through admission.
    ///
    /// The handle is in the pool before the gateway is called so the
    /// session's own admission notice has somewhere to go.
    pub async fn open(&self, browser_info: Option<String>) -> OpenedConnection {
        let session_id = SessionId::new();
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size.max(1));
        let handle = Arc::new(ConnectionHandle::new(session_id, browser_info.clone(), tx));

        self.pool.add(handle.clone());
        self.metrics.connection_opened();
        info!(session_id = %session_id, "WebSocket connection registered");

        let placement = self.gateway.connect(session_id, browser_info).await;
        self.broadcast_online_users();

        OpenedConnection {
            handle,
            outbound: rx,
            placement,
        }
    }

    /// Close a connection. Safe to call more than once.
    pub async fn close(&self, session_id: SessionId) {
        let Some(handle) = self.pool.remove(&session_id) else {
            return;
        };
        handle.mark_dead();
        self.metrics.connection_closed();

        self.gateway.disconnect(session_id).await;
        self.broadcast_online_users();

        info!(session_id = %session_id, "WebSocket connection unregistered");
    }

    /// Processes an inbound text frame from a client.
    pub async fn handle_inbound(&self, session_id: SessionId, raw_message: &str) {
        let Some(handle) = self.pool.get(&session_id) else {
            warn!(session_id = %session_id, "Message from unknown connection");
            return;
        };
        self.metrics.record_received();

        let msg: InboundMessage = match serde_json::from_str(raw_message) {
            Ok(m) => m,
            Err(e) => {
                self.metrics.record_malformed();
                debug!(session_id = %session_id, error = %e, "Unparseable client message");
                self.send_message(
                    &handle,
                    &OutboundMessage::error("INVALID_MESSAGE", format!("Failed to parse message: {e}")),
                );
                return;
            }
        };

        // Rejections reach the client through the notification queue.
        match msg {
            InboundMessage::Reserve { event_id } => {
                let _ = self.gateway.reserve(session_id, event_id).await;
            }
            InboundMessage::Confirm {
                reservation_id,
                holder_name,
                holder_contact,
            } => {
                let _ = self
                    .gateway
                    .confirm(session_id, reservation_id, &holder_name, &holder_contact)
                    .await;
            }
            InboundMessage::Cancel { reservation_id } => {
                let _ = self.gateway.cancel(session_id, reservation_id).await;
            }
            InboundMessage::Pong { .. } => handle.record_pong().await,
        }
    }

    /// Sends a message to one session, if it is still connected.
    pub fn send_to_session(&self, session_id: &SessionId, message: &OutboundMessage) -> bool {
        match self.pool.get(session_id) {
            Some(handle) => self.send_message(&handle, message),
            None => false,
        }
    }

    /// Broadcasts a message to every connection.
    pub fn broadcast_all(&self, message: &OutboundMessage) -> usize {
        let frame = match message.to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to serialize broadcast");
                return 0;
            }
        };
        let mut delivered = 0;
        for handle in self.pool.all_connections() {
            let ok = handle.send(frame.clone());
            self.metrics.record_send(ok);
            if ok {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Looks up the handle for a session.
    pub fn handle(&self, session_id: &SessionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(session_id)
    }

    /// Close every connection, running each through the disconnect path.
    pub async fn close_all(&self) {
        let handles = self.pool.all_connections();
        let count = handles.len();
        for handle in handles {
            self.close(handle.session_id).await;
        }
        info!(count, "Closed all WebSocket connections");
    }

    fn send_message(&self, handle: &ConnectionHandle, message: &OutboundMessage) -> bool {
        let ok = match message.to_json() {
            Ok(frame) => handle.send(frame),
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound message");
                false
            }
        };
        self.metrics.record_send(ok);
        ok
    }

    fn broadcast_online_users(&self) {
        self.broadcast_all(&OutboundMessage::online_users(self.connection_count()));
    }
}
