//! Broadcast notifier: drains the outbound queue into connections.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use slotgate_core::events::Outbound;
use slotgate_service::notify::OutboundReceiver;

use crate::connection::manager::ConnectionManager;
use crate::message::types::OutboundMessage;
use crate::metrics::EngineMetrics;

/// Single consumer of the outbound notification queue.
///
/// Draining from one task preserves the order in which business logic
/// published, so every connection sees the same sequence of broadcasts.
#[derive(Debug)]
pub struct NotificationDispatcher {
    connections: Arc<ConnectionManager>,
    metrics: Arc<EngineMetrics>,
}

impl NotificationDispatcher {
    /// Create a dispatcher over the given connections.
    pub fn new(connections: Arc<ConnectionManager>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            connections,
            metrics,
        }
    }

    /// Deliver a single outbound notice.
    pub fn dispatch(&self, outbound: Outbound) {
        self.metrics.record_dispatched();
        match outbound {
            Outbound::Session { session_id, notice } => {
                let kind = notice.kind();
                if !self
                    .connections
                    .send_to_session(&session_id, &OutboundMessage::Notice(notice))
                {
                    debug!(session_id = %session_id, kind, "Session notice not delivered");
                }
            }
            Outbound::Broadcast { event } => {
                self.connections
                    .broadcast_all(&OutboundMessage::Broadcast(event));
            }
        }
    }

    /// Drain `rx` until the queue closes or shutdown is signalled.
    pub async fn run(&self, mut rx: OutboundReceiver, mut shutdown: watch::Receiver<bool>) {
        info!("Notification dispatcher started");
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(outbound) => self.dispatch(outbound),
                    None => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Notification dispatcher stopped");
    }
}
