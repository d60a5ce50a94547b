//! Sending half of the outbound notification queue.

use tokio::sync::mpsc;
use tracing::debug;

use slotgate_core::events::{BroadcastEvent, Outbound, SessionNotice};
use slotgate_core::types::id::SessionId;

/// Receiving half handed to the transport layer.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Publishes notices onto a single FIFO queue.
///
/// Sending never blocks, so it is safe to publish while holding the
/// admission lock; that is what keeps notices in commit order.
#[derive(Debug, Clone)]
pub struct NotificationPublisher {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl NotificationPublisher {
    /// Create a publisher and the receiver the transport drains.
    pub fn channel() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Address a notice to one session.
    pub fn to_session(&self, session_id: SessionId, notice: SessionNotice) {
        debug!(session_id = %session_id, kind = notice.kind(), "Publishing session notice");
        self.publish(Outbound::to_session(session_id, notice));
    }

    /// Address an event to every connected session.
    pub fn broadcast(&self, event: BroadcastEvent) {
        debug!(kind = event.kind(), "Publishing broadcast");
        self.publish(Outbound::broadcast(event));
    }

    fn publish(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            debug!("Notification queue closed; notice dropped");
        }
    }
}
