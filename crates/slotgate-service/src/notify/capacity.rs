//! Capacity broadcasts.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use slotgate_core::events::BroadcastEvent;
use slotgate_core::result::AppResult;
use slotgate_core::types::id::EventId;
use slotgate_database::SlotLedger;
use slotgate_entity::event::EventCapacity;

use super::publisher::NotificationPublisher;

/// Reads committed capacity from the ledger and publishes it.
///
/// The read and the publish happen under one mutex, so two concurrent
/// broadcasts for the same event can never go out in reverse order.
pub struct CapacityBroadcaster {
    ledger: Arc<dyn SlotLedger>,
    publisher: NotificationPublisher,
    order: Mutex<()>,
}

impl std::fmt::Debug for CapacityBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityBroadcaster").finish_non_exhaustive()
    }
}

impl CapacityBroadcaster {
    /// Create a new broadcaster.
    pub fn new(ledger: Arc<dyn SlotLedger>, publisher: NotificationPublisher) -> Self {
        Self {
            ledger,
            publisher,
            order: Mutex::new(()),
        }
    }

    /// Broadcast the current capacity of one event.
    pub async fn broadcast_event(&self, event_id: EventId) -> AppResult<()> {
        let _ordered = self.order.lock().await;
        match self.ledger.event_capacity(event_id).await? {
            Some(capacity) => self.publisher.broadcast(capacity_update(&capacity)),
            None => warn!(event_id = %event_id, "Capacity requested for unknown event"),
        }
        Ok(())
    }

    /// Broadcast the capacity of several events, each once.
    pub async fn broadcast_events(&self, event_ids: impl IntoIterator<Item = EventId>) {
        let distinct: BTreeSet<_> = event_ids.into_iter().map(EventId::into_uuid).collect();
        for uuid in distinct {
            let event_id = EventId::from_uuid(uuid);
            if let Err(e) = self.broadcast_event(event_id).await {
                warn!(event_id = %event_id, error = %e, "Capacity broadcast failed");
            }
        }
    }

    /// Broadcast the capacity of every event.
    pub async fn broadcast_all(&self) -> AppResult<()> {
        let _ordered = self.order.lock().await;
        for capacity in self.ledger.list_capacities().await? {
            self.publisher.broadcast(capacity_update(&capacity));
        }
        Ok(())
    }
}

fn capacity_update(capacity: &EventCapacity) -> BroadcastEvent {
    BroadcastEvent::CapacityUpdate {
        event_id: capacity.event_id,
        available_slots: capacity.available(),
        total_slots: capacity.total_slots,
    }
}
