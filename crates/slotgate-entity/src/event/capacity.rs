//! Derived event capacity.

use serde::{Deserialize, Serialize};
use slotgate_core::types::id::EventId;
use sqlx::FromRow;

/// Capacity of one event, derived from its live reservations.
///
/// `taken` counts temporary and confirmed reservations; availability is
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventCapacity {
    /// Event.
    pub event_id: EventId,
    /// Configured slot count.
    pub total_slots: i64,
    /// Temporary plus confirmed reservations.
    pub taken: i64,
}

impl EventCapacity {
    /// Free slots, floored at zero.
    pub fn available(&self) -> i64 {
        (self.total_slots - self.taken).max(0)
    }

    /// Whether another hold fits.
    pub fn has_room(&self) -> bool {
        self.taken < self.total_slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_never_negative() {
        let capacity = EventCapacity {
            event_id: EventId::new(),
            total_slots: 2,
            taken: 3,
        };
        assert_eq!(capacity.available(), 0);
        assert!(!capacity.has_room());
    }
}
