//! Events delivered to every connected session.

use serde::{Deserialize, Serialize};

use crate::types::id::{EventId, SessionId};

/// One admitted session as shown in a status snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionView {
    /// Admitted session.
    pub session_id: SessionId,
    /// Seconds left in its choice window (never negative).
    pub time_left_seconds: i64,
}

/// Broadcast payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    /// Full admission state after any change.
    ///
    /// `revision` increases strictly with every snapshot so clients can drop
    /// stale ones.
    StatusSnapshot {
        /// Monotonic snapshot counter.
        revision: u64,
        /// Admitted sessions.
        active_sessions: Vec<ActiveSessionView>,
        /// Waiting sessions, head first.
        queue: Vec<SessionId>,
        /// Admission window size in force when the snapshot was taken.
        max_active_sessions: u32,
    },
    /// Remaining slots for one event.
    CapacityUpdate {
        /// Event.
        event_id: EventId,
        /// `capacity - (temporary + confirmed)`, floored at zero.
        available_slots: i64,
        /// Event capacity.
        total_slots: i64,
    },
}

impl BroadcastEvent {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusSnapshot { .. } => "status_snapshot",
            Self::CapacityUpdate { .. } => "capacity_update",
        }
    }
}
