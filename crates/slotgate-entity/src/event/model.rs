//! Event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotgate_core::types::id::EventId;
use sqlx::FromRow;

/// A reservable event.
///
/// Events are managed by an external admin surface; Slotgate only reads
/// them and locks their row while checking capacity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Total number of reservable slots.
    pub total_slots: i32,
    /// When the event takes place.
    pub scheduled_at: DateTime<Utc>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
}
