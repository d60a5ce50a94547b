//! Reservation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use sqlx::FromRow;

use super::status::ReservationStatus;

/// A reservation row.
///
/// While temporary, the row is owned by a live session and carries an
/// expiry. Confirmation detaches it from the session and clears the expiry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    /// Unique reservation identifier.
    pub id: ReservationId,
    /// Reserved event.
    pub event_id: EventId,
    /// Owning session; `None` once confirmed.
    pub session_id: Option<SessionId>,
    /// Lifecycle status.
    pub status: ReservationStatus,
    /// Holder name, set on confirmation.
    pub holder_name: Option<String>,
    /// Holder contact, set on confirmation.
    pub holder_contact: Option<String>,
    /// When the hold was placed.
    pub created_at: DateTime<Utc>,
    /// When a temporary hold lapses; `None` once confirmed.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Whether this is a temporary hold past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Temporary
            && self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Whether `session_id` owns this reservation.
    pub fn is_owned_by(&self, session_id: &SessionId) -> bool {
        self.session_id.as_ref() == Some(session_id)
    }

    /// Whether the row counts against event capacity.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self.status,
            ReservationStatus::Temporary | ReservationStatus::Confirmed
        )
    }
}

/// Data required to place a temporary hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewHold {
    /// Event to hold a slot in.
    pub event_id: EventId,
    /// Holding session.
    pub session_id: SessionId,
    /// Hold creation time.
    pub created_at: DateTime<Utc>,
    /// Hold expiry.
    pub expires_at: DateTime<Utc>,
}
