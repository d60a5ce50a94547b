//! Slot ledger: the persisted source of truth for event capacity.
//!
//! Capacity is always derived as `total_slots - (temporary + confirmed)`.
//! Two implementations are provided:
//! - PostgreSQL (row lock on the event during capacity checks)
//! - In-memory (one `tokio::sync::Mutex` around both tables)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use slotgate_core::result::AppResult;
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use slotgate_entity::event::EventCapacity;
use slotgate_entity::reservation::{NewHold, Reservation};

pub use memory::MemorySlotLedger;
pub use postgres::PgSlotLedger;

/// Result of a capacity-checked hold attempt.
#[derive(Debug, Clone)]
pub enum HoldOutcome {
    /// The hold was persisted.
    Held(Reservation),
    /// The event was full at commit time.
    NoCapacity,
    /// The session already holds a temporary reservation for this event.
    DuplicateHold,
    /// The event does not exist.
    UnknownEvent,
}

/// Result of a confirmation attempt.
#[derive(Debug, Clone)]
pub enum ConfirmOutcome {
    /// The hold is now confirmed.
    Confirmed(Reservation),
    /// The hold had lapsed; it was deleted in the same transaction.
    Expired(Reservation),
    /// No temporary reservation matches the id and session.
    NotFound,
}

/// Identity recorded on a confirmed reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderDetails {
    /// Holder name.
    pub name: String,
    /// Holder contact.
    pub contact: String,
}

/// Transactional persistence interface for events and reservations.
///
/// Every method is atomic on its own: either fully applied or not at all.
/// Business rejections come back as outcome variants; `Err` is reserved for
/// infrastructure failures.
#[async_trait]
pub trait SlotLedger: Send + Sync + 'static {
    /// Place a temporary hold if the event still has room.
    ///
    /// Expired temporaries of the event are reaped first, so a lapsed hold
    /// never blocks a new one.
    async fn create_reservation_if_capacity(&self, hold: NewHold) -> AppResult<HoldOutcome>;

    /// Look up a reservation by id.
    async fn get_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>>;

    /// Confirm a temporary hold owned by `session_id`.
    async fn confirm_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
        holder: &HolderDetails,
        now: DateTime<Utc>,
    ) -> AppResult<ConfirmOutcome>;

    /// Delete a temporary hold owned by `session_id`.
    ///
    /// Returns the deleted row, or `None` if it was already gone.
    async fn delete_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
    ) -> AppResult<Option<Reservation>>;

    /// Delete every temporary hold owned by `session_id`.
    async fn delete_temporary_for_session(&self, session_id: SessionId)
    -> AppResult<Vec<Reservation>>;

    /// List temporary holds whose expiry is before `now`.
    async fn list_expired_temporary(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>>;

    /// Delete one hold if it is still temporary and still expired at `now`.
    ///
    /// Returns `false` if it was confirmed or removed in the meantime.
    async fn delete_expired_temporary(&self, id: ReservationId, now: DateTime<Utc>)
    -> AppResult<bool>;

    /// Current capacity of one event.
    async fn event_capacity(&self, event_id: EventId) -> AppResult<Option<EventCapacity>>;

    /// Current capacity of every event.
    async fn list_capacities(&self) -> AppResult<Vec<EventCapacity>>;
}
