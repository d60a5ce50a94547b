//! In-memory slot ledger using `tokio::sync::Mutex`.
//!
//! Same semantics as the PostgreSQL ledger; one mutex around both tables
//! stands in for the event row lock. Used by the test-suite and by
//! single-process demos.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use slotgate_core::result::AppResult;
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use slotgate_entity::event::{Event, EventCapacity};
use slotgate_entity::reservation::{NewHold, Reservation, ReservationStatus};

use super::{ConfirmOutcome, HoldOutcome, HolderDetails, SlotLedger};

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<EventId, Event>,
    reservations: HashMap<ReservationId, Reservation>,
}

impl Tables {
    fn taken(&self, event_id: &EventId) -> i64 {
        self.reservations
            .values()
            .filter(|r| &r.event_id == event_id && r.occupies_slot())
            .count() as i64
    }

    fn capacity(&self, event: &Event) -> EventCapacity {
        EventCapacity {
            event_id: event.id,
            total_slots: i64::from(event.total_slots),
            taken: self.taken(&event.id),
        }
    }
}

/// Slot ledger held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemorySlotLedger {
    tables: Mutex<Tables>,
}

impl MemorySlotLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event and return its id.
    pub async fn add_event(&self, name: impl Into<String>, total_slots: i32) -> EventId {
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: name.into(),
            total_slots,
            scheduled_at: now + chrono::Duration::days(7),
            created_at: now,
        };
        let id = event.id;
        self.tables.lock().await.events.insert(id, event);
        id
    }

    /// Number of rows currently stored, across all events.
    pub async fn reservation_count(&self) -> usize {
        self.tables.lock().await.reservations.len()
    }
}

#[async_trait]
impl SlotLedger for MemorySlotLedger {
    async fn create_reservation_if_capacity(&self, hold: NewHold) -> AppResult<HoldOutcome> {
        let mut tables = self.tables.lock().await;

        let Some(total_slots) = tables.events.get(&hold.event_id).map(|e| e.total_slots) else {
            return Ok(HoldOutcome::UnknownEvent);
        };

        let before = tables.reservations.len();
        tables.reservations.retain(|_, r| {
            !(r.event_id == hold.event_id
                && r.status == ReservationStatus::Temporary
                && r.expires_at.is_some_and(|at| at < hold.created_at))
        });
        let reaped = before - tables.reservations.len();
        if reaped > 0 {
            debug!(event_id = %hold.event_id, reaped, "Reaped expired holds before capacity check");
        }

        let duplicate = tables.reservations.values().any(|r| {
            r.event_id == hold.event_id
                && r.status == ReservationStatus::Temporary
                && r.is_owned_by(&hold.session_id)
        });
        if duplicate {
            return Ok(HoldOutcome::DuplicateHold);
        }

        if tables.taken(&hold.event_id) >= i64::from(total_slots) {
            return Ok(HoldOutcome::NoCapacity);
        }

        let reservation = Reservation {
            id: ReservationId::new(),
            event_id: hold.event_id,
            session_id: Some(hold.session_id),
            status: ReservationStatus::Temporary,
            holder_name: None,
            holder_contact: None,
            created_at: hold.created_at,
            expires_at: Some(hold.expires_at),
        };
        tables
            .reservations
            .insert(reservation.id, reservation.clone());

        info!(
            reservation_id = %reservation.id,
            event_id = %reservation.event_id,
            "Temporary hold persisted"
        );
        Ok(HoldOutcome::Held(reservation))
    }

    async fn get_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
        Ok(self.tables.lock().await.reservations.get(&id).cloned())
    }

    async fn confirm_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
        holder: &HolderDetails,
        now: DateTime<Utc>,
    ) -> AppResult<ConfirmOutcome> {
        let mut tables = self.tables.lock().await;

        let matches = tables.reservations.get(&id).is_some_and(|r| {
            r.status == ReservationStatus::Temporary && r.is_owned_by(&session_id)
        });
        if !matches {
            return Ok(ConfirmOutcome::NotFound);
        }

        let expired = tables
            .reservations
            .get(&id)
            .is_some_and(|r| r.is_expired_at(now));
        if expired {
            return Ok(match tables.reservations.remove(&id) {
                Some(removed) => ConfirmOutcome::Expired(removed),
                None => ConfirmOutcome::NotFound,
            });
        }

        match tables.reservations.get_mut(&id) {
            Some(reservation) => {
                reservation.status = ReservationStatus::Confirmed;
                reservation.expires_at = None;
                reservation.session_id = None;
                reservation.holder_name = Some(holder.name.clone());
                reservation.holder_contact = Some(holder.contact.clone());
                Ok(ConfirmOutcome::Confirmed(reservation.clone()))
            }
            None => Ok(ConfirmOutcome::NotFound),
        }
    }

    async fn delete_reservation(
        &self,
        id: ReservationId,
        session_id: SessionId,
    ) -> AppResult<Option<Reservation>> {
        let mut tables = self.tables.lock().await;
        let owned_hold = tables.reservations.get(&id).is_some_and(|r| {
            r.status == ReservationStatus::Temporary && r.is_owned_by(&session_id)
        });
        if !owned_hold {
            return Ok(None);
        }
        Ok(tables.reservations.remove(&id))
    }

    async fn delete_temporary_for_session(
        &self,
        session_id: SessionId,
    ) -> AppResult<Vec<Reservation>> {
        let mut tables = self.tables.lock().await;
        let ids: Vec<ReservationId> = tables
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Temporary && r.is_owned_by(&session_id))
            .map(|r| r.id)
            .collect();
        Ok(ids
            .into_iter()
            .filter_map(|id| tables.reservations.remove(&id))
            .collect())
    }

    async fn list_expired_temporary(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
        let tables = self.tables.lock().await;
        let mut expired: Vec<Reservation> = tables
            .reservations
            .values()
            .filter(|r| r.is_expired_at(now))
            .cloned()
            .collect();
        expired.sort_by_key(|r| r.expires_at);
        Ok(expired)
    }

    async fn delete_expired_temporary(
        &self,
        id: ReservationId,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let still_expired = tables
            .reservations
            .get(&id)
            .is_some_and(|r| r.is_expired_at(now));
        if still_expired {
            tables.reservations.remove(&id);
        }
        Ok(still_expired)
    }

    async fn event_capacity(&self, event_id: EventId) -> AppResult<Option<EventCapacity>> {
        let tables = self.tables.lock().await;
        Ok(tables.events.get(&event_id).map(|e| tables.capacity(e)))
    }

    async fn list_capacities(&self) -> AppResult<Vec<EventCapacity>> {
        let tables = self.tables.lock().await;
        let mut events: Vec<&Event> = tables.events.values().collect();
        events.sort_by_key(|e| e.scheduled_at);
        Ok(events.into_iter().map(|e| tables.capacity(e)).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn hold(event_id: EventId, session_id: SessionId, ttl_seconds: i64) -> NewHold {
        let now = Utc::now();
        NewHold {
            event_id,
            session_id,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_seconds),
        }
    }

    fn holder() -> HolderDetails {
        HolderDetails {
            name: "Ada".to_string(),
            contact: "ada@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_parallel_holds_never_exceed_capacity() {
        let ledger = Arc::new(MemorySlotLedger::new());
        let event_id = ledger.add_event("Workshop", 1).await;

        let attempts = (0..16).map(|_| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                ledger
                    .create_reservation_if_capacity(hold(event_id, SessionId::new(), 120))
                    .await
                    .unwrap()
            })
        });
        let outcomes = futures::future::join_all(attempts).await;

        let held = outcomes
            .iter()
            .filter(|o| matches!(o.as_ref().unwrap(), HoldOutcome::Held(_)))
            .count();
        let full = outcomes
            .iter()
            .filter(|o| matches!(o.as_ref().unwrap(), HoldOutcome::NoCapacity))
            .count();
        assert_eq!(held, 1);
        assert_eq!(full, 15);
    }

    #[tokio::test]
    async fn test_duplicate_hold_rejected() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 5).await;
        let session = SessionId::new();

        let first = ledger
            .create_reservation_if_capacity(hold(event_id, session, 120))
            .await
            .unwrap();
        assert!(matches!(first, HoldOutcome::Held(_)));

        let second = ledger
            .create_reservation_if_capacity(hold(event_id, session, 120))
            .await
            .unwrap();
        assert!(matches!(second, HoldOutcome::DuplicateHold));
    }

    #[tokio::test]
    async fn test_expired_hold_reaped_on_next_capacity_check() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 1).await;

        let stale = ledger
            .create_reservation_if_capacity(hold(event_id, SessionId::new(), -5))
            .await
            .unwrap();
        assert!(matches!(stale, HoldOutcome::Held(_)));

        let fresh = ledger
            .create_reservation_if_capacity(hold(event_id, SessionId::new(), 120))
            .await
            .unwrap();
        assert!(matches!(fresh, HoldOutcome::Held(_)));
        assert_eq!(ledger.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn test_confirm_expired_deletes_row() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 1).await;
        let session = SessionId::new();

        let HoldOutcome::Held(reservation) = ledger
            .create_reservation_if_capacity(hold(event_id, session, 60))
            .await
            .unwrap()
        else {
            panic!("expected a hold");
        };

        let later = Utc::now() + chrono::Duration::seconds(61);
        let outcome = ledger
            .confirm_reservation(reservation.id, session, &holder(), later)
            .await
            .unwrap();
        assert!(matches!(outcome, ConfirmOutcome::Expired(_)));

        let capacity = ledger.event_capacity(event_id).await.unwrap().unwrap();
        assert_eq!(capacity.available(), 1);
    }

    #[tokio::test]
    async fn test_confirm_detaches_session_and_clears_expiry() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 1).await;
        let session = SessionId::new();

        let HoldOutcome::Held(reservation) = ledger
            .create_reservation_if_capacity(hold(event_id, session, 60))
            .await
            .unwrap()
        else {
            panic!("expected a hold");
        };

        let ConfirmOutcome::Confirmed(confirmed) = ledger
            .confirm_reservation(reservation.id, session, &holder(), Utc::now())
            .await
            .unwrap()
        else {
            panic!("expected confirmation");
        };
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert!(confirmed.session_id.is_none());
        assert!(confirmed.expires_at.is_none());

        // Disconnect cleanup must not touch confirmed rows.
        let removed = ledger.delete_temporary_for_session(session).await.unwrap();
        assert!(removed.is_empty());
        let capacity = ledger.event_capacity(event_id).await.unwrap().unwrap();
        assert_eq!(capacity.available(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_owner_checked() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 2).await;
        let owner = SessionId::new();

        let HoldOutcome::Held(reservation) = ledger
            .create_reservation_if_capacity(hold(event_id, owner, 60))
            .await
            .unwrap()
        else {
            panic!("expected a hold");
        };

        let stranger = ledger
            .delete_reservation(reservation.id, SessionId::new())
            .await
            .unwrap();
        assert!(stranger.is_none());

        assert!(
            ledger
                .delete_reservation(reservation.id, owner)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            ledger
                .delete_reservation(reservation.id, owner)
                .await
                .unwrap()
                .is_none()
        );
        let capacity = ledger.event_capacity(event_id).await.unwrap().unwrap();
        assert_eq!(capacity.taken, 0);
    }

    #[tokio::test]
    async fn test_delete_expired_skips_rows_that_were_confirmed() {
        let ledger = MemorySlotLedger::new();
        let event_id = ledger.add_event("Workshop", 1).await;
        let session = SessionId::new();

        let HoldOutcome::Held(reservation) = ledger
            .create_reservation_if_capacity(hold(event_id, session, 60))
            .await
            .unwrap()
        else {
            panic!("expected a hold");
        };
        ledger
            .confirm_reservation(reservation.id, session, &holder(), Utc::now())
            .await
            .unwrap();

        let much_later = Utc::now() + chrono::Duration::hours(1);
        assert!(
            !ledger
                .delete_expired_temporary(reservation.id, much_later)
                .await
                .unwrap()
        );
        assert!(
            ledger
                .list_expired_temporary(much_later)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
