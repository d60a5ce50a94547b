//! Reservation state machine over the slot ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use slotgate_core::error::AppError;
use slotgate_core::events::SessionNotice;
use slotgate_core::result::AppResult;
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use slotgate_core::types::settings::AdmissionSettings;
use slotgate_database::ledger::{ConfirmOutcome, HoldOutcome, SlotLedger};
use slotgate_entity::reservation::{NewHold, Reservation};

use super::holder::validate_holder;
use crate::notify::{CapacityBroadcaster, NotificationPublisher};

/// What one expiry pass did.
#[derive(Debug, Clone, Default)]
pub struct ExpiryReport {
    /// Holds that were deleted.
    pub expired: Vec<Reservation>,
    /// Holds whose deletion failed and will be retried next pass.
    pub failed: usize,
}

/// Drives reservations through `temporary -> confirmed | expired | cancelled`.
///
/// Business rejections come back as user-visible [`AppError`] kinds
/// (`NoCapacity`, `DuplicateHold`, `Expired`, `NotFound`, `Validation`).
/// Persistence failures are logged and reported as the nearest of those,
/// never left half-applied.
pub struct ReservationService {
    ledger: Arc<dyn SlotLedger>,
    capacity: Arc<CapacityBroadcaster>,
    publisher: NotificationPublisher,
}

impl std::fmt::Debug for ReservationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationService").finish_non_exhaustive()
    }
}

impl ReservationService {
    /// Create a new reservation service.
    pub fn new(
        ledger: Arc<dyn SlotLedger>,
        capacity: Arc<CapacityBroadcaster>,
        publisher: NotificationPublisher,
    ) -> Self {
        Self {
            ledger,
            capacity,
            publisher,
        }
    }

    /// Place a temporary hold lasting one choice window.
    ///
    /// The caller must already have checked that the session is admitted.
    pub async fn create_hold(
        &self,
        event_id: EventId,
        session_id: SessionId,
        settings: &AdmissionSettings,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let hold = NewHold {
            event_id,
            session_id,
            created_at: now,
            expires_at: now + settings.choice_timeout(),
        };

        let outcome = self
            .ledger
            .create_reservation_if_capacity(hold)
            .await
            .map_err(|e| {
                error!(event_id = %event_id, session_id = %session_id, error = %e, "Hold failed in ledger");
                AppError::no_capacity("Could not place hold")
            })?;

        match outcome {
            HoldOutcome::Held(reservation) => {
                info!(
                    reservation_id = %reservation.id,
                    event_id = %event_id,
                    session_id = %session_id,
                    "Temporary hold placed"
                );
                self.broadcast_capacity(event_id).await;
                Ok(reservation)
            }
            HoldOutcome::NoCapacity => Err(AppError::no_capacity("Event is full")),
            HoldOutcome::DuplicateHold => Err(AppError::duplicate_hold(
                "Session already holds a slot for this event",
            )),
            HoldOutcome::UnknownEvent => Err(AppError::not_found("Event not found")),
        }
    }

    /// Confirm a temporary hold owned by the session.
    ///
    /// A hold past its expiry is deleted on the spot and reported as
    /// `Expired`.
    pub async fn confirm(
        &self,
        reservation_id: ReservationId,
        session_id: SessionId,
        holder_name: &str,
        holder_contact: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let holder = validate_holder(holder_name, holder_contact)?;

        let outcome = self
            .ledger
            .confirm_reservation(reservation_id, session_id, &holder, now)
            .await
            .map_err(|e| {
                error!(reservation_id = %reservation_id, error = %e, "Confirm failed in ledger");
                AppError::not_found("Reservation not found")
            })?;

        match outcome {
            ConfirmOutcome::Confirmed(reservation) => {
                info!(
                    reservation_id = %reservation.id,
                    event_id = %reservation.event_id,
                    "Reservation confirmed"
                );
                self.broadcast_capacity(reservation.event_id).await;
                Ok(reservation)
            }
            ConfirmOutcome::Expired(stale) => {
                warn!(
                    reservation_id = %stale.id,
                    event_id = %stale.event_id,
                    "Confirmation arrived after expiry, hold removed"
                );
                self.broadcast_capacity(stale.event_id).await;
                Err(AppError::expired("Hold has expired"))
            }
            ConfirmOutcome::NotFound => {
                self.log_unconfirmable(reservation_id, session_id).await;
                Err(AppError::not_found("Reservation not found"))
            }
        }
    }

    async fn log_unconfirmable(&self, reservation_id: ReservationId, session_id: SessionId) {
        match self.ledger.get_reservation(reservation_id).await {
            Ok(Some(existing)) if !existing.is_owned_by(&session_id) => warn!(
                reservation_id = %reservation_id,
                session_id = %session_id,
                "Confirm attempted on a hold owned by another session"
            ),
            Ok(Some(existing)) => info!(
                reservation_id = %reservation_id,
                status = existing.status.as_str(),
                "Confirm attempted on a hold that is no longer temporary"
            ),
            Ok(None) => info!(reservation_id = %reservation_id, "Confirm attempted on unknown reservation"),
            Err(e) => warn!(reservation_id = %reservation_id, error = %e, "Reservation lookup failed"),
        }
    }

    /// Cancel one temporary hold owned by the session.
    ///
    /// Returns `None` if it was already gone.
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        session_id: SessionId,
    ) -> AppResult<Option<Reservation>> {
        let removed = self
            .ledger
            .delete_reservation(reservation_id, session_id)
            .await
            .map_err(|e| {
                error!(reservation_id = %reservation_id, error = %e, "Cancel failed in ledger");
                AppError::not_found("Reservation not found")
            })?;

        if let Some(reservation) = &removed {
            info!(
                reservation_id = %reservation.id,
                event_id = %reservation.event_id,
                "Temporary hold cancelled"
            );
            self.broadcast_capacity(reservation.event_id).await;
        }
        Ok(removed)
    }

    /// Cancel every temporary hold owned by the session.
    pub async fn cancel_for_session(&self, session_id: SessionId) -> AppResult<Vec<Reservation>> {
        let removed = self.ledger.delete_temporary_for_session(session_id).await?;
        if !removed.is_empty() {
            info!(
                session_id = %session_id,
                count = removed.len(),
                "Session holds cancelled"
            );
            self.capacity
                .broadcast_events(removed.iter().map(|r| r.event_id))
                .await;
        }
        Ok(removed)
    }

    /// Delete every hold that lapsed before `now` and tell its owner.
    ///
    /// A failing row is logged and skipped; the rest are still processed.
    pub async fn expire_lapsed(&self, now: DateTime<Utc>) -> AppResult<ExpiryReport> {
        let candidates = self.ledger.list_expired_temporary(now).await?;
        let mut report = ExpiryReport::default();

        for reservation in candidates {
            match self.ledger.delete_expired_temporary(reservation.id, now).await {
                Ok(true) => {
                    if let Some(owner) = reservation.session_id {
                        self.publisher.to_session(
                            owner,
                            SessionNotice::ReservationExpired {
                                reservation_id: reservation.id,
                                event_id: reservation.event_id,
                            },
                        );
                    }
                    report.expired.push(reservation);
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        reservation_id = %reservation.id,
                        error = %e,
                        "Failed to delete expired hold, continuing"
                    );
                    report.failed += 1;
                }
            }
        }

        if !report.expired.is_empty() {
            info!(count = report.expired.len(), "Expired holds reaped");
            self.capacity
                .broadcast_events(report.expired.iter().map(|r| r.event_id))
                .await;
        }
        Ok(report)
    }

    /// Publish the current capacity of one event.
    pub async fn broadcast_capacity(&self, event_id: EventId) {
        if let Err(e) = self.capacity.broadcast_event(event_id).await {
            warn!(event_id = %event_id, error = %e, "Capacity broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, OnceLock};

    use async_trait::async_trait;

    use slotgate_core::error::ErrorKind;
    use slotgate_core::events::{BroadcastEvent, Outbound};
    use slotgate_database::ledger::HolderDetails;
    use slotgate_database::MemorySlotLedger;
    use slotgate_entity::event::EventCapacity;

    use super::*;
    use crate::notify::OutboundReceiver;

    fn settings() -> AdmissionSettings {
        AdmissionSettings {
            max_active_sessions: 3,
            queue_timeout_seconds: 30,
            choice_timeout_seconds: 120,
            max_events_per_session: 30,
        }
    }

    async fn service(slots: i32) -> (ReservationService, Arc<MemorySlotLedger>, EventId, OutboundReceiver) {
        let ledger = Arc::new(MemorySlotLedger::new());
        let event_id = ledger.add_event("Concert", slots).await;
        let (publisher, rx) = NotificationPublisher::channel();
        let capacity = Arc::new(CapacityBroadcaster::new(ledger.clone(), publisher.clone()));
        (
            ReservationService::new(ledger.clone(), capacity, publisher),
            ledger,
            event_id,
            rx,
        )
    }

    /// Fails the expiry delete of one chosen reservation.
    struct StuckRowLedger {
        inner: Arc<MemorySlotLedger>,
        stuck: OnceLock<ReservationId>,
    }

    #[async_trait]
    impl SlotLedger for StuckRowLedger {
        async fn create_reservation_if_capacity(&self, hold: NewHold) -> AppResult<HoldOutcome> {
            self.inner.create_reservation_if_capacity(hold).await
        }

        async fn get_reservation(&self, id: ReservationId) -> AppResult<Option<Reservation>> {
            self.inner.get_reservation(id).await
        }

        async fn confirm_reservation(
            &self,
            id: ReservationId,
            session_id: SessionId,
            holder: &HolderDetails,
            now: DateTime<Utc>,
        ) -> AppResult<ConfirmOutcome> {
            self.inner.confirm_reservation(id, session_id, holder, now).await
        }

        async fn delete_reservation(
            &self,
            id: ReservationId,
            session_id: SessionId,
        ) -> AppResult<Option<Reservation>> {
            self.inner.delete_reservation(id, session_id).await
        }

        async fn delete_temporary_for_session(
            &self,
            session_id: SessionId,
        ) -> AppResult<Vec<Reservation>> {
            self.inner.delete_temporary_for_session(session_id).await
        }

        async fn list_expired_temporary(&self, now: DateTime<Utc>) -> AppResult<Vec<Reservation>> {
            self.inner.list_expired_temporary(now).await
        }

        async fn delete_expired_temporary(
            &self,
            id: ReservationId,
            now: DateTime<Utc>,
        ) -> AppResult<bool> {
            if self.stuck.get() == Some(&id) {
                return Err(AppError::database("row locked"));
            }
            self.inner.delete_expired_temporary(id, now).await
        }

        async fn event_capacity(&self, event_id: EventId) -> AppResult<Option<EventCapacity>> {
            self.inner.event_capacity(event_id).await
        }

        async fn list_capacities(&self) -> AppResult<Vec<EventCapacity>> {
            self.inner.list_capacities().await
        }
    }

    fn last_available(rx: &mut OutboundReceiver) -> Option<i64> {
        let mut last = None;
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Broadcast {
                event: BroadcastEvent::CapacityUpdate {
                    available_slots, ..
                },
            } = item
            {
                last = Some(available_slots);
            }
        }
        last
    }

    #[tokio::test]
    async fn test_hold_broadcasts_capacity() {
        let (service, _ledger, event_id, mut rx) = service(2).await;
        let now = Utc::now();

        let hold = service
            .create_hold(event_id, SessionId::new(), &settings(), now)
            .await
            .unwrap();
        assert_eq!(hold.expires_at, Some(now + chrono::Duration::seconds(120)));
        assert_eq!(last_available(&mut rx), Some(1));
    }

    #[tokio::test]
    async fn test_full_event_rejects_with_no_capacity() {
        let (service, _ledger, event_id, _rx) = service(1).await;
        let now = Utc::now();

        service
            .create_hold(event_id, SessionId::new(), &settings(), now)
            .await
            .unwrap();
        let err = service
            .create_hold(event_id, SessionId::new(), &settings(), now)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NoCapacity));
    }

    #[tokio::test]
    async fn test_confirm_after_expiry_releases_slot() {
        let (service, _ledger, event_id, mut rx) = service(1).await;
        let session = SessionId::new();
        let now = Utc::now();

        let hold = service
            .create_hold(event_id, session, &settings(), now)
            .await
            .unwrap();
        let err = service
            .confirm(
                hold.id,
                session,
                "Ada",
                "555-0100",
                now + chrono::Duration::seconds(121),
            )
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Expired));
        assert_eq!(last_available(&mut rx), Some(1));
    }

    #[tokio::test]
    async fn test_confirm_rejects_invalid_holder_before_touching_ledger() {
        let (service, ledger, event_id, _rx) = service(1).await;
        let session = SessionId::new();
        let now = Utc::now();

        let hold = service
            .create_hold(event_id, session, &settings(), now)
            .await
            .unwrap();
        let err = service
            .confirm(hold.id, session, "", "555-0100", now)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::Validation));
        assert_eq!(ledger.reservation_count().await, 1);
    }

    #[tokio::test]
    async fn test_cancel_twice_is_noop() {
        let (service, _ledger, event_id, _rx) = service(1).await;
        let session = SessionId::new();

        let hold = service
            .create_hold(event_id, session, &settings(), Utc::now())
            .await
            .unwrap();
        assert!(service.cancel(hold.id, session).await.unwrap().is_some());
        assert!(service.cancel(hold.id, session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_lapsed_notifies_owner() {
        let (service, ledger, event_id, mut rx) = service(1).await;
        let session = SessionId::new();
        let now = Utc::now();

        let hold = service
            .create_hold(event_id, session, &settings(), now)
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        let report = service
            .expire_lapsed(now + chrono::Duration::seconds(121))
            .await
            .unwrap();
        assert_eq!(report.expired.len(), 1);
        assert_eq!(report.failed, 0);
        assert_eq!(ledger.reservation_count().await, 0);

        match rx.try_recv().unwrap() {
            Outbound::Session { session_id, notice } => {
                assert_eq!(session_id, session);
                assert_eq!(
                    notice,
                    SessionNotice::ReservationExpired {
                        reservation_id: hold.id,
                        event_id,
                    }
                );
            }
            other => panic!("unexpected outbound: {other:?}"),
        }
        assert_eq!(last_available(&mut rx), Some(1));
    }

    #[tokio::test]
    async fn test_expire_lapsed_skips_failing_row() {
        let memory = Arc::new(MemorySlotLedger::new());
        let wide = memory.add_event("Workshop", 2).await;
        let narrow = memory.add_event("Tasting", 1).await;
        let ledger = Arc::new(StuckRowLedger {
            inner: memory.clone(),
            stuck: OnceLock::new(),
        });
        let (publisher, mut rx) = NotificationPublisher::channel();
        let capacity = Arc::new(CapacityBroadcaster::new(ledger.clone(), publisher.clone()));
        let service = ReservationService::new(ledger.clone(), capacity, publisher);
        let now = Utc::now();

        let stuck = service
            .create_hold(wide, SessionId::new(), &settings(), now)
            .await
            .unwrap();
        ledger.stuck.set(stuck.id).unwrap();
        service
            .create_hold(wide, SessionId::new(), &settings(), now)
            .await
            .unwrap();
        service
            .create_hold(narrow, SessionId::new(), &settings(), now)
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}

        let report = service
            .expire_lapsed(now + chrono::Duration::seconds(121))
            .await
            .unwrap();
        assert_eq!(report.expired.len(), 2);
        assert_eq!(report.failed, 1);
        assert!(report.expired.iter().all(|r| r.id != stuck.id));
        assert_eq!(memory.reservation_count().await, 1);

        let mut available = HashMap::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Broadcast {
                event:
                    BroadcastEvent::CapacityUpdate {
                        event_id,
                        available_slots,
                        ..
                    },
            } = item
            {
                available.insert(event_id, available_slots);
            }
        }
        assert_eq!(available.get(&wide), Some(&1));
        assert_eq!(available.get(&narrow), Some(&1));
    }

    #[tokio::test]
    async fn test_confirm_by_other_session_is_not_found() {
        let (service, ledger, event_id, _rx) = service(1).await;
        let owner = SessionId::new();
        let now = Utc::now();

        let hold = service
            .create_hold(event_id, owner, &settings(), now)
            .await
            .unwrap();
        let err = service
            .confirm(hold.id, SessionId::new(), "Ada", "555-0100", now)
            .await
            .unwrap_err();
        assert!(err.is(ErrorKind::NotFound));
        assert_eq!(ledger.reservation_count().await, 1);

        let kept = ledger.get_reservation(hold.id).await.unwrap().unwrap();
        assert!(kept.is_owned_by(&owner));
    }
}
