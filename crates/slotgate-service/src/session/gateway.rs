//! Session gateway: the per-connection boundary.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use slotgate_core::error::AppError;
use slotgate_core::events::{RejectionReason, SessionNotice};
use slotgate_core::traits::SettingsSource;
use slotgate_core::types::id::{EventId, ReservationId, SessionId};
use slotgate_core::types::settings::AdmissionSettings;
use slotgate_entity::reservation::Reservation;

use crate::admission::{AdmissionCoordinator, Placement, PurgeReport};
use crate::notify::{CapacityBroadcaster, NotificationPublisher};
use crate::reservation::ReservationService;

/// Transport-agnostic entry point for everything a connection can do.
///
/// Connect, disconnect, and each client request funnel through here; so do
/// the sweeper's timer-driven transitions. User-visible failures are turned
/// into notices for the requesting session and returned as a
/// [`RejectionReason`]; nothing here propagates an [`AppError`].
pub struct SessionGateway {
    coordinator: Arc<AdmissionCoordinator>,
    reservations: Arc<ReservationService>,
    capacity: Arc<CapacityBroadcaster>,
    settings: Arc<dyn SettingsSource>,
    publisher: NotificationPublisher,
}

impl std::fmt::Debug for SessionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGateway").finish_non_exhaustive()
    }
}

impl SessionGateway {
    /// Create a new gateway.
    pub fn new(
        coordinator: Arc<AdmissionCoordinator>,
        reservations: Arc<ReservationService>,
        capacity: Arc<CapacityBroadcaster>,
        settings: Arc<dyn SettingsSource>,
        publisher: NotificationPublisher,
    ) -> Self {
        Self {
            coordinator,
            reservations,
            capacity,
            settings,
            publisher,
        }
    }

    /// The coordinator behind this gateway.
    pub fn coordinator(&self) -> &Arc<AdmissionCoordinator> {
        &self.coordinator
    }

    /// The reservation state machine behind this gateway.
    pub fn reservations(&self) -> &Arc<ReservationService> {
        &self.reservations
    }

    /// Register a new connection.
    ///
    /// The session receives its own outcome, then every session receives
    /// the status snapshot and the capacity of every event.
    pub async fn connect(
        &self,
        session_id: SessionId,
        browser_info: Option<String>,
    ) -> Result<Placement, RejectionReason> {
        let settings = self.settings_for(session_id).await?;
        let placement = self
            .coordinator
            .admit(session_id, browser_info, &settings, Utc::now())
            .await;

        if let Err(e) = self.capacity.broadcast_all().await {
            warn!(error = %e, "Capacity snapshot on connect failed");
        }
        Ok(placement)
    }

    /// Tear down a connection.
    ///
    /// Idempotent. Releases the admission slot (promoting the queue head),
    /// then cancels any temporary holds the session still owns.
    pub async fn disconnect(&self, session_id: SessionId) {
        let settings = match self.settings.current().await {
            Ok(settings) => Some(settings),
            Err(e) => {
                error!(
                    session_id = %session_id,
                    error = %e,
                    "Settings unavailable on disconnect; queue advance deferred to sweeper"
                );
                None
            }
        };

        let promoted = self
            .coordinator
            .release(session_id, settings.as_ref(), Utc::now())
            .await;
        if !promoted.is_empty() {
            info!(session_id = %session_id, promoted = promoted.len(), "Disconnect freed a slot");
        }

        if let Err(e) = self.reservations.cancel_for_session(session_id).await {
            error!(
                session_id = %session_id,
                error = %e,
                "Failed to cancel holds on disconnect; sweeper will reap them"
            );
        }
    }

    /// Place a temporary hold for an admitted session.
    pub async fn reserve(
        &self,
        session_id: SessionId,
        event_id: EventId,
    ) -> Result<Reservation, RejectionReason> {
        if !self.coordinator.is_active(&session_id).await {
            return Err(self.reject(session_id, RejectionReason::NotAdmitted));
        }
        let settings = self.settings_for(session_id).await?;

        let reservation = self
            .reservations
            .create_hold(event_id, session_id, &settings, Utc::now())
            .await
            .map_err(|e| self.reject_error(session_id, &e))?;

        // Lost the admission slot while the hold was being placed.
        if !self.coordinator.is_active(&session_id).await {
            if let Err(e) = self.reservations.cancel(reservation.id, session_id).await {
                warn!(reservation_id = %reservation.id, error = %e, "Failed to roll back orphaned hold");
            }
            return Err(self.reject(session_id, RejectionReason::NotAdmitted));
        }

        if let Some(expires_at) = reservation.expires_at {
            self.publisher.to_session(
                session_id,
                SessionNotice::ReservationHeld {
                    reservation_id: reservation.id,
                    event_id,
                    expires_at,
                    confirmation_timeout_seconds: settings.choice_timeout_seconds,
                },
            );
        }
        Ok(reservation)
    }

    /// Confirm a temporary hold.
    pub async fn confirm(
        &self,
        session_id: SessionId,
        reservation_id: ReservationId,
        holder_name: &str,
        holder_contact: &str,
    ) -> Result<Reservation, RejectionReason> {
        let reservation = self
            .reservations
            .confirm(
                reservation_id,
                session_id,
                holder_name,
                holder_contact,
                Utc::now(),
            )
            .await
            .map_err(|e| self.reject_error(session_id, &e))?;

        self.publisher.to_session(
            session_id,
            SessionNotice::ReservationConfirmed {
                reservation_id: reservation.id,
                event_id: reservation.event_id,
            },
        );
        Ok(reservation)
    }

    /// Cancel a temporary hold. Cancelling one that is already gone is not
    /// an error.
    pub async fn cancel(
        &self,
        session_id: SessionId,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>, RejectionReason> {
        self.reservations
            .cancel(reservation_id, session_id)
            .await
            .map_err(|e| self.reject_error(session_id, &e))
    }

    /// An admitted session's choice window lapsed.
    ///
    /// Its unconfirmed holds are cancelled and it moves to the tail of the
    /// queue; the queue head takes the freed slot.
    pub async fn handle_choice_timeout(&self, session_id: SessionId, now: DateTime<Utc>) {
        let settings = match self.settings.current().await {
            Ok(settings) => settings,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Settings unavailable, choice timeout deferred");
                return;
            }
        };

        if let Err(e) = self.reservations.cancel_for_session(session_id).await {
            error!(session_id = %session_id, error = %e, "Failed to cancel holds on choice timeout");
        }

        if self
            .coordinator
            .requeue_at_tail(session_id, &settings, now)
            .await
            .is_none()
        {
            info!(session_id = %session_id, "Choice timeout for session no longer active");
            return;
        }

        // A hold placed between the first cancel and the requeue passed the
        // reserve path's admission re-check and must not outlive the requeue.
        match self.reservations.cancel_for_session(session_id).await {
            Ok(late) if !late.is_empty() => {
                warn!(session_id = %session_id, count = late.len(), "Cancelled holds placed during requeue");
            }
            Ok(_) => {}
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to cancel holds after requeue");
            }
        }
    }

    /// Requeue every admitted session whose choice window lapsed.
    pub async fn expire_choice_windows(&self, now: DateTime<Utc>) -> usize {
        let lapsed = self.coordinator.lapsed_choices(now).await;
        for session_id in &lapsed {
            self.handle_choice_timeout(*session_id, now).await;
        }
        lapsed.len()
    }

    /// Drop stale queue entries and advance the queue.
    pub async fn purge_stale_queue(&self, now: DateTime<Utc>) -> PurgeReport {
        match self.settings.current().await {
            Ok(settings) => self.coordinator.purge_expired(&settings, now).await,
            Err(e) => {
                error!(error = %e, "Settings unavailable, queue purge skipped");
                PurgeReport::default()
            }
        }
    }

    async fn settings_for(&self, session_id: SessionId) -> Result<AdmissionSettings, RejectionReason> {
        self.settings.current().await.map_err(|e| {
            error!(session_id = %session_id, error = %e, "Settings unavailable, admission decision aborted");
            self.publisher.to_session(
                session_id,
                SessionNotice::AdmissionUnavailable {
                    message: RejectionReason::Unavailable.message().to_string(),
                },
            );
            RejectionReason::Unavailable
        })
    }

    fn reject_error(&self, session_id: SessionId, err: &AppError) -> RejectionReason {
        if !err.kind.is_user_visible() {
            error!(session_id = %session_id, error = %err, "Reservation request failed");
        }
        self.reject(session_id, RejectionReason::from_error(err))
    }

    fn reject(&self, session_id: SessionId, reason: RejectionReason) -> RejectionReason {
        info!(session_id = %session_id, reason = ?reason, "Reservation request rejected");
        self.publisher
            .to_session(session_id, SessionNotice::ReservationRejected { reason });
        reason
    }
}
