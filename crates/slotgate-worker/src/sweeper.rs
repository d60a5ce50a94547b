//! Expiry sweeper: the backstop for every timer in the system.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use slotgate_core::types::id::SessionId;
use slotgate_service::{ReservationService, SessionGateway};

/// What one sweep tick did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Temporary holds deleted because they lapsed.
    pub expired_holds: usize,
    /// Holds that could not be deleted this tick.
    pub failed_holds: usize,
    /// Queue entries dropped for waiting too long.
    pub dropped_from_queue: Vec<SessionId>,
    /// Sessions promoted after the queue purge.
    pub promoted: Vec<SessionId>,
    /// Active sessions moved to the tail after their choice window lapsed.
    pub requeued: usize,
}

impl SweepReport {
    /// Whether the tick changed anything.
    pub fn is_idle(&self) -> bool {
        self.expired_holds == 0
            && self.failed_holds == 0
            && self.dropped_from_queue.is_empty()
            && self.promoted.is_empty()
            && self.requeued == 0
    }
}

/// Periodic cleanup of lapsed holds and timed-out sessions.
///
/// Works purely from stored timestamps, so a missed tick or a restart only
/// delays cleanup; the next tick recomputes everything.
#[derive(Debug)]
pub struct ExpirySweeper {
    reservations: Arc<ReservationService>,
    gateway: Arc<SessionGateway>,
}

impl ExpirySweeper {
    /// Create a sweeper over the reservation service and gateway.
    pub fn new(reservations: Arc<ReservationService>, gateway: Arc<SessionGateway>) -> Self {
        Self {
            reservations,
            gateway,
        }
    }

    /// Run one tick against the wall clock.
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    /// Run one tick as if the time were `now`.
    ///
    /// Holds are reaped first so their capacity is already free when queue
    /// heads get promoted.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        match self.reservations.expire_lapsed(now).await {
            Ok(expiry) => {
                report.expired_holds = expiry.expired.len();
                report.failed_holds = expiry.failed;
            }
            Err(e) => error!(error = %e, "Listing expired holds failed"),
        }

        let purge = self.gateway.purge_stale_queue(now).await;
        report.dropped_from_queue = purge.dropped;
        report.promoted = purge.promoted;

        report.requeued = self.gateway.expire_choice_windows(now).await;

        if report.is_idle() {
            debug!("Sweep tick: nothing to do");
        } else {
            info!(
                expired_holds = report.expired_holds,
                failed_holds = report.failed_holds,
                dropped = report.dropped_from_queue.len(),
                promoted = report.promoted.len(),
                requeued = report.requeued,
                "Sweep tick complete"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use slotgate_core::traits::StaticSettings;
    use slotgate_core::types::settings::{AdmissionSettings, SettingsLimits};
    use slotgate_database::{MemorySlotLedger, SlotLedger};
    use slotgate_service::notify::OutboundReceiver;
    use slotgate_service::{
        AdmissionCoordinator, CapacityBroadcaster, NotificationPublisher, ReservationService,
    };

    use super::*;

    struct Fixture {
        ledger: Arc<MemorySlotLedger>,
        gateway: Arc<SessionGateway>,
        sweeper: ExpirySweeper,
        _rx: OutboundReceiver,
    }

    fn fixture(max_active_sessions: u32) -> Fixture {
        let (publisher, rx) = NotificationPublisher::channel();
        let ledger = Arc::new(MemorySlotLedger::new());
        let dyn_ledger: Arc<dyn SlotLedger> = ledger.clone();
        let capacity = Arc::new(CapacityBroadcaster::new(dyn_ledger.clone(), publisher.clone()));
        let reservations = Arc::new(ReservationService::new(
            dyn_ledger,
            capacity.clone(),
            publisher.clone(),
        ));
        let settings = Arc::new(StaticSettings::new(
            AdmissionSettings {
                max_active_sessions,
                queue_timeout_seconds: 30,
                choice_timeout_seconds: 120,
                max_events_per_session: 30,
            },
            SettingsLimits::default(),
        ));
        let gateway = Arc::new(SessionGateway::new(
            Arc::new(AdmissionCoordinator::new(publisher.clone())),
            reservations.clone(),
            capacity,
            settings,
            publisher,
        ));
        let sweeper = ExpirySweeper::new(reservations, gateway.clone());
        Fixture {
            ledger,
            gateway,
            sweeper,
            _rx: rx,
        }
    }

    #[tokio::test]
    async fn test_idle_sweep_reports_nothing() {
        let fx = fixture(2);
        let report = fx.sweeper.sweep().await;
        assert!(report.is_idle());
    }

    #[tokio::test]
    async fn test_lapsed_hold_is_reaped_and_capacity_restored() {
        let fx = fixture(2);
        let event_id = fx.ledger.add_event("Evening", 1).await;
        let session = SessionId::new();
        fx.gateway.connect(session, None).await.unwrap();
        fx.gateway.reserve(session, event_id).await.unwrap();

        let capacity = fx.ledger.event_capacity(event_id).await.unwrap().unwrap();
        assert_eq!(capacity.available(), 0);

        let report = fx.sweeper.sweep_at(Utc::now() + Duration::seconds(121)).await;
        assert_eq!(report.expired_holds, 1);
        assert_eq!(report.requeued, 1);

        let capacity = fx.ledger.event_capacity(event_id).await.unwrap().unwrap();
        assert_eq!(capacity.available(), 1);
    }

    #[tokio::test]
    async fn test_stale_queue_entry_is_dropped() {
        let fx = fixture(1);
        let active = SessionId::new();
        let waiting = SessionId::new();
        fx.gateway.connect(active, None).await.unwrap();
        fx.gateway.connect(waiting, None).await.unwrap();

        // Past the queue timeout but inside the choice window.
        let report = fx.sweeper.sweep_at(Utc::now() + Duration::seconds(31)).await;
        assert_eq!(report.dropped_from_queue, vec![waiting]);
        assert_eq!(report.requeued, 0);
        assert!(fx.gateway.coordinator().is_active(&active).await);
        assert_eq!(fx.gateway.coordinator().position(&waiting).await, None);
    }
}
