//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use slotgate_core::events::{Outbound, SessionNotice};
use slotgate_core::traits::StaticSettings;
use slotgate_core::types::id::{EventId, SessionId};
use slotgate_core::types::settings::{AdmissionSettings, SettingsLimits};
use slotgate_database::{MemorySlotLedger, SlotLedger};
use slotgate_service::notify::OutboundReceiver;
use slotgate_service::{
    AdmissionCoordinator, CapacityBroadcaster, NotificationPublisher, ReservationService,
    SessionGateway,
};
use slotgate_worker::ExpirySweeper;

/// Fully wired gateway over the in-memory ledger.
pub struct TestApp {
    /// Ledger for direct inspection
    pub ledger: Arc<MemorySlotLedger>,
    /// Session entry point
    pub gateway: Arc<SessionGateway>,
    /// Sweeper sharing the same services
    pub sweeper: ExpirySweeper,
    outbound: OutboundReceiver,
}

impl TestApp {
    /// Build an app with the given admission limits.
    pub fn new(max_active_sessions: u32, queue_timeout_seconds: u64, choice_timeout_seconds: u64) -> Self {
        let (publisher, outbound) = NotificationPublisher::channel();
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
                queue_timeout_seconds,
                choice_timeout_seconds,
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

        Self {
            ledger,
            gateway,
            sweeper,
            outbound,
        }
    }

    /// Add an event with `total_slots` capacity.
    pub async fn event(&self, total_slots: i32) -> EventId {
        self.ledger.add_event("Test event", total_slots).await
    }

    /// Slots still free for an event.
    pub async fn available(&self, event_id: EventId) -> i64 {
        self.ledger
            .event_capacity(event_id)
            .await
            .expect("ledger failed")
            .expect("unknown event")
            .available()
    }

    /// Everything published since the last drain.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(outbound) = self.outbound.try_recv() {
            out.push(outbound);
        }
        out
    }

    /// Notices addressed to one session since the last drain.
    pub fn notices_for(&mut self, session_id: SessionId) -> Vec<SessionNotice> {
        self.drain()
            .into_iter()
            .filter_map(|outbound| match outbound {
                Outbound::Session { session_id: to, notice } if to == session_id => Some(notice),
                _ => None,
            })
            .collect()
    }
}
