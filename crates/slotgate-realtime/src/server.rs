//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use slotgate_core::config::RealtimeConfig;
use slotgate_service::SessionGateway;
use slotgate_service::notify::OutboundReceiver;

use crate::connection::heartbeat::HeartbeatConfig;
use crate::connection::manager::ConnectionManager;
use crate::metrics::EngineMetrics;
use crate::notification::dispatcher::NotificationDispatcher;

/// Central real-time engine that coordinates all WebSocket subsystems.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Notification dispatcher.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Heartbeat timing for new connections.
    pub heartbeat: HeartbeatConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(config: RealtimeConfig, gateway: Arc<SessionGateway>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        let metrics = Arc::new(EngineMetrics::new());
        let heartbeat = HeartbeatConfig::from(&config);
        let connections = Arc::new(ConnectionManager::new(config, gateway, metrics.clone()));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            connections.clone(),
            metrics.clone(),
        ));

        info!("Real-time engine initialized");

        Self {
            connections,
            dispatcher,
            metrics,
            heartbeat,
            shutdown_tx,
        }
    }

    /// Start draining the outbound queue on a background task.
    pub fn spawn_dispatcher(&self, rx: OutboundReceiver) -> JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move { dispatcher.run(rx, shutdown).await })
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        self.connections.close_all().await;
        let _ = self.shutdown_tx.send(true);
        info!("Real-time engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Value;
    use tokio::sync::mpsc;

    use slotgate_core::traits::StaticSettings;
    use slotgate_core::types::settings::{AdmissionSettings, SettingsLimits};
    use slotgate_database::{MemorySlotLedger, SlotLedger};
    use slotgate_service::{
        AdmissionCoordinator, CapacityBroadcaster, NotificationPublisher, Placement,
        ReservationService,
    };

    use super::*;

    fn engine(max_active_sessions: u32) -> (RealtimeEngine, Arc<MemorySlotLedger>) {
        let (publisher, rx) = NotificationPublisher::channel();
        let ledger = Arc::new(MemorySlotLedger::new());
        let dyn_ledger: Arc<dyn SlotLedger> = ledger.clone();
        let capacity = Arc::new(CapacityBroadcaster::new(dyn_ledger.clone(), publisher.clone()));
        let coordinator = Arc::new(AdmissionCoordinator::new(publisher.clone()));
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
            coordinator,
            reservations,
            capacity,
            settings,
            publisher,
        ));
        let engine = RealtimeEngine::new(RealtimeConfig::default(), gateway);
        engine.spawn_dispatcher(rx);
        (engine, ledger)
    }

    /// Frames up to and including the first one of `kind`.
    async fn frames_until(rx: &mut mpsc::Receiver<String>, kind: &str) -> Vec<Value> {
        tokio::time::timeout(Duration::from_secs(2), async {
            let mut seen = Vec::new();
            loop {
                let frame = rx.recv().await.expect("connection closed");
                let json: Value = serde_json::from_str(&frame).unwrap();
                let done = json["type"] == kind;
                seen.push(json);
                if done {
                    return seen;
                }
            }
        })
        .await
        .expect("frame not received")
    }

    async fn next_of_type(rx: &mut mpsc::Receiver<String>, kind: &str) -> Value {
        frames_until(rx, kind).await.pop().unwrap()
    }

    #[tokio::test]
    async fn test_open_delivers_admission_outcome() {
        let (engine, _ledger) = engine(1);

        let mut first = engine.connections.open(None).await;
        assert!(matches!(first.placement, Ok(Placement::Admitted { .. })));
        next_of_type(&mut first.outbound, "admitted").await;
        let timer = next_of_type(&mut first.outbound, "choice_timer_start").await;
        assert_eq!(timer["seconds"], 120);

        let mut second = engine.connections.open(Some("test-agent".into())).await;
        let queued = next_of_type(&mut second.outbound, "queued").await;
        assert_eq!(queued["position"], 1);

        let online = next_of_type(&mut first.outbound, "online_users").await;
        assert!(online["count"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_close_promotes_waiting_connection() {
        let (engine, _ledger) = engine(1);

        let first = engine.connections.open(None).await;
        let mut second = engine.connections.open(None).await;
        next_of_type(&mut second.outbound, "queued").await;

        engine.connections.close(first.handle.session_id).await;
        engine.connections.close(first.handle.session_id).await;

        next_of_type(&mut second.outbound, "admitted").await;
        assert_eq!(engine.connections.connection_count(), 1);
        assert_eq!(engine.metrics.snapshot().connections_active, 1);
    }

    #[tokio::test]
    async fn test_reserve_over_the_wire() {
        let (engine, ledger) = engine(1);
        let event_id = ledger.add_event("Morning session", 1).await;

        let mut conn = engine.connections.open(None).await;
        let session_id = conn.handle.session_id;
        engine
            .connections
            .handle_inbound(
                session_id,
                &format!(r#"{{"type":"reserve","event_id":"{event_id}"}}"#),
            )
            .await;

        // The capacity drop is published before the hold notice.
        let frames = frames_until(&mut conn.outbound, "reservation_held").await;
        let held = frames.last().unwrap();
        assert_eq!(held["event_id"], event_id.to_string());
        assert!(frames.iter().any(|f| f["type"] == "capacity_update"
            && f["event_id"] == event_id.to_string()
            && f["available_slots"] == 0));
    }

    #[tokio::test]
    async fn test_malformed_message_gets_error_reply() {
        let (engine, _ledger) = engine(1);
        let mut conn = engine.connections.open(None).await;

        engine
            .connections
            .handle_inbound(conn.handle.session_id, "{not json")
            .await;

        let error = next_of_type(&mut conn.outbound, "error").await;
        assert_eq!(error["code"], "INVALID_MESSAGE");
        assert_eq!(engine.metrics.snapshot().malformed_messages, 1);
    }
}
