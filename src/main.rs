//! Slotgate Server: admission queue and slot reservations over WebSocket.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use slotgate_core::config::{AppConfig, SettingsSourceKind};
use slotgate_core::error::AppError;
use slotgate_core::traits::{SettingsSource, StaticSettings};
use slotgate_database::{DatabasePool, SlotLedger};
use slotgate_realtime::RealtimeEngine;
use slotgate_service::{
    AdmissionCoordinator, CapacityBroadcaster, NotificationPublisher, ReservationService,
    SessionGateway,
};
use slotgate_worker::{ExpirySweeper, SweepScheduler};

#[tokio::main]
async fn main() {
    let env = std::env::var("SLOTGATE_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Slotgate v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = Arc::new(DatabasePool::connect(&config.database).await?);

    // ── Step 2: Ledger and settings source ───────────────────────
    let ledger: Arc<dyn SlotLedger> = Arc::new(db.slot_ledger());
    let limits = config.admission.limits();
    let settings: Arc<dyn SettingsSource> = match config.admission.source {
        SettingsSourceKind::Database => Arc::new(db.settings_repository(limits)),
        SettingsSourceKind::Static => Arc::new(StaticSettings::new(
            config.admission.static_settings(),
            limits,
        )),
    };
    tracing::info!(source = ?config.admission.source, "Admission settings source ready");

    // ── Step 3: Services ─────────────────────────────────────────
    let (publisher, outbound_rx) = NotificationPublisher::channel();
    let capacity = Arc::new(CapacityBroadcaster::new(
        Arc::clone(&ledger),
        publisher.clone(),
    ));
    let coordinator = Arc::new(AdmissionCoordinator::new(publisher.clone()));
    let reservations = Arc::new(ReservationService::new(
        Arc::clone(&ledger),
        Arc::clone(&capacity),
        publisher.clone(),
    ));
    let gateway = Arc::new(SessionGateway::new(
        coordinator,
        Arc::clone(&reservations),
        capacity,
        settings,
        publisher,
    ));

    // ── Step 4: Realtime engine ──────────────────────────────────
    let realtime = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        Arc::clone(&gateway),
    ));
    let dispatcher_handle = realtime.spawn_dispatcher(outbound_rx);

    // ── Step 5: Expiry sweeper ───────────────────────────────────
    let scheduler = if config.sweeper.enabled {
        let sweeper = Arc::new(ExpirySweeper::new(reservations, Arc::clone(&gateway)));
        let scheduler = SweepScheduler::new(sweeper, &config.sweeper).await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::warn!("Expiry sweeper disabled; lapsed holds are only reaped on the next hold attempt");
        None
    };

    // ── Step 6: Build and start HTTP server ──────────────────────
    let app_state = slotgate_api::AppState {
        config: Arc::new(config.clone()),
        db: Some(Arc::clone(&db)),
        gateway,
        realtime: Arc::clone(&realtime),
    };
    let app = slotgate_api::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!("Slotgate server listening on {}", addr);

    // ── Step 7: Graceful shutdown ────────────────────────────────
    let engine = Arc::clone(&realtime);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        // Open sockets would otherwise hold the server open.
        engine.shutdown().await;
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // ── Step 8: Stop background tasks ────────────────────────────
    if let Some(scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Sweep scheduler shutdown failed: {}", e);
        }
    }

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let _ = tokio::time::timeout(grace, dispatcher_handle).await;

    db.close().await;
    tracing::info!("Slotgate server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
