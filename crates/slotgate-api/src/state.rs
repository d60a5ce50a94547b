//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use slotgate_core::config::AppConfig;
use slotgate_database::DatabasePool;
use slotgate_realtime::RealtimeEngine;
use slotgate_service::SessionGateway;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// PostgreSQL pool; `None` when running against the in-memory ledger
    pub db: Option<Arc<DatabasePool>>,
    /// Transport-agnostic session entry point
    pub gateway: Arc<SessionGateway>,
    /// WebSocket realtime engine
    pub realtime: Arc<RealtimeEngine>,
}
