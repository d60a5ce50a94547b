//! Health check handler.

use axum::Json;
use axum::extract::State;

use slotgate_core::error::AppError;

use crate::dto::response::{AdmissionHealth, ApiResponse, HealthResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/health
///
/// Reports 503 when the database is configured but unreachable.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HealthResponse>>, ApiError> {
    let database = match &state.db {
        Some(db) => match db.health_check().await {
            Ok(true) => "connected",
            Ok(false) | Err(_) => {
                return Err(AppError::service_unavailable("Database unreachable").into());
            }
        },
        None => "in_memory",
    };

    let counts = state.gateway.coordinator().counts().await;

    Ok(Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        admission: AdmissionHealth {
            active: counts.active,
            waiting: counts.waiting,
        },
        connections: state.realtime.connections.connection_count(),
        metrics: state.realtime.metrics.snapshot(),
    })))
}
