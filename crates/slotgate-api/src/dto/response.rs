//! Response DTOs.

use serde::{Deserialize, Serialize};

use slotgate_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Admission queue sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionHealth {
    /// Admitted sessions.
    pub active: usize,
    /// Waiting sessions.
    pub waiting: usize,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// `connected`, or `in_memory` without a database.
    pub database: String,
    /// Queue sizes.
    pub admission: AdmissionHealth,
    /// Open WebSocket connections.
    pub connections: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}
