//! # slotgate-api
//!
//! HTTP layer for Slotgate built on Axum.
//!
//! Exposes the WebSocket upgrade that carries every session, a health
//! endpoint, request logging, and the `AppError` to HTTP mapping.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
