//! # slotgate-realtime
//!
//! Real-time WebSocket engine for Slotgate. Provides:
//!
//! - Connection registry keyed by session, with per-connection send buffers
//! - Wire message types for client requests and server notices
//! - Ping/pong heartbeat that turns a silent client into a disconnect
//! - The broadcast notifier that drains the outbound notification queue
//! - Engine metrics

pub mod connection;
pub mod message;
pub mod metrics;
pub mod notification;
pub mod server;

pub use connection::manager::ConnectionManager;
pub use notification::dispatcher::NotificationDispatcher;
pub use server::RealtimeEngine;
