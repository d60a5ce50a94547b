//! Per-connection session handling.

pub mod gateway;

pub use gateway::SessionGateway;
