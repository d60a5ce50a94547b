//! WebSocket wire messages.

pub mod types;

pub use types::{ControlMessage, InboundMessage, OutboundMessage};
