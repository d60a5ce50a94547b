//! Outbound notification queue.
//!
//! Business logic publishes addressed notices here; the transport layer
//! drains the receiving end and fans them out to connections.

pub mod capacity;
pub mod publisher;

pub use capacity::CapacityBroadcaster;
pub use publisher::{NotificationPublisher, OutboundReceiver};
