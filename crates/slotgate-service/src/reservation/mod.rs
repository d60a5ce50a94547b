//! Reservation lifecycle: temporary hold, then confirmed, expired, or cancelled.

pub mod holder;
pub mod service;

pub use holder::validate_holder;
pub use service::{ExpiryReport, ReservationService};
