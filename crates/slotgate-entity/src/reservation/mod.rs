//! Reservation entities.

pub mod model;
pub mod status;

pub use model::{NewHold, Reservation};
pub use status::ReservationStatus;
