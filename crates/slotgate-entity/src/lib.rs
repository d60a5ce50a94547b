//! # slotgate-entity
//!
//! Persisted row models for Slotgate. Every struct in this crate represents
//! a database table row or a value derived from one. Database entities
//! derive `sqlx::FromRow`.

pub mod event;
pub mod reservation;
pub mod settings;

pub use event::{Event, EventCapacity};
pub use reservation::{NewHold, Reservation, ReservationStatus};
pub use settings::SettingsRow;
