//! Reservation status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted reservation status.
///
/// Cancelled and expired holds are deleted rather than stored, so only the
/// two live states exist in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Holding a slot pending confirmation.
    Temporary,
    /// Confirmed; never expires.
    Confirmed,
}

impl ReservationStatus {
    /// Whether the reservation is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporary => "temporary",
            Self::Confirmed => "confirmed",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
