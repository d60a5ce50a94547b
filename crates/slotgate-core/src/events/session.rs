//! Notices addressed to a single session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};
use crate::types::id::{EventId, ReservationId};

/// Why a reservation request was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// The event has no free slots.
    NoCapacity,
    /// The session already holds a temporary reservation for this event.
    DuplicateHold,
    /// The hold's confirmation window passed.
    Expired,
    /// The reservation does not exist (or is not owned by the caller).
    NotFound,
    /// The session is not currently admitted.
    NotAdmitted,
    /// Holder name or contact failed validation.
    InvalidHolder,
    /// Settings could not be read.
    Unavailable,
}

impl RejectionReason {
    /// Map an application error onto the reason reported to the client.
    pub fn from_error(err: &AppError) -> Self {
        match err.kind {
            ErrorKind::NoCapacity => Self::NoCapacity,
            ErrorKind::DuplicateHold => Self::DuplicateHold,
            ErrorKind::Expired => Self::Expired,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::Validation => Self::InvalidHolder,
            ErrorKind::SettingsUnavailable => Self::Unavailable,
            _ => Self::NoCapacity,
        }
    }

    /// Human-readable message for clients.
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoCapacity => "No slots left for this event",
            Self::DuplicateHold => "You already hold a slot for this event",
            Self::Expired => "Your hold has expired",
            Self::NotFound => "Reservation not found",
            Self::NotAdmitted => "You are not admitted yet",
            Self::InvalidHolder => "Holder name or contact is invalid",
            Self::Unavailable => "Service temporarily unavailable",
        }
    }
}

/// A notice delivered to exactly one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    /// The session entered the active set.
    Admitted,
    /// The choice window started.
    ChoiceTimerStart {
        /// Window length.
        seconds: u64,
    },
    /// The session is waiting.
    Queued {
        /// 1-based queue position.
        position: usize,
        /// Seconds left before the queue timeout.
        time_remaining_seconds: i64,
    },
    /// The choice window lapsed and the session went back to the tail.
    RequeuedToTail {
        /// 1-based queue position after requeueing.
        position: usize,
        /// Seconds left before the queue timeout.
        time_remaining_seconds: i64,
    },
    /// The session waited too long and was dropped from the queue.
    QueueTimedOut,
    /// A temporary hold was placed.
    ReservationHeld {
        /// The hold.
        reservation_id: ReservationId,
        /// Event held.
        event_id: EventId,
        /// When the hold lapses.
        expires_at: DateTime<Utc>,
        /// Confirmation window in seconds.
        confirmation_timeout_seconds: u64,
    },
    /// A hold became permanent.
    ReservationConfirmed {
        /// The reservation.
        reservation_id: ReservationId,
        /// Event reserved.
        event_id: EventId,
    },
    /// A reservation request was turned down.
    ReservationRejected {
        /// Why.
        reason: RejectionReason,
    },
    /// A hold lapsed and was removed.
    ReservationExpired {
        /// The removed hold.
        reservation_id: ReservationId,
        /// Event whose slot was freed.
        event_id: EventId,
    },
    /// Admission could not be decided right now.
    AdmissionUnavailable {
        /// Client-facing explanation.
        message: String,
    },
}

impl SessionNotice {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Admitted => "admitted",
            Self::ChoiceTimerStart { .. } => "choice_timer_start",
            Self::Queued { .. } => "queued",
            Self::RequeuedToTail { .. } => "requeued_to_tail",
            Self::QueueTimedOut => "queue_timed_out",
            Self::ReservationHeld { .. } => "reservation_held",
            Self::ReservationConfirmed { .. } => "reservation_confirmed",
            Self::ReservationRejected { .. } => "reservation_rejected",
            Self::ReservationExpired { .. } => "reservation_expired",
            Self::AdmissionUnavailable { .. } => "admission_unavailable",
        }
    }
}
