//! Admission settings snapshot and validation.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Largest admission window accepted from any settings source.
pub const MAX_ACTIVE_SESSIONS_CEILING: u32 = 10_000;

/// One decision's worth of admission settings.
///
/// A fresh snapshot is taken at the start of every admission decision, sweep
/// tick, or hold; it is never cached beyond that. All durations are in
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionSettings {
    /// Maximum number of concurrently admitted sessions.
    pub max_active_sessions: u32,
    /// Seconds a session may wait in the queue before forfeiting its place.
    pub queue_timeout_seconds: u64,
    /// Seconds an admitted session has to confirm a temporary hold.
    pub choice_timeout_seconds: u64,
    /// Advisory per-session reservation limit (enforced elsewhere).
    pub max_events_per_session: u32,
}

impl AdmissionSettings {
    /// The queue timeout as a [`chrono::Duration`].
    pub fn queue_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(to_i64(self.queue_timeout_seconds))
    }

    /// The choice timeout as a [`chrono::Duration`].
    pub fn choice_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(to_i64(self.choice_timeout_seconds))
    }
}

/// Sanity bounds applied to every settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsLimits {
    /// Ceiling for `choice_timeout_seconds`.
    pub choice_timeout_ceiling_seconds: u64,
    /// Ceiling for `queue_timeout_seconds`.
    pub queue_timeout_ceiling_seconds: u64,
}

impl Default for SettingsLimits {
    fn default() -> Self {
        Self {
            choice_timeout_ceiling_seconds: 3600,
            queue_timeout_ceiling_seconds: 86_400,
        }
    }
}

impl SettingsLimits {
    /// Clamp a raw snapshot into the accepted ranges.
    ///
    /// Zero or absurdly large values are replaced by the nearest bound and a
    /// warning is logged; they are never silently used.
    pub fn sanitize(&self, raw: AdmissionSettings) -> AdmissionSettings {
        let max_active_sessions = clamp_logged(
            "max_active_sessions",
            u64::from(raw.max_active_sessions),
            1,
            u64::from(MAX_ACTIVE_SESSIONS_CEILING),
        ) as u32;
        let queue_timeout_seconds = clamp_logged(
            "queue_timeout_seconds",
            raw.queue_timeout_seconds,
            1,
            self.queue_timeout_ceiling_seconds.max(1),
        );
        let choice_timeout_seconds = clamp_logged(
            "choice_timeout_seconds",
            raw.choice_timeout_seconds,
            1,
            self.choice_timeout_ceiling_seconds.max(1),
        );

        AdmissionSettings {
            max_active_sessions,
            queue_timeout_seconds,
            choice_timeout_seconds,
            max_events_per_session: raw.max_events_per_session,
        }
    }
}

fn clamp_logged(field: &'static str, value: u64, min: u64, max: u64) -> u64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(
            field = field,
            configured = value,
            applied = clamped,
            "Admission setting out of range, clamped"
        );
    }
    clamped
}

fn to_i64(seconds: u64) -> i64 {
    i64::try_from(seconds).unwrap_or(i64::MAX)
}
