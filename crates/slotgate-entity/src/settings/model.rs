//! Settings row model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotgate_core::types::settings::AdmissionSettings;
use sqlx::FromRow;

/// The single row of the `settings` table.
///
/// Columns are signed because PostgreSQL has no unsigned integers; negative
/// values are treated as zero and then clamped by validation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SettingsRow {
    /// Row id (always 1).
    pub id: i32,
    /// Maximum concurrently admitted sessions.
    pub max_active_sessions: i32,
    /// Queue timeout in seconds.
    pub queue_timeout_seconds: i32,
    /// Choice timeout in seconds.
    pub choice_timeout_seconds: i32,
    /// Advisory per-session reservation limit.
    pub max_events_per_session: i32,
    /// Last admin update.
    pub updated_at: DateTime<Utc>,
}

impl SettingsRow {
    /// Convert into an unvalidated settings snapshot.
    pub fn to_settings(&self) -> AdmissionSettings {
        AdmissionSettings {
            max_active_sessions: non_negative(self.max_active_sessions),
            queue_timeout_seconds: u64::from(non_negative(self.queue_timeout_seconds)),
            choice_timeout_seconds: u64::from(non_negative(self.choice_timeout_seconds)),
            max_events_per_session: non_negative(self.max_events_per_session),
        }
    }
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
