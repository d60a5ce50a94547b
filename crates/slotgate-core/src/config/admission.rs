//! Admission settings source configuration.

use serde::{Deserialize, Serialize};

use crate::types::settings::{AdmissionSettings, SettingsLimits};

/// Where the per-decision admission settings are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsSourceKind {
    /// Read the single `settings` row on every decision.
    Database,
    /// Serve the values configured in this section.
    Static,
}

impl Default for SettingsSourceKind {
    fn default() -> Self {
        Self::Database
    }
}

/// Admission configuration.
///
/// The `max_active_sessions` / `*_timeout_seconds` values are only served
/// when `source = "static"`; the ceilings always apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Settings source.
    #[serde(default)]
    pub source: SettingsSourceKind,
    /// Maximum concurrently admitted sessions.
    #[serde(default = "default_max_active_sessions")]
    pub max_active_sessions: u32,
    /// Seconds a session may wait in the queue.
    #[serde(default = "default_queue_timeout")]
    pub queue_timeout_seconds: u64,
    /// Seconds an admitted session has to confirm a temporary hold.
    #[serde(default = "default_choice_timeout")]
    pub choice_timeout_seconds: u64,
    /// Advisory per-session reservation limit.
    #[serde(default = "default_max_events_per_session")]
    pub max_events_per_session: u32,
    /// Upper bound applied to any configured choice timeout.
    #[serde(default = "default_choice_ceiling")]
    pub choice_timeout_ceiling_seconds: u64,
    /// Upper bound applied to any configured queue timeout.
    #[serde(default = "default_queue_ceiling")]
    pub queue_timeout_ceiling_seconds: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            source: SettingsSourceKind::default(),
            max_active_sessions: default_max_active_sessions(),
            queue_timeout_seconds: default_queue_timeout(),
            choice_timeout_seconds: default_choice_timeout(),
            max_events_per_session: default_max_events_per_session(),
            choice_timeout_ceiling_seconds: default_choice_ceiling(),
            queue_timeout_ceiling_seconds: default_queue_ceiling(),
        }
    }
}

impl AdmissionConfig {
    /// The statically configured settings, before validation.
    pub fn static_settings(&self) -> AdmissionSettings {
        AdmissionSettings {
            max_active_sessions: self.max_active_sessions,
            queue_timeout_seconds: self.queue_timeout_seconds,
            choice_timeout_seconds: self.choice_timeout_seconds,
            max_events_per_session: self.max_events_per_session,
        }
    }

    /// Sanity bounds for every settings snapshot.
    pub fn limits(&self) -> SettingsLimits {
        SettingsLimits {
            choice_timeout_ceiling_seconds: self.choice_timeout_ceiling_seconds,
            queue_timeout_ceiling_seconds: self.queue_timeout_ceiling_seconds,
        }
    }
}

fn default_max_active_sessions() -> u32 {
    3
}

fn default_queue_timeout() -> u64 {
    30
}

fn default_choice_timeout() -> u64 {
    120
}

fn default_max_events_per_session() -> u32 {
    30
}

fn default_choice_ceiling() -> u64 {
    3600
}

fn default_queue_ceiling() -> u64 {
    86_400
}
