//! Settings source trait for per-decision admission settings.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::settings::{AdmissionSettings, SettingsLimits};

/// Supplies a fresh [`AdmissionSettings`] snapshot on demand.
///
/// Callers fetch once per decision and never cache the result, so an
/// operator changing the stored values takes effect on the next decision.
/// Implementations return already-sanitized values and report an
/// unreadable store as `SettingsUnavailable`.
#[async_trait]
pub trait SettingsSource: Send + Sync + 'static {
    /// Read the current settings.
    async fn current(&self) -> AppResult<AdmissionSettings>;
}

/// Settings fixed at construction time.
#[derive(Debug, Clone)]
pub struct StaticSettings {
    settings: AdmissionSettings,
}

impl StaticSettings {
    /// Sanitize and freeze the given values.
    pub fn new(raw: AdmissionSettings, limits: SettingsLimits) -> Self {
        Self {
            settings: limits.sanitize(raw),
        }
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn current(&self) -> AppResult<AdmissionSettings> {
        Ok(self.settings)
    }
}
