//! Settings repository: the database-backed settings source.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use slotgate_core::error::{AppError, ErrorKind};
use slotgate_core::result::AppResult;
use slotgate_core::traits::SettingsSource;
use slotgate_core::types::settings::{AdmissionSettings, SettingsLimits};
use slotgate_entity::settings::SettingsRow;

/// Reads the single `settings` row on every call.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: PgPool,
    limits: SettingsLimits,
}

impl SettingsRepository {
    /// Create a new settings repository.
    pub fn new(pool: PgPool, limits: SettingsLimits) -> Self {
        Self { pool, limits }
    }

    /// Fetch the raw row.
    pub async fn find(&self) -> AppResult<Option<SettingsRow>> {
        sqlx::query_as::<_, SettingsRow>("SELECT * FROM settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::SettingsUnavailable,
                    format!("Failed to read settings: {e}"),
                    e,
                )
            })
    }
}

#[async_trait]
impl SettingsSource for SettingsRepository {
    async fn current(&self) -> AppResult<AdmissionSettings> {
        let row = match self.find().await {
            Ok(Some(row)) => row,
            Ok(None) => {
                error!("Settings row is missing");
                return Err(AppError::settings_unavailable("Settings row is missing"));
            }
            Err(e) => {
                error!(error = %e, "Settings store unreachable");
                return Err(e);
            }
        };
        Ok(self.limits.sanitize(row.to_settings()))
    }
}
