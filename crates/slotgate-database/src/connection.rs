//! PostgreSQL connection pool management.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use slotgate_core::config::DatabaseConfig;
use slotgate_core::error::AppError;
use slotgate_core::types::settings::SettingsLimits;

use crate::error::db_error;
use crate::ledger::PgSlotLedger;
use crate::migration::run_migrations;
use crate::repositories::SettingsRepository;

/// Wrapper around the sqlx PostgreSQL connection pool.
///
/// Hands out the PostgreSQL-backed ledger and settings source so callers
/// never touch the raw pool.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Connect and, if configured, apply pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(db_error("Failed to connect to database"))?;

        if config.run_migrations {
            run_migrations(&pool).await?;
        } else {
            info!("Skipping migrations (database.run_migrations = false)");
        }

        info!("Successfully connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Return a reference to the underlying sqlx pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// The PostgreSQL slot ledger sharing this pool.
    pub fn slot_ledger(&self) -> PgSlotLedger {
        PgSlotLedger::new(self.pool.clone())
    }

    /// The database-backed settings source sharing this pool.
    pub fn settings_repository(&self, limits: SettingsLimits) -> SettingsRepository {
        SettingsRepository::new(self.pool.clone(), limits)
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(db_error("Health check failed"))
    }

    /// Close all connections in the pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

/// Mask the password portion of a database URL for safe logging.
fn mask_password(url: &str) -> String {
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    match url[scheme_end..at_pos].find(':') {
        Some(offset) => {
            let colon_pos = scheme_end + offset;
            format!("{}:****@{}", &url[..colon_pos], &url[at_pos + 1..])
        }
        None => url.to_string(),
    }
}
