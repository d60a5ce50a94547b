//! Database migration runner.

use sqlx::PgPool;
use tracing::info;

use slotgate_core::error::{AppError, ErrorKind};

/// Apply all pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let migrator = sqlx::migrate!("../../migrations");
    info!(
        available = migrator.iter().count(),
        "Applying slot ledger migrations"
    );

    migrator.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to apply migrations: {e}"),
            e,
        )
    })?;

    info!("Slot ledger schema is up to date");
    Ok(())
}
