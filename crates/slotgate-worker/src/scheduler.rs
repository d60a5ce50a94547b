//! Interval scheduler for the expiry sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use slotgate_core::config::SweeperConfig;
use slotgate_core::error::AppError;

use crate::sweeper::ExpirySweeper;

/// Runs [`ExpirySweeper::sweep`] on a fixed interval.
pub struct SweepScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Sweeper shared with the job closure
    sweeper: Arc<ExpirySweeper>,
    /// Held for the duration of a tick; a tick that finds it taken is skipped
    running: Arc<Mutex<()>>,
    interval: Duration,
}

impl std::fmt::Debug for SweepScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepScheduler")
            .field("interval", &self.interval)
            .finish()
    }
}

impl SweepScheduler {
    /// Create a new scheduler
    pub async fn new(sweeper: Arc<ExpirySweeper>, config: &SweeperConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            sweeper,
            running: Arc::new(Mutex::new(())),
            interval: Duration::from_secs(config.interval_seconds.max(1)),
        })
    }

    /// Register the sweep job and start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.register_sweep().await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Sweep scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&self) -> Result<(), AppError> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Sweep scheduler shut down");
        Ok(())
    }

    /// Expiry sweep on every interval
    async fn register_sweep(&self) -> Result<(), AppError> {
        let sweeper = Arc::clone(&self.sweeper);
        let running = Arc::clone(&self.running);
        let job = Job::new_repeated_async(self.interval, move |_uuid, _lock| {
            let sweeper = Arc::clone(&sweeper);
            let running = Arc::clone(&running);
            Box::pin(async move {
                let Ok(_guard) = running.try_lock() else {
                    tracing::warn!("Previous sweep still running, skipping tick");
                    return;
                };
                sweeper.sweep().await;
            })
        })
        .map_err(|e| AppError::internal(format!("Failed to create sweep schedule: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add sweep schedule: {}", e)))?;

        tracing::info!(interval_seconds = self.interval.as_secs(), "Registered: expiry_sweep");
        Ok(())
    }
}
