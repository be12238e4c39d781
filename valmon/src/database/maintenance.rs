//! Database maintenance operations.
//!
//! Expired alert entries are already invisible to readers; this task removes
//! them from disk and keeps the WAL file from growing between checkpoints.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::database::{DbPool, KvStore};

/// Configuration for the maintenance task.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Interval between maintenance passes (default: 10 minutes).
    pub interval: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
        }
    }
}

/// Periodic purge of expired entries and WAL checkpointing.
pub struct StoreMaintenance {
    pool: DbPool,
    store: Arc<dyn KvStore>,
    config: MaintenanceConfig,
}

impl StoreMaintenance {
    pub fn new(pool: DbPool, store: Arc<dyn KvStore>, config: MaintenanceConfig) -> Self {
        Self {
            pool,
            store,
            config,
        }
    }

    /// Spawn the maintenance loop; it exits when `cancel` fires.
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            // The first tick completes immediately; skip it so startup stays quiet.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Store maintenance task shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }
        })
    }

    /// Run a single maintenance pass. Failures are logged, never propagated.
    pub async fn run_once(&self) {
        match self.store.purge_expired().await {
            Ok(0) => debug!("No expired store entries to purge"),
            Ok(count) => info!(count, "Purged expired store entries"),
            Err(e) => warn!(error = %e, "Failed to purge expired store entries"),
        }

        match sqlx::query_as::<_, (i32, i32, i32)>("PRAGMA wal_checkpoint(PASSIVE)")
            .fetch_one(&self.pool)
            .await
        {
            Ok((busy, checkpointed, total)) => {
                debug!(busy, checkpointed, total, "WAL checkpoint completed")
            }
            Err(e) => warn!(error = %e, "WAL checkpoint failed"),
        }
    }
}
