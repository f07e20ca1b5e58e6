use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::AppError;
use crate::services::sync_service::{SyncService, SyncSummary};

/// Runs a sync immediately and then on a fixed interval, forever.
pub struct SyncScheduler {
    service: Arc<SyncService>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(service: Arc<SyncService>, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub async fn start(self) {
        info!("Starting auto-sync scheduler (interval: {:?})", self.interval);

        loop {
            match self.run_sync().await {
                Ok(summary) => {
                    info!(
                        "Auto-sync completed - created: {}, updated: {}, failed: {}",
                        summary.created, summary.updated, summary.failed
                    );
                }
                Err(e) => {
                    // Keep polling; the next run rebuilds everything from scratch.
                    warn!("Auto-sync failed: {}", e);
                }
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    async fn run_sync(&self) -> Result<SyncSummary, AppError> {
        self.service.sync_all().await
    }
}
