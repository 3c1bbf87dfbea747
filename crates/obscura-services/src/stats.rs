use chrono::Utc;
use obscura_core::models::UsageStats;
use obscura_core::AppError;
use obscura_db::FileRepository;
use obscura_storage::LocalStorage;
use serde::Serialize;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

use crate::rate_limit::FingerprintRateLimiter;

/// Operator-facing statistics: global usage plus limiter and disk state.
/// Disk totals include anonymous files that have no lifecycle record.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    #[serde(flatten)]
    pub usage: UsageStats,
    pub tracked_clients: usize,
    pub disk_files: usize,
    pub disk_bytes: u64,
}

/// Read-side aggregation over lifecycle records. Everything is computed
/// fresh per request; nothing here mutates state.
pub struct StatsService {
    repository: Arc<dyn FileRepository>,
    storage: Arc<LocalStorage>,
    limiter: Arc<FingerprintRateLimiter>,
}

impl StatsService {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        storage: Arc<LocalStorage>,
        limiter: Arc<FingerprintRateLimiter>,
    ) -> Self {
        Self {
            repository,
            storage,
            limiter,
        }
    }

    pub async fn usage_for_owner(&self, user_id: Uuid) -> Result<UsageStats, AppError> {
        let files = self.repository.list_by_owner(user_id).await?;
        Ok(UsageStats::compute(&files, Utc::now()))
    }

    pub async fn admin_stats(&self) -> Result<AdminStats, AppError> {
        let files = self.repository.list_all().await?;
        let usage = UsageStats::compute(&files, Utc::now());
        let (disk_files, disk_bytes) = self.disk_totals().await;

        Ok(AdminStats {
            usage,
            tracked_clients: self.limiter.tracked_clients().await,
            disk_files,
            disk_bytes,
        })
    }

    async fn disk_totals(&self) -> (usize, u64) {
        let mut count = 0;
        let mut bytes = 0;

        let mut entries = match fs::read_dir(self.storage.base_path()).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read upload directory for stats");
                return (0, 0);
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Ok(metadata) = entry.metadata().await {
                if metadata.is_file() {
                    count += 1;
                    bytes += metadata.len();
                }
            }
        }

        (count, bytes)
    }
}
