//! Service construction and background task startup.

use anyhow::{Context, Result};
use obscura_core::Config;
use obscura_db::{FileRepository, MemoryFileRepository, PgFileRepository};
use obscura_processing::{EmulatedProcessor, UploadValidator};
use obscura_services::{FileCleaner, FileLifecycleService, FingerprintRateLimiter, StatsService};
use obscura_storage::LocalStorage;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

pub async fn initialize_services(config: &Config, pool: Option<PgPool>) -> Result<AppState> {
    let storage = Arc::new(
        LocalStorage::new(&config.upload_dir)
            .await
            .context("Failed to initialize upload storage")?,
    );

    let repository: Arc<dyn FileRepository> = match pool {
        Some(pool) => Arc::new(PgFileRepository::new(pool)),
        None => Arc::new(MemoryFileRepository::new()),
    };

    let processor = Arc::new(EmulatedProcessor::new(
        storage.clone(),
        Duration::from_millis(config.processing_delay_min_ms),
        Duration::from_millis(config.processing_delay_max_ms),
    ));

    let lifecycle = Arc::new(FileLifecycleService::new(
        repository.clone(),
        storage.clone(),
        processor,
        UploadValidator::new(config.max_file_size_bytes),
    ));

    let limiter = Arc::new(FingerprintRateLimiter::new(
        config.anon_rate_limit,
        config.anon_rate_window(),
        config.limiter_stale_after(),
        config.limiter_sweep_interval(),
    ));
    limiter.clone().start();

    let cleaner = Arc::new(FileCleaner::new(
        storage.base_path(),
        repository.clone(),
        config.cleanup_max_age(),
        config.cleanup_interval(),
    ));
    cleaner.start();

    let stats = Arc::new(StatsService::new(
        repository,
        storage.clone(),
        limiter.clone(),
    ));

    tracing::info!(
        upload_dir = %config.upload_dir,
        max_file_size_bytes = config.max_file_size_bytes,
        anon_rate_limit = config.anon_rate_limit,
        "Services initialized"
    );

    Ok(AppState {
        config: config.clone(),
        lifecycle,
        storage,
        limiter,
        stats,
    })
}
