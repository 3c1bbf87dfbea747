//! Shared application state handed to every handler.

use obscura_core::Config;
use obscura_services::{FileLifecycleService, FingerprintRateLimiter, StatsService};
use obscura_storage::LocalStorage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub lifecycle: Arc<FileLifecycleService>,
    pub storage: Arc<LocalStorage>,
    pub limiter: Arc<FingerprintRateLimiter>,
    pub stats: Arc<StatsService>,
}
