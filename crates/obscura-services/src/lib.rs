//! Core services: upload lifecycle and async dispatch, fingerprint rate
//! limiting, orphan cleanup, and usage statistics.

pub mod cleaner;
pub mod lifecycle;
pub mod rate_limit;
pub mod stats;

pub use cleaner::{FileCleaner, SweepStats};
pub use lifecycle::FileLifecycleService;
pub use rate_limit::{Fingerprint, FingerprintRateLimiter, RateDecision};
pub use stats::{AdminStats, StatsService};
