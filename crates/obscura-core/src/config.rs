//! Configuration module
//!
//! All knobs are read from the environment once at startup and stay fixed for
//! the process lifetime. A missing `.env` file is fine; defaults are chosen to
//! run the service locally without any configuration.

use std::env;
use std::time::Duration;

const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024; // 50MB
const DEFAULT_ANON_RATE_LIMIT: u32 = 3;
const DEFAULT_ANON_RATE_WINDOW_HOURS: u64 = 24;
const DEFAULT_LIMITER_STALE_AFTER_HOURS: u64 = 2;
const DEFAULT_LIMITER_SWEEP_INTERVAL_MINS: u64 = 10;
const DEFAULT_CLEANUP_INTERVAL_HOURS: u64 = 6;
const DEFAULT_CLEANUP_MAX_AGE_HOURS: u64 = 24;
const DEFAULT_PROCESSING_DELAY_MIN_MS: u64 = 2_000;
const DEFAULT_PROCESSING_DELAY_MAX_MS: u64 = 5_000;
const DEFAULT_JWT_EXPIRY_MINUTES: i64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,

    /// Directory where originals and derived artifacts are written.
    pub upload_dir: String,
    pub max_file_size_bytes: u64,

    /// Postgres connection string. When absent, the in-memory repository is
    /// used (single-process, non-durable).
    pub database_url: Option<String>,

    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,

    // Anonymous rate limiting
    pub anon_rate_limit: u32,
    pub anon_rate_window_hours: u64,
    pub limiter_stale_after_hours: u64,
    pub limiter_sweep_interval_mins: u64,

    // File cleaner
    pub cleanup_interval_hours: u64,
    pub cleanup_max_age_hours: u64,

    // Emulated processing latency bounds
    pub processing_delay_min_ms: u64,
    pub processing_delay_max_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Best effort; env vars win over .env entries.
        dotenvy::dotenv().ok();

        let config = Self {
            server_port: get_env_parsed("PORT", 8080),
            environment: get_env("ENVIRONMENT", "development"),
            cors_origins: get_env("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            upload_dir: get_env("UPLOAD_PATH", "./uploads"),
            max_file_size_bytes: get_env_parsed("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE_BYTES),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            jwt_secret: get_env("JWT_SECRET", "change-me-in-production"),
            jwt_expiry_minutes: get_env_parsed("JWT_EXPIRY_MINUTES", DEFAULT_JWT_EXPIRY_MINUTES),
            anon_rate_limit: get_env_parsed("ANON_RATE_LIMIT", DEFAULT_ANON_RATE_LIMIT),
            anon_rate_window_hours: get_env_parsed(
                "ANON_RATE_WINDOW_HOURS",
                DEFAULT_ANON_RATE_WINDOW_HOURS,
            ),
            limiter_stale_after_hours: get_env_parsed(
                "LIMITER_STALE_AFTER_HOURS",
                DEFAULT_LIMITER_STALE_AFTER_HOURS,
            ),
            limiter_sweep_interval_mins: get_env_parsed(
                "LIMITER_SWEEP_INTERVAL_MINS",
                DEFAULT_LIMITER_SWEEP_INTERVAL_MINS,
            ),
            cleanup_interval_hours: get_env_parsed(
                "CLEANUP_INTERVAL_HOURS",
                DEFAULT_CLEANUP_INTERVAL_HOURS,
            ),
            cleanup_max_age_hours: get_env_parsed(
                "CLEANUP_MAX_AGE_HOURS",
                DEFAULT_CLEANUP_MAX_AGE_HOURS,
            ),
            processing_delay_min_ms: get_env_parsed(
                "PROCESSING_DELAY_MIN_MS",
                DEFAULT_PROCESSING_DELAY_MIN_MS,
            ),
            processing_delay_max_ms: get_env_parsed(
                "PROCESSING_DELAY_MAX_MS",
                DEFAULT_PROCESSING_DELAY_MAX_MS,
            ),
        };

        if config.processing_delay_min_ms > config.processing_delay_max_ms {
            anyhow::bail!(
                "PROCESSING_DELAY_MIN_MS ({}) must not exceed PROCESSING_DELAY_MAX_MS ({})",
                config.processing_delay_min_ms,
                config.processing_delay_max_ms
            );
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn anon_rate_window(&self) -> Duration {
        Duration::from_secs(self.anon_rate_window_hours * 3600)
    }

    pub fn limiter_stale_after(&self) -> Duration {
        Duration::from_secs(self.limiter_stale_after_hours * 3600)
    }

    pub fn limiter_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.limiter_sweep_interval_mins * 60)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_hours * 3600)
    }

    pub fn cleanup_max_age(&self) -> Duration {
        Duration::from_secs(self.cleanup_max_age_hours * 3600)
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Only assert fields no test environment is likely to override.
        let config = Config::from_env().unwrap();
        assert_eq!(config.anon_rate_limit, 3);
        assert_eq!(config.anon_rate_window_hours, 24);
        assert_eq!(config.cleanup_max_age_hours, 24);
        assert!(config.processing_delay_min_ms <= config.processing_delay_max_ms);
    }

    #[test]
    fn test_duration_helpers() {
        let config = Config::from_env().unwrap();
        assert_eq!(
            config.anon_rate_window(),
            Duration::from_secs(config.anon_rate_window_hours * 3600)
        );
        assert_eq!(
            config.limiter_sweep_interval(),
            Duration::from_secs(config.limiter_sweep_interval_mins * 60)
        );
    }
}
