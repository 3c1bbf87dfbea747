//! Database setup and migrations.

use anyhow::{Context, Result};
use obscura_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::time::Duration;

/// Connect and migrate when `DATABASE_URL` is configured. `None` means the
/// in-memory repository will be used instead.
pub async fn setup_database(config: &Config) -> Result<Option<PgPool>> {
    let Some(database_url) = &config.database_url else {
        tracing::info!("No DATABASE_URL configured, using in-memory file records");
        return Ok(None);
    };

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database connected and migrations applied");

    Ok(Some(pool))
}
