//! Application initialization: database, services, routes.

pub mod database;
pub mod routes;
pub mod server;
pub mod services;

use crate::state::AppState;
use anyhow::Result;
use obscura_core::Config;

/// Wire the whole application together and return its state and router.
pub async fn initialize_app(config: Config) -> Result<(AppState, axum::Router)> {
    let pool = database::setup_database(&config).await?;

    let state = services::initialize_services(&config, pool).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
