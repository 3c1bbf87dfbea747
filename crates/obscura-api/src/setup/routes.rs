//! Route configuration.

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::get,
    routing::post,
    Router,
};
use obscura_core::Config;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Slack on top of the file-size limit for the other multipart fields.
const BODY_LIMIT_SLACK: u64 = 1024 * 1024;

const MAX_CONCURRENT_REQUESTS: usize = 512;

pub fn setup_routes(config: &Config, state: AppState) -> Result<Router> {
    let cors = setup_cors(config)?;
    let body_limit = (config.max_file_size_bytes + BODY_LIMIT_SLACK) as usize;

    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/upload", post(handlers::upload::upload_file))
        .route("/api/files", get(handlers::files::list_files))
        .route(
            "/api/files/{id}",
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route("/api/user/stats", get(handlers::stats::user_stats))
        .route("/api/admin/stats", get(handlers::stats::admin_stats))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(router)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    if config.cors_origins.iter().any(|o| o == "*") {
        Ok(cors.allow_origin(Any))
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| o.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(cors.allow_origin(origins))
    }
}
