use axum::{extract::State, response::IntoResponse, Json};

use crate::auth::RequireUser;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /api/user/stats` — usage over the authenticated owner's files.
pub async fn user_stats(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = state.stats.usage_for_owner(user_id).await?;
    Ok(Json(stats))
}

/// `GET /api/admin/stats` — global usage, limiter table size, disk totals.
pub async fn admin_stats(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HttpAppError> {
    let stats = state.stats.admin_stats().await?;
    Ok(Json(stats))
}
