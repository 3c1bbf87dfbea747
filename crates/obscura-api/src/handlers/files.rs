use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use obscura_core::models::Owner;
use obscura_core::AppError;
use obscura_processing::mime_from_extension;
use obscura_storage::DERIVED_SUFFIX;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{Identity, RequireUser};
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /api/files` — the authenticated owner's records, newest first.
pub async fn list_files(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let files = state.lifecycle.list_for_owner(user_id).await?;
    Ok(Json(files))
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    /// `original` or `processed`; absent means record info.
    #[serde(rename = "type")]
    pub variant: Option<String>,
}

/// `GET /api/files/{id}` — record info, or artifact download with
/// `?type=original|processed`. Downloads work for anonymous uploads too,
/// located by id on disk since they have no record.
pub async fn get_file(
    State(state): State<AppState>,
    Identity(owner): Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<FileQuery>,
) -> Result<Response, HttpAppError> {
    let Some(variant) = query.variant else {
        // Info requires an owned record.
        let file = state.lifecycle.get_status(owner, id).await?;
        return Ok(Json(file).into_response());
    };

    let name = match variant.as_str() {
        "original" => resolve_original(&state, owner, id).await?,
        "processed" => resolve_processed(&state, owner, id).await?,
        other => {
            return Err(HttpAppError(AppError::InvalidInput(format!(
                "Unknown download type: {:?} (expected original or processed)",
                other
            ))))
        }
    };

    let data = state.storage.read(&name).await.map_err(|e| match e {
        obscura_storage::StorageError::NotFound(_) => {
            AppError::NotFound(format!("File {} not found", id))
        }
        other => AppError::Storage(other.to_string()),
    })?;

    let mime = mime_from_extension(&name);
    let disposition = format!("attachment; filename=\"{}\"", name);

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(mime)),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition)
                    .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
            ),
        ],
        data,
    )
        .into_response())
}

async fn resolve_original(state: &AppState, owner: Owner, id: Uuid) -> Result<String, AppError> {
    if !owner.is_anonymous() {
        match state.lifecycle.get_status(owner, id).await {
            Ok(file) => return Ok(file.stored_name),
            // No record means an anonymous upload; anything else (another
            // owner's file in particular) must not reach the disk lookup.
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    // Stored names are `{id}.{ext}`; the dot keeps the derived copy from
    // matching.
    state
        .storage
        .find_with_prefix(&format!("{}.", id))
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("File {} not found", id)))
}

async fn resolve_processed(state: &AppState, owner: Owner, id: Uuid) -> Result<String, AppError> {
    if !owner.is_anonymous() {
        match state.lifecycle.get_status(owner, id).await {
            Ok(file) => {
                return file.derived_name.ok_or_else(|| {
                    AppError::NotFound(format!("File {} is not processed yet", id))
                })
            }
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    state
        .storage
        .find_with_prefix(&format!("{}{}", id, DERIVED_SUFFIX))
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("File {} is not processed yet", id)))
}

/// `DELETE /api/files/{id}` — owner only; removes both artifacts and the
/// record.
pub async fn delete_file(
    State(state): State<AppState>,
    RequireUser(user_id): RequireUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .lifecycle
        .delete_artifact(Owner::User(user_id), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
