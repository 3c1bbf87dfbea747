use axum::{
    extract::{Multipart, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use obscura_core::models::{EffectKind, ProcessingOptions};
use obscura_core::{AppError, FieldError};

use crate::auth::Identity;
use crate::error::HttpAppError;
use crate::fingerprint::client_fingerprint;
use crate::state::AppState;

const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

struct UploadForm {
    data: Bytes,
    original_name: String,
    declared_mime: Option<String>,
    options: ProcessingOptions,
}

async fn parse_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut data: Option<Bytes> = None;
    let mut original_name: Option<String> = None;
    let mut declared_mime: Option<String> = None;
    let mut options = ProcessingOptions::default();
    let mut field_errors: Vec<FieldError> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                original_name = field.file_name().map(str::to_string);
                declared_mime = field.content_type().map(str::to_string);
                data = Some(field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read file field: {}", e))
                })?);
            }
            "blur_type" => {
                let text = read_text(field).await?;
                match text.parse::<EffectKind>() {
                    Ok(effect) => options.effect = effect,
                    Err(e) => field_errors.push(FieldError::new("blur_type", e.to_string())),
                }
            }
            "intensity" => {
                let text = read_text(field).await?;
                match text.trim().parse::<i32>() {
                    Ok(intensity) => options.intensity = intensity,
                    Err(_) => field_errors.push(FieldError::new(
                        "intensity",
                        format!("not a number: {:?}", text),
                    )),
                }
            }
            "object_types" => {
                let text = read_text(field).await?;
                options.objects.extend(
                    text.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                );
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    if !field_errors.is_empty() {
        return Err(AppError::Validation(field_errors));
    }

    let data = data.ok_or_else(|| AppError::InvalidInput("Missing file field".into()))?;
    let original_name = original_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Uploaded file has no filename".into()))?;

    Ok(UploadForm {
        data,
        original_name,
        declared_mime,
        options,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read form field: {}", e)))
}

/// `POST /api/upload` — multipart upload with optional processing options.
/// Anonymous requests pass through the fingerprint rate limiter first; their
/// quota is reflected in `X-RateLimit-*` response headers.
pub async fn upload_file(
    State(state): State<AppState>,
    Identity(owner): Identity,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut response_headers = HeaderMap::new();

    if owner.is_anonymous() {
        let fingerprint = client_fingerprint(&headers);
        let decision = state.limiter.admit(&fingerprint).await;
        if !decision.allowed {
            return Err(HttpAppError(AppError::RateLimited {
                retry_after: decision.retry_after.unwrap_or_default(),
            }));
        }

        let limit = state.limiter.limit();
        response_headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(limit));
        response_headers.insert(
            RATE_LIMIT_REMAINING,
            HeaderValue::from(limit.saturating_sub(decision.count)),
        );
    }

    let form = parse_form(multipart).await?;

    let file = state
        .lifecycle
        .submit_upload(
            owner,
            &form.original_name,
            form.declared_mime,
            &form.data,
            form.options,
        )
        .await?;

    Ok((StatusCode::CREATED, response_headers, Json(file)))
}
