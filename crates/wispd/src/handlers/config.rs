//! handlers for /controller/checksum and /controller/download-config.
//!
//! both run a best-effort reconcile first so the response reflects the
//! latest server-side state, then authenticate with the device key. an
//! unknown device and a wrong key are indistinguishable to the agent (404).

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use wispd_db::Database;
use wispd_types::Device;

use super::{ApiError, OptionExt};
use crate::AppState;

/// `?key=` query parameter for the agent endpoints.
#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    /// the device key.
    #[serde(default)]
    pub key: String,
}

/// fetch the device and authenticate; both failures collapse to 404.
async fn authenticated_device(
    state: &AppState,
    uuid: &str,
    key: &str,
) -> Result<Device, ApiError> {
    let device = state
        .db
        .get_device(uuid)
        .await?
        .or_not_found("device not found")?;
    if !device.key.matches(key) {
        return Err(ApiError::not_found("device not found"));
    }
    Ok(device)
}

/// GET /controller/checksum/{uuid}?key=...
///
/// responds with the archive's hex sha-256 plus a trailing newline.
pub async fn checksum(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(query): Query<KeyQuery>,
) -> Result<Response, ApiError> {
    if let Err(e) = state.reconciler.reconcile(&uuid).await {
        warn!(uuid = %uuid, error = %e, "pre-response reconcile failed");
    }

    let device = authenticated_device(&state, &uuid, &query.key).await?;
    if !device.has_archive() {
        return Err(ApiError::not_found("no configuration yet"));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", device.config_checksum),
    )
        .into_response())
}

/// GET /controller/download-config/{uuid}?key=...
///
/// serves the archive with validation headers; `If-None-Match` against the
/// checksum etag short-circuits to 304.
pub async fn download_config(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(query): Query<KeyQuery>,
    request_headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Err(e) = state.reconciler.reconcile(&uuid).await {
        warn!(uuid = %uuid, error = %e, "pre-response reconcile failed");
    }

    let device = authenticated_device(&state, &uuid, &query.key).await?;
    if !device.has_archive() {
        return Err(ApiError::not_found("no configuration yet"));
    }

    let sum = device.config_checksum.as_str();
    let etag = format!("\"{sum}\"");
    let validation_headers = [
        (header::ETAG, etag.clone()),
        (
            header::HeaderName::from_static("x-openwisp-archive-sha256"),
            sum.to_string(),
        ),
        (
            header::CACHE_CONTROL,
            "private, max-age=0, must-revalidate".to_string(),
        ),
    ];

    let if_none_match = request_headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    if if_none_match == Some(etag.as_str()) {
        return Ok((StatusCode::NOT_MODIFIED, validation_headers).into_response());
    }

    let disposition = format!(
        "attachment; filename=\"{}-{}.tar.gz\"",
        device.uuid,
        &sum[..8.min(sum.len())],
    );
    Ok((
        StatusCode::OK,
        validation_headers,
        [
            (header::CONTENT_TYPE, "application/gzip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        device.config_archive,
    )
        .into_response())
}
