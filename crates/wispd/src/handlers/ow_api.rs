//! the json protocol under /ow/api/v1 for richer clients.
//!
//! adoption authenticates with the shared secret; config fetch and the
//! applied acknowledgement go through the hmac middleware. checksums in
//! this protocol are `"sha256:" + hex` over the rendered netjson bytes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use wispd_db::Database;

use super::{ApiError, OptionExt, ResultExt};
use crate::AppState;

/// body of POST /devices/adopt.
#[derive(Debug, Deserialize)]
pub struct AdoptRequest {
    /// device uuid, chosen by the client.
    #[serde(default)]
    pub uuid: String,

    /// opaque hardware fingerprint; accepted but not persisted.
    #[serde(default)]
    pub fingerprint: String,

    /// free-form metadata; `name`, `model` and `mac` are stored.
    #[serde(default)]
    pub metadata: Option<serde_json::Map<String, Value>>,
}

/// response of POST /devices/adopt.
#[derive(Debug, Serialize)]
pub struct AdoptResponse {
    /// stable device identifier.
    pub device_id: String,
    /// where the client polls next.
    pub next: String,
}

/// POST /ow/api/v1/devices/adopt
pub async fn ow_adopt(
    State(state): State<AppState>,
    Json(req): Json<AdoptRequest>,
) -> Result<Response, ApiError> {
    if req.uuid.trim().is_empty() {
        return Err(ApiError::bad_request("uuid required"));
    }

    let field = |key: &str| -> String {
        req.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let device = state
        .db
        .adopt_device(&req.uuid, &field("name"), &field("model"), &field("mac"))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AdoptResponse {
            next: format!("/ow/api/v1/devices/{}/config", device.uuid),
            device_id: device.uuid,
        }),
    )
        .into_response())
}

/// `?checksum=` query for config polls.
#[derive(Debug, Deserialize)]
pub struct ConfigQuery {
    /// checksum the client already holds.
    #[serde(default)]
    pub checksum: String,
}

/// body of GET /devices/{uuid}/config.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    /// the rendered netjson document.
    pub netjson: Value,
    /// configuration version, >= 1.
    pub version: i32,
    /// "sha256:<hex>" over the netjson bytes.
    pub checksum: String,
}

/// GET /ow/api/v1/devices/{uuid}/config
pub async fn ow_get_config(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Query(query): Query<ConfigQuery>,
) -> Result<Response, ApiError> {
    let device = state
        .db
        .get_device(&uuid)
        .await?
        .or_not_found("device not found")?;

    let netjson = device
        .rendered_config
        .clone()
        .unwrap_or_else(|| json!({"type": "DeviceConfiguration"}));
    let bytes = serde_json::to_vec(&netjson).map_internal()?;
    let checksum = format!("sha256:{}", hex::encode(Sha256::digest(&bytes)));

    if !query.checksum.is_empty() && query.checksum == checksum {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    Ok((
        StatusCode::OK,
        Json(ConfigResponse {
            netjson,
            version: device.config_version.max(1),
            checksum,
        }),
    )
        .into_response())
}

/// body of POST /devices/{uuid}/config/applied.
#[derive(Debug, Deserialize)]
pub struct AppliedRequest {
    /// version the client applied.
    #[serde(default)]
    pub version: i32,

    /// checksum the client applied; empty means "whatever is current".
    #[serde(default)]
    pub checksum: String,

    /// client-side apply timestamp (rfc3339); informational.
    #[serde(default)]
    pub applied_at: Option<String>,

    /// client-reported status.
    #[serde(default)]
    pub status: String,
}

/// POST /ow/api/v1/devices/{uuid}/config/applied
pub async fn ow_config_applied(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Json(req): Json<AppliedRequest>,
) -> Result<StatusCode, ApiError> {
    let device = state
        .db
        .get_device(&uuid)
        .await?
        .or_not_found("device not found")?;

    let checksum = if req.checksum.trim().is_empty() {
        device.config_checksum.clone()
    } else {
        req.checksum.trim().to_string()
    };
    state.db.mark_applied(&uuid, &checksum).await?;

    Ok(StatusCode::ACCEPTED)
}
