//! admin json api: templates, device inventory, secret issuance.
//!
//! everything here sits behind the shared-secret bearer middleware. device
//! listings never include the device key; secrets are shown exactly once,
//! at issuance.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wispd_db::Database;
use wispd_types::{ConfigTemplate, Device, DeviceStatus};

use super::{ApiError, OptionExt};
use crate::AppState;

/// device fields safe to expose to admins.
#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    /// agent-facing uuid.
    pub uuid: String,
    /// hostname.
    pub name: String,
    /// hardware model.
    pub model: String,
    /// mac address.
    pub mac: String,
    /// liveness status.
    pub status: DeviceStatus,
    /// configuration version.
    pub config_version: i32,
    /// archive checksum.
    pub config_checksum: String,
    /// checksum the agent last applied.
    pub last_applied_sum: String,
    /// last agent contact.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// registration time.
    pub created_at: DateTime<Utc>,
}

impl From<Device> for DeviceSummary {
    fn from(device: Device) -> Self {
        Self {
            uuid: device.uuid,
            name: device.name,
            model: device.model,
            mac: device.mac,
            status: device.status,
            config_version: device.config_version,
            config_checksum: device.config_checksum,
            last_applied_sum: device.last_applied_sum,
            last_seen_at: device.last_seen_at,
            created_at: device.created_at,
        }
    }
}

/// GET /api/v1/devices
pub async fn list_devices(State(state): State<AppState>) -> Result<Response, ApiError> {
    let devices = state.db.list_devices().await?;
    let summaries: Vec<DeviceSummary> = devices.into_iter().map(Into::into).collect();
    Ok(Json(summaries).into_response())
}

/// GET /api/v1/devices/{uuid}
pub async fn get_device(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Response, ApiError> {
    let device = state
        .db
        .get_device(&uuid)
        .await?
        .or_not_found("device not found")?;
    Ok(Json(DeviceSummary::from(device)).into_response())
}

/// body of POST /api/v1/templates.
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    /// template name, unique per organisation.
    pub name: String,

    /// merge priority; lower merges first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// the netjson body; must be an object.
    pub netjson: Value,

    /// optional json schema for the variable bag.
    #[serde(default)]
    pub vars_schema: Option<Value>,

    /// owning organisation.
    #[serde(default)]
    pub org_id: Option<u64>,
}

fn default_priority() -> i32 {
    100
}

/// POST /api/v1/templates
pub async fn create_template(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> Result<Response, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name required"));
    }
    if !req.netjson.is_object() {
        return Err(ApiError::bad_request("netjson must be a JSON object"));
    }

    let now = Utc::now();
    let created = state
        .db
        .create_template(&ConfigTemplate {
            id: 0,
            org_id: req.org_id,
            name: req.name.trim().to_string(),
            priority: req.priority,
            netjson: req.netjson,
            vars_schema: req.vars_schema,
            created_at: now,
            updated_at: now,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(created)).into_response())
}

/// GET /api/v1/templates
pub async fn list_templates(State(state): State<AppState>) -> Result<Response, ApiError> {
    let templates = state.db.list_templates().await?;
    Ok(Json(templates).into_response())
}

/// response of POST /api/v1/devices/{uuid}/secrets. the secret appears
/// only here.
#[derive(Debug, Serialize)]
pub struct IssuedSecretResponse {
    /// key id the client sends in the authorization header.
    pub key_id: String,
    /// hex-encoded raw secret; hmac keys are its decoded bytes.
    pub secret: String,
}

/// POST /api/v1/devices/{uuid}/secrets
pub async fn issue_secret(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Response, ApiError> {
    let device = state
        .db
        .get_device(&uuid)
        .await?
        .or_not_found("device not found")?;

    let issued = crate::issue_device_secret(&state.db, &state.key_provider, &device).await?;
    Ok((
        StatusCode::CREATED,
        Json(IssuedSecretResponse {
            key_id: issued.key_id,
            secret: issued.secret_hex,
        }),
    )
        .into_response())
}
