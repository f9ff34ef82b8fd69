//! handler for /controller/report-status.

use axum::{
    Form,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use wispd_db::Database;
use wispd_types::DeviceStatus;

use super::{ApiError, OptionExt};
use crate::AppState;

/// status strings the endpoint accepts. anything else is a 400; the
/// store-side mapping stays permissive for values that do get through.
const ACCEPTED_STATUSES: &[&str] = &[
    "running", "applied", "ok", "updated", "error", "online", "offline", "success", "failed",
];

/// statuses that mean "the current archive is now live on the device".
const APPLIED_STATUSES: &[&str] = &["applied", "ok", "success", "updated"];

/// form fields for a status report.
#[derive(Debug, Deserialize)]
pub struct ReportStatusForm {
    /// the device key.
    #[serde(default)]
    pub key: String,

    /// reported status; empty defaults to `running`.
    #[serde(default)]
    pub status: String,
}

/// POST /controller/report-status/{uuid}
///
/// records liveness and the mapped status; `applied`-class reports also
/// pin the archive checksum as applied.
pub async fn report_status(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
    Form(form): Form<ReportStatusForm>,
) -> Result<Response, ApiError> {
    let mut status = form.status.trim().to_lowercase();
    if status.is_empty() {
        status = "running".to_string();
    }
    if !ACCEPTED_STATUSES.contains(&status.as_str()) {
        return Err(ApiError::bad_request("bad status"));
    }

    let device = state
        .db
        .get_device(&uuid)
        .await?
        .or_not_found("device not found")?;
    if !device.key.matches(&form.key) {
        return Err(ApiError::unauthorized("unauthorized"));
    }

    state
        .db
        .report_status(&uuid, DeviceStatus::from_report(&status), &status)
        .await?;

    if APPLIED_STATUSES.contains(&status.as_str()) && device.has_archive() {
        state.db.mark_applied(&uuid, &device.config_checksum).await?;
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "ok\n",
    )
        .into_response())
}
