//! health check endpoint handler.

use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tokio::time::timeout;

use crate::AppState;
use wispd_db::Database;

/// health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// content-type for health check responses.
const HEALTH_CONTENT_TYPE: &str = "application/health+json; charset=utf-8";

/// timeout for the database ping.
const PING_TIMEOUT: Duration = Duration::from_secs(1);

/// GET /health - health check endpoint.
///
/// checks database connectivity with a 1-second timeout. returns 200 with
/// `{"status": "pass"}` if healthy, 500 with `{"status": "fail"}` otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let ping_result = timeout(PING_TIMEOUT, state.db.ping()).await;

    let (status_code, health_status) = match ping_result {
        Ok(Ok(())) => (StatusCode::OK, "pass"),
        Ok(Err(_)) | Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "fail"),
    };

    (
        status_code,
        [(header::CONTENT_TYPE, HEALTH_CONTENT_TYPE)],
        Json(HealthResponse {
            status: health_status,
        }),
    )
        .into_response()
}
