//! api error handling for http handlers.
//!
//! protocol-level failures (bad secret, wrong key, unknown device, bad
//! input) render the plaintext bodies the agent expects; internal failures
//! render rfc 7807 problem+json with a correlation id that is also logged.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

/// api error type for handler responses.
#[derive(Debug)]
pub enum ApiError {
    /// registration shared secret mismatch (401).
    BadSecret,
    /// unauthorized error (401).
    Unauthorized(String),
    /// not found error (404).
    NotFound(String),
    /// malformed input (400).
    BadRequest(String),
    /// internal server error (500).
    Internal(String),
}

impl ApiError {
    /// create internal server error from any error type.
    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }

    /// create unauthorized error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// create not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// create bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadSecret => {
                (StatusCode::UNAUTHORIZED, "error: unrecognized secret\n").into_response()
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Internal(detail) => problem_response(detail),
        }
    }
}

/// render a 500 as rfc 7807 problem+json with a correlation id.
fn problem_response(detail: String) -> Response {
    let reqid = uuid::Uuid::new_v4().to_string();
    error!(reqid = %reqid, detail = %detail, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/problem+json")],
        Json(json!({
            "title": "internal server error",
            "status": 500,
            "detail": detail,
            "reqid": reqid,
        })),
    )
        .into_response()
}

/// convert a handler panic into the same problem+json shape. the payload is
/// logged once; the client only sees the correlation id.
pub fn panic_to_problem(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "panic".to_string()
    };
    problem_response(format!("handler panicked: {detail}"))
}

impl From<wispd_db::Error> for ApiError {
    fn from(err: wispd_db::Error) -> Self {
        match err {
            wispd_db::Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<crate::ReconcileError> for ApiError {
    fn from(err: crate::ReconcileError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// extension trait for converting results to apierror.
pub trait ResultExt<T> {
    /// convert error to internal server error.
    fn map_internal(self) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn map_internal(self) -> Result<T, ApiError> {
        self.map_err(ApiError::internal)
    }
}

/// extension trait for converting options to apierror.
pub trait OptionExt<T> {
    /// convert none to unauthorized error.
    fn or_unauthorized(self, msg: &str) -> Result<T, ApiError>;
    /// convert none to not found error.
    fn or_not_found(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_unauthorized(self, msg: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::unauthorized(msg))
    }

    fn or_not_found(self, msg: &str) -> Result<T, ApiError> {
        self.ok_or_else(|| ApiError::not_found(msg))
    }
}
