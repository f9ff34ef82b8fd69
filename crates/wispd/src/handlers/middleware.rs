//! small middleware shared across route groups.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;

/// every agent-protocol response carries this marker header.
pub async fn openwisp_header(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response.headers_mut().insert(
        "X-Openwisp-Controller",
        HeaderValue::from_static("true"),
    );
    response
}

/// bearer auth against the shared secret for admin and adoption endpoints.
pub async fn shared_secret_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let secret = state.config.shared_secret.trim();
    if secret.is_empty() {
        return next.run(req).await;
    }

    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|presented| presented == secret);

    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "unauthorized"})),
        )
            .into_response();
    }
    next.run(req).await
}
