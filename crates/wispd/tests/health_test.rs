//! integration tests for the `/health` endpoint.

mod common;

use axum::http::StatusCode;
use common::*;
use serde::Deserialize;

/// response from the `/health` endpoint.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[tokio::test]
async fn test_health_endpoint_returns_pass() {
    let (app, _db) = test_app(test_config()).await;

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .expect("should have content-type header")
        .to_str()
        .expect("content-type should be valid string")
        .to_string();
    assert!(
        content_type.contains("application/health+json"),
        "content-type should be application/health+json, got: {content_type}"
    );

    let body = body_string(response).await;
    let health: HealthResponse = serde_json::from_str(&body).expect("failed to parse response");
    assert_eq!(health.status, "pass");
}
