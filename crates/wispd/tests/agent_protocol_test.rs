//! tests for the checksum / download-config / report-status agent endpoints.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::*;
use sha2::{Digest, Sha256};
use tower::ServiceExt;

#[tokio::test]
async fn test_first_checksum_serves_minimal_archive() {
    let (app, _db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_string(response).await;
    assert!(first.ends_with('\n'));
    assert_eq!(first.trim().len(), 64, "body is a hex sha-256");

    // stable across polls
    let second =
        body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await).await;
    assert_eq!(first, second);

    // the archive itself carries the hostname
    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    assert_eq!(download.status(), StatusCode::OK);
    let archive = body_bytes(download).await;
    let files = unpack_archive(&archive);
    let system = String::from_utf8(files["etc/config/system"].clone()).unwrap();
    assert!(system.contains("option hostname 'node1'"));
}

#[tokio::test]
async fn test_checksum_matches_downloaded_bytes() {
    let (app, _db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let sum = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await
        .trim()
        .to_string();

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(
        download.headers().get("ETag").and_then(|v| v.to_str().ok()),
        Some(format!("\"{sum}\"").as_str())
    );
    assert_eq!(
        download
            .headers()
            .get("X-Openwisp-Archive-Sha256")
            .and_then(|v| v.to_str().ok()),
        Some(sum.as_str())
    );
    assert_eq!(
        download
            .headers()
            .get("Cache-Control")
            .and_then(|v| v.to_str().ok()),
        Some("private, max-age=0, must-revalidate")
    );
    assert_eq!(
        download
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok()),
        Some("application/gzip")
    );
    let disposition = download
        .headers()
        .get("Content-Disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(disposition.starts_with(&format!("attachment; filename=\"{uuid}-")));

    let archive = body_bytes(download).await;
    assert_eq!(hex::encode(Sha256::digest(&archive)), sum);
}

#[tokio::test]
async fn test_download_supports_if_none_match() {
    let (app, _db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let sum = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await
        .trim()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/controller/download-config/{uuid}?key={key}"))
                .header("If-None-Match", format!("\"{sum}\""))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(response.headers().contains_key("ETag"));
    assert!(body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_wrong_key_and_unknown_device_are_404() {
    let (app, _db) = test_app(test_config()).await;
    let (uuid, _key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let wrong_key = "00000000000000000000000000000000";
    let response = get(&app, &format!("/controller/checksum/{uuid}?key={wrong_key}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(
        &app,
        &format!("/controller/checksum/11111111-2222-3333-4444-555555555555?key={wrong_key}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(
        &app,
        &format!("/controller/download-config/{uuid}?key={wrong_key}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_template_change_updates_archive_and_version() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let before = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;

    // author a template through the admin api
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/templates")
                .header("content-type", "application/json")
                .header("authorization", "Bearer topsecret")
                .body(Body::from(
                    r#"{"name":"base","priority":10,"netjson":{"system":{"hostname":"edge"}}}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let after = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;
    assert_ne!(before, after, "template change must change the checksum");

    // version bumped to 2, archive reflects the template hostname
    use wispd_db::Database;
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.config_version, 2);

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    let files = unpack_archive(&body_bytes(download).await);
    let system = String::from_utf8(files["etc/config/system"].clone()).unwrap();
    assert!(system.contains("option hostname 'edge'"));
}

#[tokio::test]
async fn test_report_status_running_marks_online() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = post_form(
        &app,
        &format!("/controller/report-status/{uuid}"),
        &format!("key={key}&status=running"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok\n");

    use wispd_db::Database;
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.status, wispd_types::DeviceStatus::Online);
    assert!(device.last_seen_at.is_some());
    assert_eq!(device.last_reported_status, "running");
}

#[tokio::test]
async fn test_report_status_error_marks_offline() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = post_form(
        &app,
        // underscore alias
        &format!("/controller/report_status/{uuid}"),
        &format!("key={key}&status=error"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    use wispd_db::Database;
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.status, wispd_types::DeviceStatus::Offline);
}

#[tokio::test]
async fn test_report_status_applied_pins_checksum() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = post_form(
        &app,
        &format!("/controller/report-status/{uuid}"),
        &format!("key={key}&status=applied"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    use wispd_db::Database;
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.last_applied_sum, device.config_checksum);
    assert_eq!(device.status, wispd_types::DeviceStatus::Online);
}

#[tokio::test]
async fn test_report_status_rejects_garbage_and_wrong_key() {
    let (app, _db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = post_form(
        &app,
        &format!("/controller/report-status/{uuid}"),
        &format!("key={key}&status=exploded"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_form(
        &app,
        &format!("/controller/report-status/{uuid}"),
        "key=00000000000000000000000000000000&status=running",
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_empty_status_defaults_to_running() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let response = post_form(
        &app,
        &format!("/controller/report-status/{uuid}"),
        &format!("key={key}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    use wispd_db::Database;
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.last_reported_status, "running");
}
