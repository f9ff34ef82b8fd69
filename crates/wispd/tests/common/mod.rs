//! shared helpers for wispd integration tests.

#![allow(dead_code)] // test utilities may not all be used in every test file

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::collections::BTreeMap;
use std::io::Read;
use tower::ServiceExt;

use wispd_db::WispdDb;
use wispd_types::Config;

/// a config with the shared secret the tests use throughout.
pub fn test_config() -> Config {
    Config {
        shared_secret: "topsecret".to_string(),
        consistent_key: true,
        ..Default::default()
    }
}

/// build an app over a fresh in-memory database.
pub async fn test_app(config: Config) -> (Router, WispdDb) {
    let db = WispdDb::new_in_memory()
        .await
        .expect("failed to create in-memory database");
    let app = wispd::create_app(db.clone(), config).await;
    (app, db)
}

/// send a form-encoded post.
pub async fn post_form(app: &Router, uri: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .expect("failed to build request"),
        )
        .await
        .expect("request failed")
}

/// send a get.
pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await
        .expect("request failed")
}

/// read a response body to a string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("body is not utf-8")
}

/// read a response body to bytes.
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
        .to_vec()
}

/// parse the plaintext `k: v` registration response body.
pub fn parse_register_body(body: &str) -> BTreeMap<String, String> {
    body.lines()
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// register a device and return `(uuid, key)`.
pub async fn register_device(app: &Router, name: &str, mac: &str) -> (String, String) {
    let response = post_form(
        app,
        "/controller/register",
        &format!("secret=topsecret&name={name}&backend=openwrt&mac_address={mac}"),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let fields = parse_register_body(&body_string(response).await);
    (fields["uuid"].clone(), fields["key"].clone())
}

/// unpack a gzipped tar into (path -> contents).
pub fn unpack_archive(bytes: &[u8]) -> BTreeMap<String, Vec<u8>> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));
    let mut files = BTreeMap::new();
    for entry in archive.entries().expect("invalid archive") {
        let mut entry = entry.expect("invalid entry");
        let path = entry
            .path()
            .expect("invalid path")
            .to_string_lossy()
            .into_owned();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).expect("read entry");
        files.insert(path, data);
    }
    files
}
