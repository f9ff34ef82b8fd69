//! wispd library - HTTP handlers and application setup.

pub mod cli;
pub mod handlers;
mod reconcile;
mod secrets;
mod vpn;

use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use wispd_db::WispdDb;
use wispd_types::Config;

pub use reconcile::{ReconcileError, ReconcileOutcome, Reconciler};
pub use secrets::{IssuedSecret, MemKeyProvider, issue_device_secret, verify_device_secret};

use handlers::hmac_auth::NonceCache;

/// application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// database handle.
    pub db: WispdDb,
    /// application configuration.
    pub config: Config,
    /// the per-device reconcile pipeline.
    pub reconciler: Reconciler,
    /// in-process raw secrets for hmac verification.
    pub key_provider: MemKeyProvider,
    /// replay defence for the json protocol.
    pub nonce_cache: NonceCache,
}

/// create the axum application with all routes.
pub async fn create_app(db: WispdDb, config: Config) -> Router {
    let reconciler = Reconciler::new(db.clone(), config.clone());
    let state = AppState {
        db,
        config: config.clone(),
        reconciler,
        key_provider: MemKeyProvider::default(),
        nonce_cache: NonceCache::with_skew(handlers::hmac_auth::DEFAULT_MAX_SKEW),
    };

    // agent protocol: form-encoded, plaintext bodies, trailing slashes accepted
    let controller = Router::new()
        .route("/register", post(handlers::register))
        .route("/register/", post(handlers::register))
        .route("/checksum/{uuid}", get(handlers::checksum))
        .route("/checksum/{uuid}/", get(handlers::checksum))
        .route("/download-config/{uuid}", get(handlers::download_config))
        .route("/download-config/{uuid}/", get(handlers::download_config))
        .route("/report-status/{uuid}", post(handlers::report_status))
        .route("/report-status/{uuid}/", post(handlers::report_status))
        .route("/report_status/{uuid}", post(handlers::report_status))
        .route("/report_status/{uuid}/", post(handlers::report_status))
        .layer(middleware::from_fn(handlers::openwisp_header));

    // json protocol: hmac-signed except adoption, which uses the shared secret
    let ow_signed = Router::new()
        .route("/devices/{uuid}/config", get(handlers::ow_get_config))
        .route(
            "/devices/{uuid}/config/applied",
            post(handlers::ow_config_applied),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::hmac_auth::hmac_auth,
        ));
    let ow_adopt = Router::new()
        .route("/devices/adopt", post(handlers::ow_adopt))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::shared_secret_auth,
        ));
    let ow_api = ow_signed.merge(ow_adopt);

    // admin surface: templates, devices, secret issuance
    let admin_api = Router::new()
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route("/devices", get(handlers::list_devices))
        .route("/devices/{uuid}", get(handlers::get_device))
        .route("/devices/{uuid}/secrets", post(handlers::issue_secret))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::shared_secret_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/controller", controller)
        .nest("/ow/api/v1", ow_api)
        .nest("/api/v1", admin_api)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handlers::panic_to_problem))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .with_state(state)
}
