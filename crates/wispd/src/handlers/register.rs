//! handler for the /controller/register endpoint.
//!
//! implements openwisp's registration protocol: form-encoded request,
//! plaintext key/value response body. the device key is either supplied by
//! the agent, derived from mac + shared secret (consistent key), or random.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

use wispd_db::Database;
use wispd_types::DeviceKey;

use super::ApiError;
use crate::AppState;

/// form fields the agent posts at registration.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// shared secret proving the agent belongs to this controller.
    #[serde(default)]
    pub secret: String,

    /// device hostname.
    #[serde(default)]
    pub name: String,

    /// agent backend identifier, stored as the device model.
    #[serde(default)]
    pub backend: String,

    /// device mac address.
    #[serde(default)]
    pub mac_address: String,

    /// pre-existing device key, if the agent already has one.
    #[serde(default)]
    pub key: String,
}

/// handle device registration.
///
/// registration is idempotent on the device key: a repeated call returns
/// the same device with `is-new: 0`. a best-effort reconcile runs before
/// responding so the first checksum poll usually finds an archive.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let expected = state.config.shared_secret.trim();
    if !expected.is_empty() && form.secret != expected {
        return Err(ApiError::BadSecret);
    }

    let key = if !form.key.trim().is_empty() {
        DeviceKey::parse(&form.key).map_err(|e| ApiError::bad_request(format!("error: {e}\n")))?
    } else if state.config.consistent_key
        && !form.mac_address.trim().is_empty()
        && !expected.is_empty()
    {
        DeviceKey::consistent(&form.mac_address, expected)
    } else {
        DeviceKey::generate()
    };

    let (device, is_new) = state
        .db
        .register_device(&key, &form.name, &form.backend, &form.mac_address)
        .await?;
    debug!(uuid = %device.uuid, is_new, "device registered");

    // build the first archive eagerly; failures surface on the next poll
    if let Err(e) = state.reconciler.reconcile(&device.uuid).await {
        warn!(uuid = %device.uuid, error = %e, "post-registration reconcile failed");
    }

    let body = format!(
        "uuid: {}\nkey: {}\nhostname: {}\nis-new: {}\n",
        device.uuid,
        device.key,
        device.name,
        u8::from(is_new),
    );
    Ok((StatusCode::CREATED, body).into_response())
}
