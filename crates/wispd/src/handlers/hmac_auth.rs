//! hmac signature verification and replay prevention for the json protocol.
//!
//! requests carry `X-OW-Device`, `X-OW-Date` (rfc3339), `X-OW-Nonce`,
//! optionally `X-OW-Body-SHA256` and
//! `Authorization: OW1-HMAC-SHA256 <keyId>:<hexSig>`. the signature covers
//! the newline-joined canonical tuple of method, path, query, body hash and
//! the three X-OW headers. nonces are remembered per key id for twice the
//! clock-skew window so a replayed request inside the window fails.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// maximum tolerated clock skew between client and server.
pub const DEFAULT_MAX_SKEW: Duration = Duration::from_secs(5 * 60);

/// upper bound on signed request bodies.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// process-local replay cache: `(key id, nonce)` pairs with their request
/// timestamps, garbage-collected on insert.
#[derive(Clone)]
pub struct NonceCache {
    entries: Arc<DashMap<String, DashMap<String, DateTime<Utc>>>>,
    ttl: chrono::Duration,
}

impl NonceCache {
    /// cache entries live for twice the skew window.
    pub fn with_skew(max_skew: Duration) -> Self {
        let ttl = chrono::Duration::from_std(max_skew * 2)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// atomically record a nonce. returns `false` if it was already seen
    /// (and still within the ttl).
    pub fn check_and_insert(&self, key_id: &str, nonce: &str, at: DateTime<Utc>) -> bool {
        let per_key = self
            .entries
            .entry(key_id.to_string())
            .or_insert_with(DashMap::new);

        // gc expired nonces while we hold the shard
        let cutoff = Utc::now() - self.ttl;
        per_key.retain(|_, seen_at| *seen_at >= cutoff);

        match per_key.entry(nonce.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(at);
                true
            }
        }
    }
}

/// axum middleware enforcing the hmac scheme.
pub async fn hmac_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match verify(&state, req).await {
        Ok(req) => next.run(req).await,
        Err(reason) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": reason})),
        )
            .into_response(),
    }
}

async fn verify(state: &AppState, req: Request) -> Result<Request, &'static str> {
    let headers = req.headers();
    let device = header_string(headers, "x-ow-device");
    let date = header_string(headers, "x-ow-date");
    let nonce = header_string(headers, "x-ow-nonce");
    let supplied_body_hash = header_string(headers, "x-ow-body-sha256");
    let authorization = header_string(headers, "authorization");

    if device.is_empty() || date.is_empty() || nonce.is_empty() || authorization.is_empty() {
        return Err("missing auth headers");
    }

    // Authorization: "OW1-HMAC-SHA256 keyId:signatureHex"
    const SCHEME: &str = "OW1-HMAC-SHA256 ";
    let Some(credentials) = authorization.strip_prefix(SCHEME) else {
        return Err("bad scheme");
    };
    let Some((key_id, signature_hex)) = credentials.split_once(':') else {
        return Err("bad authorization format");
    };
    if key_id.is_empty() || signature_hex.len() < 20 {
        return Err("bad signature");
    }

    // clock skew
    let Ok(timestamp) = DateTime::parse_from_rfc3339(&date) else {
        return Err("bad date");
    };
    let timestamp = timestamp.with_timezone(&Utc);
    let max_skew = chrono::Duration::from_std(DEFAULT_MAX_SKEW)
        .unwrap_or_else(|_| chrono::Duration::minutes(5));
    if (Utc::now() - timestamp).abs() > max_skew {
        return Err("clock skew");
    }

    // read and hash the body, keeping the bytes for the inner handler
    let (parts, body) = req.into_parts();
    let Ok(body_bytes) = axum::body::to_bytes(body, MAX_BODY_BYTES).await else {
        return Err("read body");
    };
    let computed_body_hash = hex::encode(Sha256::digest(&body_bytes));
    if !supplied_body_hash.is_empty()
        && !supplied_body_hash.eq_ignore_ascii_case(&computed_body_hash)
    {
        return Err("body hash mismatch");
    }

    // resolve the secret
    let Some(secret) = state.key_provider.lookup(&device, key_id) else {
        return Err("unknown key");
    };

    // canonical string
    let date_line = format!("X-OW-Date:{date}");
    let device_line = format!("X-OW-Device:{device}");
    let nonce_line = format!("X-OW-Nonce:{nonce}");
    let canonical = [
        parts.method.as_str(),
        parts.uri.path(),
        parts.uri.query().unwrap_or(""),
        computed_body_hash.as_str(),
        date_line.as_str(),
        device_line.as_str(),
        nonce_line.as_str(),
    ]
    .join("\n");

    // constant-time comparison via Mac::verify_slice
    let Ok(signature) = hex::decode(signature_hex) else {
        return Err("bad signature");
    };
    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(canonical.as_bytes());
    if mac.verify_slice(&signature).is_err() {
        return Err("invalid signature");
    }

    // replay defence
    if !state.nonce_cache.check_and_insert(key_id, &nonce, timestamp) {
        return Err("replayed nonce");
    }

    Ok(Request::from_parts(parts, Body::from(body_bytes)))
}

fn header_string(headers: &axum::http::HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
