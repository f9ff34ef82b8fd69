//! per-device hmac secrets for the json protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;

/// a device hmac secret. the raw secret is returned once at issuance and
/// never stored; the row keeps only an argon2id hash for audit/revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSecret {
    /// unique identifier.
    pub id: u64,

    /// owning device.
    pub device_id: DeviceId,

    /// short key identifier carried in the authorization header.
    pub key_id: String,

    /// argon2id hash of the raw secret.
    pub secret_hash: String,

    /// issuance timestamp.
    pub created_at: DateTime<Utc>,

    /// revocation timestamp; `None` while active.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl DeviceSecret {
    /// whether the secret is still usable.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}
