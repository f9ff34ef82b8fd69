//! certificate authority and issued certificate types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::DeviceId;

/// a root certificate authority, created lazily on first openvpn reconcile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ca {
    /// unique identifier.
    pub id: u64,

    /// ca name, unique; doubles as the certificate common name.
    pub name: String,

    /// pem-encoded certificate.
    pub cert_pem: String,

    /// pem-encoded private key.
    pub key_pem: String,

    /// validity window start.
    pub not_before: DateTime<Utc>,

    /// validity window end.
    pub not_after: DateTime<Utc>,

    /// creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// a certificate issued by a [`Ca`]. device certificates are issued per
/// reconcile and never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// unique identifier.
    pub id: u64,

    /// issuing ca.
    pub ca_id: u64,

    /// device the certificate was issued for, if any.
    pub device_id: Option<DeviceId>,

    /// subject common name (the device uuid for device certs).
    pub cn: String,

    /// pem-encoded certificate.
    pub cert_pem: String,

    /// pem-encoded private key.
    pub key_pem: String,

    /// validity window start.
    pub not_before: DateTime<Utc>,

    /// validity window end.
    pub not_after: DateTime<Utc>,

    /// creation timestamp.
    pub created_at: DateTime<Utc>,
}
