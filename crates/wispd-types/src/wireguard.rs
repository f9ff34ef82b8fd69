//! wireguard peer material persisted per device.

use serde::{Deserialize, Serialize};

use crate::device::DeviceId;

/// wireguard material for one device. at most one peer exists per device;
/// once created the row is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireGuardPeer {
    /// unique identifier.
    pub id: u64,

    /// owning device.
    pub device_id: DeviceId,

    /// device private key (base64).
    pub private_key: String,

    /// device public key (base64).
    pub public_key: String,

    /// preshared key shared with the server (base64).
    pub preshared_key: String,

    /// address assigned from the pool, "a.b.c.d/32".
    pub address_cidr: String,

    /// server public key the device peers with (base64).
    pub server_public_key: String,

    /// server endpoint, "host:port".
    pub endpoint: String,

    /// allowed ips as a comma-separated list.
    pub allowed_ips: String,

    /// persistent keepalive in seconds (0 disables).
    pub keepalive: u16,
}
