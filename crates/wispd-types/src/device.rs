//! device type representing a managed router.
//!
//! devices are the core entity in wispd - each row tracks one agent plus
//! the latest configuration archive computed for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device_key::DeviceKey;

/// unique identifier for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// convert to the signed form used by the database layer.
    pub fn as_i64(&self) -> i64 {
        self.0 as i64
    }

    /// raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<i64> for DeviceId {
    fn from(id: i64) -> Self {
        Self(id as u64)
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// liveness status of a device as tracked by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// never reported, or state could not be determined.
    #[default]
    Unknown,
    /// last report indicated the agent is healthy.
    Online,
    /// last report indicated a failure.
    Offline,
}

impl DeviceStatus {
    /// map an agent-reported status string to a stored status.
    ///
    /// the mapping is deliberately permissive: anything not recognised as a
    /// failure counts as online. callers wanting strict validation reject
    /// unknown strings before storing.
    pub fn from_report(report: &str) -> Self {
        match report.trim().to_lowercase().as_str() {
            "error" | "failed" | "offline" => Self::Offline,
            _ => Self::Online,
        }
    }

    /// database string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::str::FromStr for DeviceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(()),
        }
    }
}

/// a managed router.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// unique identifier.
    pub id: DeviceId,

    /// opaque uuid the agent addresses the device by.
    pub uuid: String,

    /// stable per-device secret, 32 hex chars.
    ///
    /// never logged; only returned to the owning agent at registration.
    pub key: DeviceKey,

    /// hostname reported at registration.
    pub name: String,

    /// hardware model / agent backend identifier.
    pub model: String,

    /// normalised (lowercase) mac address.
    pub mac: String,

    /// current liveness status.
    pub status: DeviceStatus,

    /// when the agent last contacted the controller.
    pub last_seen_at: Option<DateTime<Utc>>,

    /// latest configuration archive (gzipped tar).
    pub config_archive: Vec<u8>,

    /// hex sha-256 of `config_archive`.
    pub config_checksum: String,

    /// monotonically nondecreasing archive version, >= 1 once written.
    pub config_version: i32,

    /// rendered netjson the archive was built from, if any.
    pub rendered_config: Option<serde_json::Value>,

    /// when the archive was last rewritten.
    pub config_updated_at: Option<DateTime<Utc>>,

    /// checksum the agent last reported as applied.
    pub last_applied_sum: String,

    /// raw status string from the agent's last report.
    pub last_reported_status: String,

    /// creation timestamp.
    pub created_at: DateTime<Utc>,

    /// last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// whether a configuration archive has been stored for this device yet.
    pub fn has_archive(&self) -> bool {
        !self.config_archive.is_empty() && !self.config_checksum.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_mapping_is_permissive() {
        assert_eq!(DeviceStatus::from_report("running"), DeviceStatus::Online);
        assert_eq!(DeviceStatus::from_report("applied"), DeviceStatus::Online);
        assert_eq!(DeviceStatus::from_report("OK"), DeviceStatus::Online);
        assert_eq!(DeviceStatus::from_report("success"), DeviceStatus::Online);
        assert_eq!(DeviceStatus::from_report("error"), DeviceStatus::Offline);
        assert_eq!(DeviceStatus::from_report("FAILED"), DeviceStatus::Offline);
        assert_eq!(DeviceStatus::from_report("offline"), DeviceStatus::Offline);
        // unrecognised strings count as online
        assert_eq!(DeviceStatus::from_report("rebooting"), DeviceStatus::Online);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            DeviceStatus::Unknown,
            DeviceStatus::Online,
            DeviceStatus::Offline,
        ] {
            assert_eq!(status.as_str().parse(), Ok(status));
        }
    }
}
