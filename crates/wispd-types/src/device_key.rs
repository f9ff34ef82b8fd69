//! device key - the stable per-device secret used by the agent protocol.
//!
//! keys are 32 lowercase hex characters. a key is either supplied by the
//! agent, derived deterministically from the device mac and the shared
//! secret ("consistent key", so re-registration yields the same key), or
//! generated at random.

use md5::{Digest, Md5};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use subtle::ConstantTimeEq;

/// length of a device key in hex characters.
pub const DEVICE_KEY_LEN: usize = 32;

/// error constructing a [`DeviceKey`] from a string.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeviceKeyError {
    /// wrong length.
    #[error("device key must be {DEVICE_KEY_LEN} hex chars, got {0}")]
    BadLength(usize),
    /// non-hex characters.
    #[error("device key must be lowercase hex")]
    NotHex,
}

/// stable per-device secret, 32 lowercase hex chars.
///
/// comparison with an untrusted candidate goes through [`DeviceKey::matches`]
/// which is constant-time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// generate a fresh random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// derive the consistent key for a mac address and shared secret:
    /// `hex(md5(lowercase(mac) || secret))`, compatible with
    /// openwisp's consistent-key registration.
    pub fn consistent(mac: &str, shared_secret: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(mac.trim().to_lowercase().as_bytes());
        hasher.update(shared_secret.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// parse an agent-supplied key, normalising to lowercase.
    pub fn parse(s: &str) -> Result<Self, DeviceKeyError> {
        let s = s.trim().to_lowercase();
        if s.len() != DEVICE_KEY_LEN {
            return Err(DeviceKeyError::BadLength(s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(DeviceKeyError::NotHex);
        }
        Ok(Self(s))
    }

    /// constant-time comparison against an untrusted candidate string.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim().to_lowercase();
        if candidate.len() != self.0.len() {
            return false;
        }
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// key as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DeviceKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DeviceKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}
