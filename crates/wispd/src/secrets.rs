//! per-device hmac secret issuance and the in-process key provider.
//!
//! a secret is 32 random bytes. the database keeps only an argon2id hash
//! (for audit and revocation); the raw bytes are returned once to the
//! caller and registered with the in-process provider the hmac middleware
//! consults. cross-process deployments would need an external provider.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use chrono::Utc;
use dashmap::DashMap;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;

use wispd_db::{Database, WispdDb};
use wispd_types::{Device, DeviceSecret};

/// length of the short key identifier, in raw bytes before hex encoding.
const KEY_ID_BYTES: usize = 6;

/// a freshly issued secret. the raw value exists only here.
#[derive(Debug, Clone)]
pub struct IssuedSecret {
    /// short identifier carried in the authorization header.
    pub key_id: String,
    /// raw secret bytes, hex-encoded for transport.
    pub secret_hex: String,
}

/// in-process map of raw device secrets for hmac verification,
/// keyed by device uuid.
#[derive(Clone, Default)]
pub struct MemKeyProvider {
    keys: Arc<DashMap<String, (String, Vec<u8>)>>,
}

impl MemKeyProvider {
    /// register a device secret.
    pub fn put(&self, device_uuid: &str, key_id: &str, secret: Vec<u8>) {
        self.keys
            .insert(device_uuid.to_string(), (key_id.to_string(), secret));
    }

    /// look up the secret for `(device, key id)`.
    pub fn lookup(&self, device_uuid: &str, key_id: &str) -> Option<Vec<u8>> {
        let entry = self.keys.get(device_uuid)?;
        let (stored_key_id, secret) = entry.value();
        if stored_key_id == key_id {
            Some(secret.clone())
        } else {
            None
        }
    }

    /// drop a device's secret (revocation).
    pub fn remove(&self, device_uuid: &str) {
        self.keys.remove(device_uuid);
    }
}

/// issue a new hmac secret for a device: persist the hash, register the
/// raw bytes with the provider, return both identifiers to the caller.
pub async fn issue_device_secret(
    db: &WispdDb,
    provider: &MemKeyProvider,
    device: &Device,
) -> Result<IssuedSecret, wispd_db::Error> {
    let mut raw = [0u8; 32];
    OsRng.fill_bytes(&mut raw);
    let key_id = hex::encode(&raw[..KEY_ID_BYTES]);

    let salt = SaltString::generate(&mut OsRng);
    let secret_hash = Argon2::default()
        .hash_password(&raw, &salt)
        .map_err(|e| wispd_db::Error::InvalidData(format!("hashing secret: {e}")))?
        .to_string();

    db.create_device_secret(&DeviceSecret {
        id: 0,
        device_id: device.id,
        key_id: key_id.clone(),
        secret_hash,
        created_at: Utc::now(),
        revoked_at: None,
    })
    .await?;

    provider.put(&device.uuid, &key_id, raw.to_vec());

    Ok(IssuedSecret {
        key_id,
        secret_hex: hex::encode(raw),
    })
}

/// verify a candidate secret against a stored argon2id hash.
pub fn verify_device_secret(secret_hash: &str, candidate: &[u8]) -> bool {
    let Ok(parsed) = PasswordHash::new(secret_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(candidate, &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_matches_on_device_and_key_id() {
        let provider = MemKeyProvider::default();
        provider.put("uuid-1", "abc", vec![1, 2, 3]);

        assert_eq!(provider.lookup("uuid-1", "abc"), Some(vec![1, 2, 3]));
        assert_eq!(provider.lookup("uuid-1", "other"), None);
        assert_eq!(provider.lookup("uuid-2", "abc"), None);

        provider.remove("uuid-1");
        assert_eq!(provider.lookup("uuid-1", "abc"), None);
    }

    #[tokio::test]
    async fn issued_secret_round_trips() {
        let db = WispdDb::new_in_memory().await.unwrap();
        let provider = MemKeyProvider::default();
        let key = wispd_types::DeviceKey::generate();
        let (device, _) = db.register_device(&key, "n", "", "").await.unwrap();

        let issued = issue_device_secret(&db, &provider, &device).await.unwrap();
        assert_eq!(issued.key_id.len(), KEY_ID_BYTES * 2);
        assert_eq!(issued.secret_hex.len(), 64);

        // the provider knows the raw secret
        let raw = provider.lookup(&device.uuid, &issued.key_id).unwrap();
        assert_eq!(hex::encode(&raw), issued.secret_hex);

        // the stored hash verifies the raw secret and rejects others
        let stored = db
            .get_active_secret(device.id, &issued.key_id)
            .await
            .unwrap()
            .unwrap();
        assert!(verify_device_secret(&stored.secret_hash, &raw));
        assert!(!verify_device_secret(&stored.secret_hash, b"wrong"));
    }
}
