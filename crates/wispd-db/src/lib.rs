//! database layer for wispd.
//!
//! this crate provides persistent storage for:
//! - Devices (registry + latest configuration archive)
//! - ConfigTemplates
//! - WireGuardPeers
//! - Certificate authorities and issued certificates
//! - DeviceSecrets (hmac key material, hashed)
//!
//! creation paths that race (registration by key, one peer per device,
//! one ca per name) resolve conflicts by reading the winning row back, so
//! callers always converge on a single record.

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database as SeaOrmDatabase, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use sea_orm_migration::MigratorTrait;
use sha2::{Digest, Sha256};

use wispd_types::{
    Ca, Certificate, ConfigTemplate, DatabaseConfig, Device, DeviceId, DeviceKey, DeviceSecret,
    DeviceStatus, WireGuardPeer,
};

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// database trait for wispd storage operations.
///
/// this trait abstracts over database backends (sqlite, postgresql,
/// in-memory sqlite for the no-dsn fallback). devices use soft-delete
/// semantics; everything else is immutable or hard-deleted.
pub trait Database: Send + Sync {
    // ─── Health Check ─────────────────────────────────────────────────────────

    /// ping the database to verify connectivity.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // ─── Device Registry ─────────────────────────────────────────────────────

    /// register a device under a stable key.
    ///
    /// if a device with this key exists, its mutable metadata (name, model,
    /// mac) is refreshed and `(device, false)` returned. otherwise a new row
    /// with a fresh uuid is inserted; a unique-constraint race on the key is
    /// resolved by reading the winning row back. returns `(device, is_new)`.
    fn register_device(
        &self,
        key: &DeviceKey,
        name: &str,
        model: &str,
        mac: &str,
    ) -> impl Future<Output = Result<(Device, bool)>> + Send;

    /// get a device by uuid. returns `None` if not found or soft-deleted.
    fn get_device(&self, uuid: &str) -> impl Future<Output = Result<Option<Device>>> + Send;

    /// get a device by its stable key.
    fn get_device_by_key(
        &self,
        key: &DeviceKey,
    ) -> impl Future<Output = Result<Option<Device>>> + Send;

    /// list all non-deleted devices.
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>>> + Send;

    /// adopt a device by uuid for the json protocol: upsert metadata and
    /// mark it online.
    fn adopt_device(
        &self,
        uuid: &str,
        name: &str,
        model: &str,
        mac: &str,
    ) -> impl Future<Output = Result<Device>> + Send;

    /// store a new configuration archive for a device.
    ///
    /// the checksum is recomputed from the stored bytes so that
    /// `config_checksum == sha256(config_archive)` holds unconditionally;
    /// `rendered_config` keeps the netjson the archive was built from.
    fn put_config_archive(
        &self,
        uuid: &str,
        archive: &[u8],
        netjson: &serde_json::Value,
        version: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// record an agent status report: liveness, raw report string and the
    /// mapped status.
    fn report_status(
        &self,
        uuid: &str,
        status: DeviceStatus,
        raw_report: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// record that the agent applied a configuration with this checksum.
    fn mark_applied(
        &self,
        uuid: &str,
        checksum: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// soft-delete a device.
    fn delete_device(&self, id: DeviceId) -> impl Future<Output = Result<()>> + Send;

    // ─── Config Templates ────────────────────────────────────────────────────

    /// create a template. returns the created row with its assigned id.
    fn create_template(
        &self,
        template: &ConfigTemplate,
    ) -> impl Future<Output = Result<ConfigTemplate>> + Send;

    /// list all templates ordered by ascending priority, then id.
    fn list_templates(&self) -> impl Future<Output = Result<Vec<ConfigTemplate>>> + Send;

    /// templates applicable to a device, lowest priority first.
    ///
    /// currently all templates apply to all devices; org/site scoping hangs
    /// off `org_id` later.
    fn templates_for_device(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Vec<ConfigTemplate>>> + Send;

    // ─── WireGuard Peers ─────────────────────────────────────────────────────

    /// get the peer for a device, if one exists.
    fn get_wireguard_peer(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<Option<WireGuardPeer>>> + Send;

    /// insert a peer for a device.
    ///
    /// the unique index on `device_id` makes this first-writer-wins: on
    /// conflict the existing row is read back and returned, so a device
    /// never ends up with two peers.
    fn create_wireguard_peer(
        &self,
        peer: &WireGuardPeer,
    ) -> impl Future<Output = Result<WireGuardPeer>> + Send;

    // ─── PKI ─────────────────────────────────────────────────────────────────

    /// get a certificate authority by name.
    fn get_ca(&self, name: &str) -> impl Future<Output = Result<Option<Ca>>> + Send;

    /// insert a certificate authority; on a name conflict the existing row
    /// wins and is returned.
    fn create_ca(&self, ca: &Ca) -> impl Future<Output = Result<Ca>> + Send;

    /// store an issued certificate.
    fn create_certificate(
        &self,
        cert: &Certificate,
    ) -> impl Future<Output = Result<Certificate>> + Send;

    /// latest still-valid certificate issued by a ca for a device.
    ///
    /// the reconciler reuses this so repeated reconciles without state
    /// changes produce byte-identical archives.
    fn get_device_certificate(
        &self,
        device_id: DeviceId,
        ca_id: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> impl Future<Output = Result<Option<Certificate>>> + Send;

    // ─── Device Secrets ──────────────────────────────────────────────────────

    /// store a new device secret (hash only).
    fn create_device_secret(
        &self,
        secret: &DeviceSecret,
    ) -> impl Future<Output = Result<DeviceSecret>> + Send;

    /// get an unrevoked secret by `(device, key id)`.
    fn get_active_secret(
        &self,
        device_id: DeviceId,
        key_id: &str,
    ) -> impl Future<Output = Result<Option<DeviceSecret>>> + Send;

    /// revoke every secret of a device.
    fn revoke_device_secrets(
        &self,
        device_id: DeviceId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// the main database implementation using sea-orm.
#[derive(Clone)]
pub struct WispdDb {
    conn: DatabaseConnection,
}

impl WispdDb {
    /// create a database connection from config and run migrations.
    ///
    /// an empty driver falls back to in-memory sqlite.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.driver.trim().is_empty() {
            return Self::new_in_memory().await;
        }
        let url = Self::build_connection_url(config)?;
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &DatabaseConfig) -> Result<String> {
        match config.driver.as_str() {
            "sqlite" => {
                let path = if config.dsn.starts_with("sqlite:") {
                    config.dsn.clone()
                } else {
                    format!("sqlite:{}", config.dsn)
                };
                // ?mode=rwc creates the file if it doesn't exist
                if path.contains('?') {
                    Ok(path)
                } else {
                    Ok(format!("{path}?mode=rwc"))
                }
            }
            "postgres" | "postgresql" => Ok(config.dsn.clone()),
            other => Err(Error::InvalidData(format!(
                "unsupported database driver: {other}"
            ))),
        }
    }

    /// create an in-memory sqlite database (tests and the no-dsn fallback).
    pub async fn new_in_memory() -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }

    async fn find_device_model(&self, uuid: &str) -> Result<Option<entity::device::Model>> {
        Ok(entity::device::Entity::find()
            .filter(entity::device::Column::Uuid.eq(uuid))
            .filter(entity::device::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await?)
    }
}

impl Database for WispdDb {
    // health check

    async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // device registry

    async fn register_device(
        &self,
        key: &DeviceKey,
        name: &str,
        model: &str,
        mac: &str,
    ) -> Result<(Device, bool)> {
        let now = Utc::now();
        let mac = mac.trim().to_lowercase();

        // fast path: the device already exists under this key
        if let Some(existing) = entity::device::Entity::find()
            .filter(entity::device::Column::DeviceKey.eq(key.as_str()))
            .filter(entity::device::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await?
        {
            let mut active = existing.clone().into_active_model();
            let mut dirty = false;
            let name = name.trim();
            let model = model.trim();
            if !name.is_empty() && existing.name != name {
                active.name = Set(name.to_string());
                dirty = true;
            }
            if !model.is_empty() && existing.model != model {
                active.model = Set(model.to_string());
                dirty = true;
            }
            if !mac.is_empty() && existing.mac != mac {
                active.mac = Set(mac.clone());
                dirty = true;
            }
            let refreshed = if dirty {
                active.updated_at = Set(now);
                active.update(&self.conn).await?
            } else {
                existing
            };
            return Ok((Device::try_from(refreshed)?, false));
        }

        // insert a new row; on a key race, read the winner back
        let active = entity::device::ActiveModel {
            uuid: Set(uuid::Uuid::new_v4().to_string()),
            device_key: Set(key.as_str().to_string()),
            name: Set(name.trim().to_string()),
            model: Set(model.trim().to_string()),
            mac: Set(mac),
            status: Set(DeviceStatus::Unknown.as_str().to_string()),
            config_checksum: Set(String::new()),
            config_version: Set(0),
            last_applied_sum: Set(String::new()),
            last_reported_status: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(inserted) => Ok((Device::try_from(inserted)?, true)),
            Err(insert_err) => {
                let existing = entity::device::Entity::find()
                    .filter(entity::device::Column::DeviceKey.eq(key.as_str()))
                    .filter(entity::device::Column::DeletedAt.is_null())
                    .one(&self.conn)
                    .await?;
                match existing {
                    Some(model) => Ok((Device::try_from(model)?, false)),
                    None => Err(insert_err.into()),
                }
            }
        }
    }

    async fn get_device(&self, uuid: &str) -> Result<Option<Device>> {
        self.find_device_model(uuid)
            .await?
            .map(Device::try_from)
            .transpose()
    }

    async fn get_device_by_key(&self, key: &DeviceKey) -> Result<Option<Device>> {
        entity::device::Entity::find()
            .filter(entity::device::Column::DeviceKey.eq(key.as_str()))
            .filter(entity::device::Column::DeletedAt.is_null())
            .one(&self.conn)
            .await?
            .map(Device::try_from)
            .transpose()
    }

    async fn list_devices(&self) -> Result<Vec<Device>> {
        entity::device::Entity::find()
            .filter(entity::device::Column::DeletedAt.is_null())
            .order_by_asc(entity::device::Column::Id)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(Device::try_from)
            .collect()
    }

    async fn adopt_device(
        &self,
        uuid: &str,
        name: &str,
        model: &str,
        mac: &str,
    ) -> Result<Device> {
        let now = Utc::now();
        let mac = mac.trim().to_lowercase();

        if let Some(existing) = self.find_device_model(uuid).await? {
            let mut active = existing.clone().into_active_model();
            if !name.trim().is_empty() {
                active.name = Set(name.trim().to_string());
            }
            if !model.trim().is_empty() {
                active.model = Set(model.trim().to_string());
            }
            if !mac.is_empty() {
                active.mac = Set(mac);
            }
            active.status = Set(DeviceStatus::Online.as_str().to_string());
            active.last_seen_at = Set(Some(now));
            active.updated_at = Set(now);
            return Device::try_from(active.update(&self.conn).await?);
        }

        let active = entity::device::ActiveModel {
            uuid: Set(uuid.to_string()),
            device_key: Set(DeviceKey::generate().as_str().to_string()),
            name: Set(name.trim().to_string()),
            model: Set(model.trim().to_string()),
            mac: Set(mac),
            status: Set(DeviceStatus::Online.as_str().to_string()),
            last_seen_at: Set(Some(now)),
            config_checksum: Set(String::new()),
            config_version: Set(0),
            last_applied_sum: Set(String::new()),
            last_reported_status: Set(String::new()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        Device::try_from(active.insert(&self.conn).await?)
    }

    async fn put_config_archive(
        &self,
        uuid: &str,
        archive: &[u8],
        netjson: &serde_json::Value,
        version: i32,
    ) -> Result<()> {
        let model = self
            .find_device_model(uuid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {uuid}")))?;

        let checksum = hex::encode(Sha256::digest(archive));
        let now = Utc::now();

        let mut active = model.into_active_model();
        active.config_archive = Set(Some(archive.to_vec()));
        active.config_checksum = Set(checksum);
        active.config_version = Set(version.max(1));
        active.rendered_config = Set(serde_json::to_string(netjson).ok());
        active.config_updated_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;
        Ok(())
    }

    async fn report_status(
        &self,
        uuid: &str,
        status: DeviceStatus,
        raw_report: &str,
    ) -> Result<()> {
        let model = self
            .find_device_model(uuid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {uuid}")))?;

        let now = Utc::now();
        let mut active = model.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.last_seen_at = Set(Some(now));
        active.last_reported_status = Set(raw_report.to_string());
        active.updated_at = Set(now);
        active.update(&self.conn).await?;
        Ok(())
    }

    async fn mark_applied(&self, uuid: &str, checksum: &str) -> Result<()> {
        let model = self
            .find_device_model(uuid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("device {uuid}")))?;

        let now = Utc::now();
        let mut active = model.into_active_model();
        active.last_applied_sum = Set(checksum.to_string());
        active.status = Set(DeviceStatus::Online.as_str().to_string());
        active.last_seen_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.conn).await?;
        Ok(())
    }

    async fn delete_device(&self, id: DeviceId) -> Result<()> {
        entity::device::Entity::update_many()
            .col_expr(
                entity::device::Column::DeletedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(entity::device::Column::Id.eq(id.as_i64()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // config templates

    async fn create_template(&self, template: &ConfigTemplate) -> Result<ConfigTemplate> {
        let model: entity::config_template::ActiveModel = template.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn list_templates(&self) -> Result<Vec<ConfigTemplate>> {
        let results = entity::config_template::Entity::find()
            .order_by_asc(entity::config_template::Column::Priority)
            .order_by_asc(entity::config_template::Column::Id)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn templates_for_device(&self, _device_id: DeviceId) -> Result<Vec<ConfigTemplate>> {
        self.list_templates().await
    }

    // wireguard peers

    async fn get_wireguard_peer(&self, device_id: DeviceId) -> Result<Option<WireGuardPeer>> {
        let result = entity::wireguard_peer::Entity::find()
            .filter(entity::wireguard_peer::Column::DeviceId.eq(device_id.as_i64()))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn create_wireguard_peer(&self, peer: &WireGuardPeer) -> Result<WireGuardPeer> {
        let model: entity::wireguard_peer::ActiveModel = peer.into();
        match model.insert(&self.conn).await {
            Ok(inserted) => Ok(inserted.into()),
            Err(insert_err) => {
                // unique device_id: a concurrent reconcile won, use its row
                match self.get_wireguard_peer(peer.device_id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(insert_err.into()),
                }
            }
        }
    }

    // pki

    async fn get_ca(&self, name: &str) -> Result<Option<Ca>> {
        let result = entity::ca::Entity::find()
            .filter(entity::ca::Column::Name.eq(name))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn create_ca(&self, ca: &Ca) -> Result<Ca> {
        let model: entity::ca::ActiveModel = ca.into();
        match model.insert(&self.conn).await {
            Ok(inserted) => Ok(inserted.into()),
            Err(insert_err) => match self.get_ca(&ca.name).await? {
                Some(existing) => Ok(existing),
                None => Err(insert_err.into()),
            },
        }
    }

    async fn create_certificate(&self, cert: &Certificate) -> Result<Certificate> {
        let model: entity::certificate::ActiveModel = cert.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_device_certificate(
        &self,
        device_id: DeviceId,
        ca_id: u64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<Certificate>> {
        let result = entity::certificate::Entity::find()
            .filter(entity::certificate::Column::DeviceId.eq(device_id.as_i64()))
            .filter(entity::certificate::Column::CaId.eq(ca_id as i64))
            .filter(entity::certificate::Column::NotAfter.gt(now))
            .order_by_desc(entity::certificate::Column::Id)
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    // device secrets

    async fn create_device_secret(&self, secret: &DeviceSecret) -> Result<DeviceSecret> {
        let model: entity::device_secret::ActiveModel = secret.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_active_secret(
        &self,
        device_id: DeviceId,
        key_id: &str,
    ) -> Result<Option<DeviceSecret>> {
        let result = entity::device_secret::Entity::find()
            .filter(entity::device_secret::Column::DeviceId.eq(device_id.as_i64()))
            .filter(entity::device_secret::Column::KeyId.eq(key_id))
            .filter(entity::device_secret::Column::RevokedAt.is_null())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn revoke_device_secrets(&self, device_id: DeviceId) -> Result<()> {
        entity::device_secret::Entity::update_many()
            .col_expr(
                entity::device_secret::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(entity::device_secret::Column::DeviceId.eq(device_id.as_i64()))
            .filter(entity::device_secret::Column::RevokedAt.is_null())
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}
