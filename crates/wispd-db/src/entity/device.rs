//! device entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use tracing::warn;

use wispd_types::{Device, DeviceId, DeviceKey, DeviceStatus};

use crate::Error;

/// device database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// agent-facing uuid
    #[sea_orm(unique)]
    pub uuid: String,

    /// stable device secret; column named to avoid the reserved word KEY
    #[sea_orm(unique)]
    pub device_key: String,

    pub name: String,
    pub model: String,

    /// normalised lowercase mac
    pub mac: String,

    /// devicestatus as string
    pub status: String,

    pub last_seen_at: Option<DateTime<Utc>>,

    /// latest gzipped tar archive
    #[sea_orm(column_type = "VarBinary(StringLen::None)", nullable)]
    pub config_archive: Option<Vec<u8>>,

    /// hex sha-256 of the archive
    pub config_checksum: String,

    pub config_version: i32,

    /// json-serialized rendered netjson
    #[sea_orm(column_type = "Text", nullable)]
    pub rendered_config: Option<String>,

    pub config_updated_at: Option<DateTime<Utc>>,

    pub last_applied_sum: String,
    pub last_reported_status: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wireguard_peer::Entity")]
    WireguardPeer,
    #[sea_orm(has_many = "super::device_secret::Entity")]
    DeviceSecret,
}

impl Related<super::wireguard_peer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WireguardPeer.def()
    }
}

impl Related<super::device_secret::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceSecret.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Device {
    type Error = Error;

    fn try_from(model: Model) -> Result<Self, Error> {
        let key = DeviceKey::parse(&model.device_key).map_err(|e| {
            Error::InvalidData(format!("device {} has a malformed key: {e}", model.id))
        })?;

        let status = match model.status.parse::<DeviceStatus>() {
            Ok(status) => status,
            Err(()) => {
                warn!(device_id = model.id, status = %model.status, "unknown stored device status");
                DeviceStatus::Unknown
            }
        };

        let rendered_config = model.rendered_config.as_ref().and_then(|raw| {
            match serde_json::from_str(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(device_id = model.id, error = %e, "failed to parse rendered_config JSON");
                    None
                }
            }
        });

        Ok(Device {
            id: DeviceId::from(model.id),
            uuid: model.uuid,
            key,
            name: model.name,
            model: model.model,
            mac: model.mac,
            status,
            last_seen_at: model.last_seen_at,
            config_archive: model.config_archive.unwrap_or_default(),
            config_checksum: model.config_checksum,
            config_version: model.config_version,
            rendered_config,
            config_updated_at: model.config_updated_at,
            last_applied_sum: model.last_applied_sum,
            last_reported_status: model.last_reported_status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

