//! device hmac secret entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use wispd_types::{DeviceId, DeviceSecret};

/// device secret database model. stores only the argon2id hash; the raw
/// secret is handed out once at issuance.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "device_secrets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub device_id: i64,

    /// short identifier carried in the authorization header
    pub key_id: String,

    #[sea_orm(column_type = "Text")]
    pub secret_hash: String,

    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DeviceSecret {
    fn from(model: Model) -> Self {
        DeviceSecret {
            id: model.id as u64,
            device_id: DeviceId::from(model.device_id),
            key_id: model.key_id,
            secret_hash: model.secret_hash,
            created_at: model.created_at,
            revoked_at: model.revoked_at,
        }
    }
}

impl From<&DeviceSecret> for ActiveModel {
    fn from(secret: &DeviceSecret) -> Self {
        ActiveModel {
            id: if secret.id == 0 { NotSet } else { Set(secret.id as i64) },
            device_id: Set(secret.device_id.as_i64()),
            key_id: Set(secret.key_id.clone()),
            secret_hash: Set(secret.secret_hash.clone()),
            created_at: Set(secret.created_at),
            revoked_at: Set(secret.revoked_at),
        }
    }
}
