//! issued certificate entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use wispd_types::{Certificate, DeviceId};

/// certificate database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "certificates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub ca_id: i64,
    pub device_id: Option<i64>,

    /// subject common name
    pub cn: String,

    #[sea_orm(column_type = "Text")]
    pub cert_pem: String,

    #[sea_orm(column_type = "Text")]
    pub key_pem: String,

    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ca::Entity",
        from = "Column::CaId",
        to = "super::ca::Column::Id"
    )]
    Ca,
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::ca::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ca.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Certificate {
    fn from(model: Model) -> Self {
        Certificate {
            id: model.id as u64,
            ca_id: model.ca_id as u64,
            device_id: model.device_id.map(DeviceId::from),
            cn: model.cn,
            cert_pem: model.cert_pem,
            key_pem: model.key_pem,
            not_before: model.not_before,
            not_after: model.not_after,
            created_at: model.created_at,
        }
    }
}

impl From<&Certificate> for ActiveModel {
    fn from(cert: &Certificate) -> Self {
        ActiveModel {
            id: if cert.id == 0 { NotSet } else { Set(cert.id as i64) },
            ca_id: Set(cert.ca_id as i64),
            device_id: Set(cert.device_id.map(|id| id.as_i64())),
            cn: Set(cert.cn.clone()),
            cert_pem: Set(cert.cert_pem.clone()),
            key_pem: Set(cert.key_pem.clone()),
            not_before: Set(cert.not_before),
            not_after: Set(cert.not_after),
            created_at: Set(cert.created_at),
        }
    }
}
