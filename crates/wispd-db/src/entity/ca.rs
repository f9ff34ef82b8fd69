//! certificate authority entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use wispd_types::Ca;

/// ca database model.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "certificate_authorities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub name: String,

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
    #[sea_orm(has_many = "super::certificate::Entity")]
    Certificate,
}

impl Related<super::certificate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Certificate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Ca {
    fn from(model: Model) -> Self {
        Ca {
            id: model.id as u64,
            name: model.name,
            cert_pem: model.cert_pem,
            key_pem: model.key_pem,
            not_before: model.not_before,
            not_after: model.not_after,
            created_at: model.created_at,
        }
    }
}

impl From<&Ca> for ActiveModel {
    fn from(ca: &Ca) -> Self {
        ActiveModel {
            id: if ca.id == 0 { NotSet } else { Set(ca.id as i64) },
            name: Set(ca.name.clone()),
            cert_pem: Set(ca.cert_pem.clone()),
            key_pem: Set(ca.key_pem.clone()),
            not_before: Set(ca.not_before),
            not_after: Set(ca.not_after),
            created_at: Set(ca.created_at),
        }
    }
}
