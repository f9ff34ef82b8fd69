//! wireguard peer entity for database storage.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use wispd_types::{DeviceId, WireGuardPeer};

/// wireguard peer database model. one row per device, enforced by a unique
/// index on `device_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wireguard_peers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub device_id: i64,

    pub private_key: String,
    pub public_key: String,
    pub preshared_key: String,

    /// "a.b.c.d/32"
    pub address_cidr: String,

    pub server_public_key: String,

    /// "host:port"
    pub endpoint: String,

    /// comma-separated
    pub allowed_ips: String,

    pub keepalive: i32,
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

impl From<Model> for WireGuardPeer {
    fn from(model: Model) -> Self {
        WireGuardPeer {
            id: model.id as u64,
            device_id: DeviceId::from(model.device_id),
            private_key: model.private_key,
            public_key: model.public_key,
            preshared_key: model.preshared_key,
            address_cidr: model.address_cidr,
            server_public_key: model.server_public_key,
            endpoint: model.endpoint,
            allowed_ips: model.allowed_ips,
            keepalive: model.keepalive as u16,
        }
    }
}

impl From<&WireGuardPeer> for ActiveModel {
    fn from(peer: &WireGuardPeer) -> Self {
        ActiveModel {
            id: if peer.id == 0 { NotSet } else { Set(peer.id as i64) },
            device_id: Set(peer.device_id.as_i64()),
            private_key: Set(peer.private_key.clone()),
            public_key: Set(peer.public_key.clone()),
            preshared_key: Set(peer.preshared_key.clone()),
            address_cidr: Set(peer.address_cidr.clone()),
            server_public_key: Set(peer.server_public_key.clone()),
            endpoint: Set(peer.endpoint.clone()),
            allowed_ips: Set(peer.allowed_ips.clone()),
            keepalive: Set(i32::from(peer.keepalive)),
        }
    }
}
