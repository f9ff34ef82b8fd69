//! create wireguard peers table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_devices::Devices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WireguardPeers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WireguardPeers::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::DeviceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::PrivateKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::PublicKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::PresharedKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::AddressCidr)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::ServerPublicKey)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::Endpoint)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::AllowedIps)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(WireguardPeers::Keepalive)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wireguard_peers_device")
                            .from(WireguardPeers::Table, WireguardPeers::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // at most one peer per device
        manager
            .create_index(
                Index::create()
                    .name("idx_wireguard_peers_device_id")
                    .table(WireguardPeers::Table)
                    .col(WireguardPeers::DeviceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WireguardPeers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WireguardPeers {
    Table,
    Id,
    DeviceId,
    PrivateKey,
    PublicKey,
    PresharedKey,
    AddressCidr,
    ServerPublicKey,
    Endpoint,
    AllowedIps,
    Keepalive,
}
