//! create device secrets table migration

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
                    .table(DeviceSecrets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceSecrets::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeviceSecrets::DeviceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeviceSecrets::KeyId).string().not_null())
                    .col(
                        ColumnDef::new(DeviceSecrets::SecretHash)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceSecrets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeviceSecrets::RevokedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_device_secrets_device")
                            .from(DeviceSecrets::Table, DeviceSecrets::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // one key id per device
        manager
            .create_index(
                Index::create()
                    .name("idx_device_secrets_device_key_id")
                    .table(DeviceSecrets::Table)
                    .col(DeviceSecrets::DeviceId)
                    .col(DeviceSecrets::KeyId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeviceSecrets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeviceSecrets {
    Table,
    Id,
    DeviceId,
    KeyId,
    SecretHash,
    CreatedAt,
    RevokedAt,
}
