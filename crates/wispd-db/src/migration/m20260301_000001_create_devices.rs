//! create devices table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Devices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Devices::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Devices::Uuid).string().not_null())
                    .col(ColumnDef::new(Devices::DeviceKey).string().not_null())
                    .col(ColumnDef::new(Devices::Name).string().not_null().default(""))
                    .col(ColumnDef::new(Devices::Model).string().not_null().default(""))
                    .col(ColumnDef::new(Devices::Mac).string().not_null().default(""))
                    .col(
                        ColumnDef::new(Devices::Status)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Devices::LastSeenAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Devices::ConfigArchive).blob())
                    .col(
                        ColumnDef::new(Devices::ConfigChecksum)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Devices::ConfigVersion)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Devices::RenderedConfig).text())
                    .col(ColumnDef::new(Devices::ConfigUpdatedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Devices::LastAppliedSum)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Devices::LastReportedStatus)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Devices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Devices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Devices::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // uuid is the agent-facing identity
        manager
            .create_index(
                Index::create()
                    .name("idx_devices_uuid")
                    .table(Devices::Table)
                    .col(Devices::Uuid)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // device_key drives the idempotent registration upsert
        manager
            .create_index(
                Index::create()
                    .name("idx_devices_device_key")
                    .table(Devices::Table)
                    .col(Devices::DeviceKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // index for soft deletes
        manager
            .create_index(
                Index::create()
                    .name("idx_devices_deleted_at")
                    .table(Devices::Table)
                    .col(Devices::DeletedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Devices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Devices {
    Table,
    Id,
    Uuid,
    DeviceKey,
    Name,
    Model,
    Mac,
    Status,
    LastSeenAt,
    ConfigArchive,
    ConfigChecksum,
    ConfigVersion,
    RenderedConfig,
    ConfigUpdatedAt,
    LastAppliedSum,
    LastReportedStatus,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
