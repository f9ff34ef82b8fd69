//! create config templates table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ConfigTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConfigTemplates::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConfigTemplates::OrgId).big_integer())
                    .col(ColumnDef::new(ConfigTemplates::Name).string().not_null())
                    .col(
                        ColumnDef::new(ConfigTemplates::Priority)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(ConfigTemplates::Netjson)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(ColumnDef::new(ConfigTemplates::VarsSchema).text())
                    .col(
                        ColumnDef::new(ConfigTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // template names are unique within an organisation scope
        manager
            .create_index(
                Index::create()
                    .name("idx_config_templates_org_name")
                    .table(ConfigTemplates::Table)
                    .col(ConfigTemplates::OrgId)
                    .col(ConfigTemplates::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ConfigTemplates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ConfigTemplates {
    Table,
    Id,
    OrgId,
    Name,
    Priority,
    Netjson,
    VarsSchema,
    CreatedAt,
    UpdatedAt,
}
