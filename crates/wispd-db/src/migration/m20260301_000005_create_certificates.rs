//! create certificates table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_devices::Devices;
use super::m20260301_000004_create_certificate_authorities::CertificateAuthorities;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Certificates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Certificates::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Certificates::CaId).big_integer().not_null())
                    .col(ColumnDef::new(Certificates::DeviceId).big_integer())
                    .col(ColumnDef::new(Certificates::Cn).string().not_null())
                    .col(ColumnDef::new(Certificates::CertPem).text().not_null())
                    .col(ColumnDef::new(Certificates::KeyPem).text().not_null())
                    .col(
                        ColumnDef::new(Certificates::NotBefore)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Certificates::NotAfter)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Certificates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_certificates_ca")
                            .from(Certificates::Table, Certificates::CaId)
                            .to(CertificateAuthorities::Table, CertificateAuthorities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_certificates_device")
                            .from(Certificates::Table, Certificates::DeviceId)
                            .to(Devices::Table, Devices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // lookups by device for audit
        manager
            .create_index(
                Index::create()
                    .name("idx_certificates_device_id")
                    .table(Certificates::Table)
                    .col(Certificates::DeviceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Certificates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Certificates {
    Table,
    Id,
    CaId,
    DeviceId,
    Cn,
    CertPem,
    KeyPem,
    NotBefore,
    NotAfter,
    CreatedAt,
}
