//! create certificate authorities table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CertificateAuthorities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CertificateAuthorities::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::Name)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::CertPem)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::KeyPem)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::NotBefore)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::NotAfter)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CertificateAuthorities::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // concurrent first-reconciles converge on one ca row
        manager
            .create_index(
                Index::create()
                    .name("idx_certificate_authorities_name")
                    .table(CertificateAuthorities::Table)
                    .col(CertificateAuthorities::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CertificateAuthorities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CertificateAuthorities {
    Table,
    Id,
    Name,
    CertPem,
    KeyPem,
    NotBefore,
    NotAfter,
    CreatedAt,
}
