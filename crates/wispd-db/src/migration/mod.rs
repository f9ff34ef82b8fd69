//! database migrations for wispd.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_devices;
mod m20260301_000002_create_config_templates;
mod m20260301_000003_create_wireguard_peers;
mod m20260301_000004_create_certificate_authorities;
mod m20260301_000005_create_certificates;
mod m20260310_000006_create_device_secrets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_devices::Migration),
            Box::new(m20260301_000002_create_config_templates::Migration),
            Box::new(m20260301_000003_create_wireguard_peers::Migration),
            Box::new(m20260301_000004_create_certificate_authorities::Migration),
            Box::new(m20260301_000005_create_certificates::Migration),
            Box::new(m20260310_000006_create_device_secrets::Migration),
        ]
    }
}
