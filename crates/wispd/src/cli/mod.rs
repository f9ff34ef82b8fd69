//! cli subcommands for wispd.
//!
//! - `wispd serve` - run the controller
//! - `wispd devices list` - inspect the device registry
//! - `wispd templates list|add` - manage configuration templates

mod devices;
mod serve;
mod templates;

pub use devices::DevicesCommand;
pub use serve::ServeCommand;
pub use templates::TemplatesCommand;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use wispd_db::WispdDb;
use wispd_types::DatabaseConfig;

/// wispd - openwisp-compatible configuration controller
#[derive(Parser, Debug)]
#[command(name = "wispd")]
#[command(about = "OpenWISP-compatible configuration controller for OpenWrt fleets", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the controller
    Serve(ServeCommand),

    /// manage devices
    #[command(subcommand)]
    Devices(DevicesCommand),

    /// manage configuration templates
    #[command(subcommand)]
    Templates(TemplatesCommand),
}

/// database connection arguments shared by admin subcommands
#[derive(Args, Debug)]
pub struct DbArgs {
    /// database driver (sqlite, postgres; empty = in-memory)
    #[arg(long, default_value = "sqlite", env = "WISPD_DATABASE_DRIVER")]
    pub database_driver: String,

    /// database dsn or file path
    #[arg(
        long,
        default_value = "/var/lib/wispd/wispd.sqlite",
        env = "WISPD_DATABASE_DSN"
    )]
    pub database_dsn: String,
}

impl DbArgs {
    /// open the database this command operates on.
    pub async fn open(&self) -> Result<WispdDb> {
        let config = DatabaseConfig {
            driver: self.database_driver.clone(),
            dsn: self.database_dsn.clone(),
        };
        Ok(WispdDb::new(&config).await?)
    }
}
