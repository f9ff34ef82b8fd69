//! the `devices` subcommand - inspect the device registry.

use clap::{Args, Subcommand};
use color_eyre::eyre::Result;

use wispd_db::Database;

use super::DbArgs;

/// manage devices
#[derive(Subcommand, Debug)]
pub enum DevicesCommand {
    /// list all devices
    List(ListDevicesArgs),
}

/// list devices
#[derive(Args, Debug)]
pub struct ListDevicesArgs {
    #[command(flatten)]
    db: DbArgs,

    /// output format (table, json)
    #[arg(short, long, default_value = "table")]
    output: String,
}

impl DevicesCommand {
    /// run the subcommand
    pub async fn run(self) -> Result<()> {
        match self {
            Self::List(args) => list_devices(args).await,
        }
    }
}

async fn list_devices(args: ListDevicesArgs) -> Result<()> {
    let db = args.db.open().await?;
    let devices = db.list_devices().await?;

    if args.output == "json" {
        let rows: Vec<serde_json::Value> = devices
            .iter()
            .map(|d| {
                serde_json::json!({
                    "uuid": d.uuid,
                    "name": d.name,
                    "model": d.model,
                    "mac": d.mac,
                    "status": d.status,
                    "config_version": d.config_version,
                    "config_checksum": d.config_checksum,
                    "last_seen_at": d.last_seen_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:<38} {:<20} {:<8} {:>7}  {}",
        "UUID", "NAME", "STATUS", "VERSION", "LAST SEEN"
    );
    for device in devices {
        let last_seen = device
            .last_seen_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<20} {:<8} {:>7}  {}",
            device.uuid,
            device.name,
            device.status.as_str(),
            device.config_version,
            last_seen
        );
    }
    Ok(())
}
