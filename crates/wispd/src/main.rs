//! wispd - OpenWISP-compatible configuration controller in Rust.
//!
//! devices run an agent that polls the controller; wispd merges NetJSON
//! templates, overlays VPN/PKI material, renders OpenWrt UCI files and
//! serves the result as a content-addressed archive.

use clap::Parser;
use color_eyre::eyre::Result;
use wispd::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Devices(cmd) => cmd.run().await,
        Command::Templates(cmd) => cmd.run().await,
    }
}
