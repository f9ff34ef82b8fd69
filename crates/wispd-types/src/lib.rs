//! core types for wispd - an OpenWISP-compatible controller for OpenWrt fleets.
//!
//! this crate provides the fundamental data structures used throughout wispd:
//! - [`device`]: a managed router and its stored configuration archive
//! - [`template`]: prioritised NetJSON configuration templates
//! - [`wireguard`]: per-device WireGuard peer material
//! - [`pki`]: root CA and issued device certificates
//! - [`secret`]: per-device HMAC secrets for the JSON protocol
//! - [`config`]: application configuration

#![warn(missing_docs)]

mod config;
mod device;
mod device_key;
mod pki;
mod secret;
mod template;
mod wireguard;

pub use config::{
    Config, DatabaseConfig, LogFormat, LoggingConfig, MgmtVpnConfig, MgmtVpnMode, OpenVpnConfig,
    PkiConfig, ServerConfig, WireGuardConfig, ZeroTierConfig,
};
pub use device::{Device, DeviceId, DeviceStatus};
pub use device_key::{DeviceKey, DeviceKeyError};
pub use pki::{Ca, Certificate};
pub use secret::DeviceSecret;
pub use template::ConfigTemplate;
pub use wireguard::WireGuardPeer;
