//! configuration types for wispd.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

/// placeholder secret shipped in sample configs; refused at startup.
pub const PLACEHOLDER_SECRET: &str = "CHANGE_ME";

/// main configuration for wispd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// http server settings.
    pub server: ServerConfig,

    /// shared secret agents present at registration.
    pub shared_secret: String,

    /// derive device keys from mac + shared secret instead of random.
    pub consistent_key: bool,

    /// management vpn overlay settings.
    pub mgmt_vpn: MgmtVpnConfig,

    /// pki settings for the openvpn overlay.
    pub pki: PkiConfig,

    /// logging settings.
    pub logging: LoggingConfig,

    /// database settings.
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            shared_secret: String::new(),
            consistent_key: true,
            mgmt_vpn: MgmtVpnConfig::default(),
            pki: PkiConfig::default(),
            logging: LoggingConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// validate startup-critical settings.
    ///
    /// the shared secret must be set and must not be the sample placeholder.
    pub fn validate(&self) -> Result<(), String> {
        let secret = self.shared_secret.trim();
        if secret.is_empty() {
            return Err("shared_secret must not be empty".to_string());
        }
        if secret == PLACEHOLDER_SECRET {
            return Err(format!(
                "shared_secret is still the placeholder {PLACEHOLDER_SECRET:?}"
            ));
        }
        Ok(())
    }
}

/// http server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// address to bind the http server to.
    pub listen_addr: String,

    /// read/write timeout for a single request, in seconds.
    pub request_timeout_secs: u64,

    /// grace period for draining in-flight requests on shutdown, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 15,
            shutdown_grace_secs: 5,
        }
    }
}

/// which management vpn overlay the reconciler applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MgmtVpnMode {
    /// no overlay.
    #[default]
    None,
    /// wireguard interface + per-device peer.
    Wireguard,
    /// openvpn client with issued certificates.
    Openvpn,
    /// zerotier network join.
    Zerotier,
}

impl MgmtVpnMode {
    /// parse a mode string case-insensitively; unrecognised values map to none.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "wireguard" => Self::Wireguard,
            "openvpn" => Self::Openvpn,
            "zerotier" => Self::Zerotier,
            _ => Self::None,
        }
    }
}

/// management vpn configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MgmtVpnConfig {
    /// overlay mode.
    pub mode: MgmtVpnMode,

    /// wireguard overlay settings.
    pub wireguard: WireGuardConfig,

    /// openvpn overlay settings.
    pub openvpn: OpenVpnConfig,

    /// zerotier overlay settings.
    pub zerotier: ZeroTierConfig,
}

/// wireguard overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WireGuardConfig {
    /// server endpoint, "host:port".
    pub endpoint: String,

    /// server public key (base64).
    pub server_public_key: String,

    /// ipv4 /24 pool devices are addressed from.
    pub address_pool: Ipv4Net,

    /// allowed ips pushed to the device.
    pub allowed_ips: Vec<String>,

    /// persistent keepalive in seconds (0 disables).
    pub keepalive: u16,
}

impl Default for WireGuardConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            server_public_key: String::new(),
            address_pool: "10.10.0.0/24".parse().expect("valid default pool"),
            allowed_ips: vec!["10.10.0.0/24".to_string()],
            keepalive: 25,
        }
    }
}

/// openvpn overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenVpnConfig {
    /// remote server hostname.
    pub remote: String,

    /// remote server port.
    pub port: u16,

    /// transport protocol.
    pub proto: String,

    /// data channel cipher.
    pub cipher: String,

    /// hmac digest.
    pub auth: String,
}

impl Default for OpenVpnConfig {
    fn default() -> Self {
        Self {
            remote: String::new(),
            port: 1194,
            proto: "udp".to_string(),
            cipher: "AES-256-GCM".to_string(),
            auth: "SHA256".to_string(),
        }
    }
}

/// zerotier overlay configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroTierConfig {
    /// network id devices join.
    pub network_id: String,
}

/// pki configuration for the openvpn overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PkiConfig {
    /// common name of the root ca.
    pub ca_name: String,

    /// certificate ttl in hours (applies to the ca and device certs).
    pub cert_ttl_hours: u32,
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            ca_name: "OpenWISP-Go-CA".to_string(),
            cert_ttl_hours: 8760,
        }
    }
}

/// log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// human-readable single-line output.
    #[default]
    Text,
    /// newline-delimited json.
    Json,
}

/// logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// minimum level: trace|debug|info|warn|error.
    pub level: String,

    /// output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// driver: "sqlite", "postgres" or "" for the in-memory fallback.
    pub driver: String,

    /// connection string / file path for the chosen driver.
    pub dsn: String,
}
