//! the `serve` subcommand - runs the controller.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use wispd_db::WispdDb;
use wispd_types::{
    Config, DatabaseConfig, LogFormat, MgmtVpnMode,
};

/// run the wispd controller
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// address to listen on
    #[arg(long, default_value = "0.0.0.0:8080", env = "WISPD_LISTEN_ADDR")]
    listen_addr: String,

    /// shared secret agents present at registration
    #[arg(long, env = "WISPD_SHARED_SECRET")]
    shared_secret: String,

    /// derive device keys from mac + shared secret (consistent key)
    #[arg(long, default_value_t = true, env = "WISPD_CONSISTENT_KEY")]
    consistent_key: bool,

    /// database driver (sqlite, postgres; empty = in-memory)
    #[arg(long, default_value = "", env = "WISPD_DATABASE_DRIVER")]
    database_driver: String,

    /// database dsn or file path
    #[arg(long, default_value = "", env = "WISPD_DATABASE_DSN")]
    database_dsn: String,

    /// management vpn mode (wireguard|openvpn|zerotier|none)
    #[arg(long, default_value = "none", env = "WISPD_MGMT_VPN_MODE")]
    mgmt_vpn_mode: String,

    /// wireguard server endpoint, host:port
    #[arg(long, env = "WISPD_WG_ENDPOINT")]
    wg_endpoint: Option<String>,

    /// wireguard server public key (base64)
    #[arg(long, env = "WISPD_WG_SERVER_PUBLIC_KEY")]
    wg_server_public_key: Option<String>,

    /// ipv4 /24 pool for wireguard device addresses
    #[arg(long, env = "WISPD_WG_ADDRESS_POOL")]
    wg_address_pool: Option<String>,

    /// comma-separated allowed ips pushed to devices
    #[arg(long, env = "WISPD_WG_ALLOWED_IPS")]
    wg_allowed_ips: Option<String>,

    /// wireguard persistent keepalive seconds
    #[arg(long, env = "WISPD_WG_KEEPALIVE")]
    wg_keepalive: Option<u16>,

    /// openvpn remote host
    #[arg(long, env = "WISPD_OVPN_REMOTE")]
    ovpn_remote: Option<String>,

    /// openvpn remote port
    #[arg(long, env = "WISPD_OVPN_PORT")]
    ovpn_port: Option<u16>,

    /// zerotier network id
    #[arg(long, env = "WISPD_ZT_NETWORK_ID")]
    zt_network_id: Option<String>,

    /// root ca common name for the openvpn overlay
    #[arg(long, env = "WISPD_CA_NAME")]
    ca_name: Option<String>,

    /// certificate ttl in hours
    #[arg(long, env = "WISPD_CERT_TTL_HOURS")]
    cert_ttl_hours: Option<u32>,

    /// log level (trace|debug|info|warn|error)
    #[arg(long, default_value = "info", env = "WISPD_LOG_LEVEL")]
    log_level: String,

    /// log format (text|json)
    #[arg(long, default_value = "text", env = "WISPD_LOG_FORMAT")]
    log_format: String,
}

impl ServeCommand {
    /// convert cli arguments into a Config struct
    fn into_config(self) -> Result<Config> {
        let mut config = Config {
            shared_secret: self.shared_secret,
            consistent_key: self.consistent_key,
            database: DatabaseConfig {
                driver: self.database_driver,
                dsn: self.database_dsn,
            },
            ..Default::default()
        };
        config.server.listen_addr = self.listen_addr;
        config.logging.level = self.log_level;
        config.logging.format = match self.log_format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        config.mgmt_vpn.mode = MgmtVpnMode::parse(&self.mgmt_vpn_mode);
        if let Some(endpoint) = self.wg_endpoint {
            config.mgmt_vpn.wireguard.endpoint = endpoint;
        }
        if let Some(key) = self.wg_server_public_key {
            config.mgmt_vpn.wireguard.server_public_key = key;
        }
        if let Some(pool) = self.wg_address_pool {
            config.mgmt_vpn.wireguard.address_pool =
                pool.parse().context("invalid WireGuard address pool")?;
        }
        if let Some(allowed) = self.wg_allowed_ips {
            config.mgmt_vpn.wireguard.allowed_ips = allowed
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(keepalive) = self.wg_keepalive {
            config.mgmt_vpn.wireguard.keepalive = keepalive;
        }
        if let Some(remote) = self.ovpn_remote {
            config.mgmt_vpn.openvpn.remote = remote;
        }
        if let Some(port) = self.ovpn_port {
            config.mgmt_vpn.openvpn.port = port;
        }
        if let Some(network_id) = self.zt_network_id {
            config.mgmt_vpn.zerotier.network_id = network_id;
        }
        if let Some(name) = self.ca_name {
            config.pki.ca_name = name;
        }
        if let Some(ttl) = self.cert_ttl_hours {
            config.pki.cert_ttl_hours = ttl;
        }

        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        // initialize logging
        let log_level = match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        let json_logs = self.log_format.eq_ignore_ascii_case("json");
        let builder = FmtSubscriber::builder().with_max_level(log_level);
        if json_logs {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        } else {
            tracing::subscriber::set_global_default(builder.finish())?;
        }

        info!("starting wispd...");

        let config = self.into_config()?;
        if let Err(reason) = config.validate() {
            bail!("invalid configuration: {reason}");
        }
        if config.database.driver.trim().is_empty() {
            warn!("no database driver configured, using in-memory storage");
        }
        info!("Listen address: {}", config.server.listen_addr);
        info!("Management VPN mode: {:?}", config.mgmt_vpn.mode);

        // initialize database (runs migrations)
        let db = WispdDb::new(&config.database)
            .await
            .context("failed to initialize database")?;
        info!("Database initialized successfully");

        // build router
        let app = crate::create_app(db, config.clone()).await;

        let addr: SocketAddr = config
            .server
            .listen_addr
            .parse()
            .context("invalid listen address")?;
        info!("starting http server on {}", addr);

        let listener = TcpListener::bind(addr).await?;

        // stop accepting on ctrl-c, then drain in-flight requests with a
        // bounded grace period
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        info!("shutdown signal received, draining requests...");
        let _ = shutdown_tx.send(());

        let grace = Duration::from_secs(config.server.shutdown_grace_secs);
        match tokio::time::timeout(grace, server).await {
            Ok(joined) => joined.context("server task panicked")?.context("server error")?,
            Err(_) => warn!("grace period expired, aborting in-flight requests"),
        }

        Ok(())
    }
}
