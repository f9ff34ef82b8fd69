//! the configuration reconcile pipeline.
//!
//! `Reconcile(uuid)` computes the authoritative archive for one device:
//! merge applicable templates, substitute device variables, overlay the
//! management vpn, render UCI files, build the deterministic archive and
//! persist it only when its checksum changed. reconciles for the same
//! device are serialised through a per-device async mutex so concurrent
//! polls converge on a single `(archive, checksum, version)` write.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use wispd_db::{Database, WispdDb};
use wispd_render::{RenderOptions, Source, apply_vars, build_archive, merge, render_all};
use wispd_types::{Ca, Certificate, Config, Device, MgmtVpnMode};

use crate::vpn;

/// priority of the merged template base when overlaying.
const BASE_PRIORITY: i32 = 10;
/// priority of vpn overlays; always wins over templates.
const OVERLAY_PRIORITY: i32 = 999;

/// errors from the reconcile pipeline. any stage error aborts the run and
/// leaves stored state untouched.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// storage failed.
    #[error(transparent)]
    Db(#[from] wispd_db::Error),

    /// rendering or archive packaging failed.
    #[error(transparent)]
    Render(#[from] wispd_render::Error),

    /// certificate issuance failed.
    #[error(transparent)]
    Pki(#[from] wispd_pki::Error),
}

/// result of a successful reconcile.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// checksum of the (possibly unchanged) archive.
    pub checksum: String,
    /// whether a new archive was written.
    pub updated: bool,
}

/// the reconcile pipeline, shared across handlers.
#[derive(Clone)]
pub struct Reconciler {
    db: WispdDb,
    config: Config,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl Reconciler {
    /// create a reconciler over a database handle.
    pub fn new(db: WispdDb, config: Config) -> Self {
        Self {
            db,
            config,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// reconcile one device. returns `None` for an unknown uuid.
    pub async fn reconcile(
        &self,
        uuid: &str,
    ) -> Result<Option<ReconcileOutcome>, ReconcileError> {
        if self.db.get_device(uuid).await?.is_none() {
            return Ok(None);
        }

        let lock = self
            .locks
            .entry(uuid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // re-read under the lock so version/checksum are current
        let Some(device) = self.db.get_device(uuid).await? else {
            return Ok(None);
        };

        // 1) merge applicable templates
        let templates = self.db.templates_for_device(device.id).await?;
        let sources = templates
            .iter()
            .map(|t| Source::new(t.name.clone(), t.priority, t.netjson.clone()))
            .collect();
        let mut merged = merge(sources);

        // 2) device variables
        merged = apply_vars(&merged, &device_vars(&device));

        // 3) vpn overlay + auxiliary files
        let mut extra: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        match self.config.mgmt_vpn.mode {
            MgmtVpnMode::Wireguard => {
                let overlay = self.wireguard_overlay(&device, &mut extra).await?;
                merged = overlay_onto(merged, overlay);
            }
            MgmtVpnMode::Openvpn => {
                let overlay = self.openvpn_overlay(&device, &mut extra).await?;
                merged = overlay_onto(merged, overlay);
            }
            MgmtVpnMode::Zerotier => {
                let zt = &self.config.mgmt_vpn.zerotier;
                let overlay = json!({
                    "zerotier": {
                        "enabled": true,
                        "networks": [zt.network_id],
                    }
                });
                merged = overlay_onto(merged, overlay);
            }
            MgmtVpnMode::None => {}
        }

        // 4) render uci files
        let files = render_all(
            &merged,
            &RenderOptions {
                device_hostname: device.name.clone(),
            },
        );

        // 5) archive
        let (archive, checksum) = build_archive(&files, &extra)?;

        // 6) write back only on change
        if checksum == device.config_checksum {
            return Ok(Some(ReconcileOutcome {
                checksum,
                updated: false,
            }));
        }
        let version = (device.config_version + 1).max(1);
        self.db
            .put_config_archive(uuid, &archive, &merged, version)
            .await?;
        debug!(uuid, version, checksum = %checksum, "configuration archive updated");
        Ok(Some(ReconcileOutcome {
            checksum,
            updated: true,
        }))
    }

    /// wireguard overlay: one persisted peer per device, address picked
    /// from the pool by device id.
    async fn wireguard_overlay(
        &self,
        device: &Device,
        extra: &mut BTreeMap<String, Vec<u8>>,
    ) -> Result<Value, ReconcileError> {
        let wg_config = &self.config.mgmt_vpn.wireguard;

        let peer = match self.db.get_wireguard_peer(device.id).await? {
            Some(peer) => peer,
            None => {
                let address = vpn::pool_address(&wg_config.address_pool, device.id);
                let mut fresh = vpn::generate_peer(address, wg_config);
                fresh.device_id = device.id;
                self.db.create_wireguard_peer(&fresh).await?
            }
        };

        extra.insert("etc/wireguard/wg0.conf".to_string(), vpn::render_wg_conf(&peer));

        let allowed_ips: Vec<&str> = peer
            .allowed_ips
            .split(',')
            .filter(|s| !s.is_empty())
            .collect();
        Ok(json!({
            "wireguard": {
                "interface": "wg0",
                "address": peer.address_cidr,
                "private_key": peer.private_key,
                "peers": [{
                    "public_key": peer.server_public_key,
                    "preshared_key": peer.preshared_key,
                    "endpoint": peer.endpoint,
                    "allowed_ips": allowed_ips,
                    "keepalive": peer.keepalive,
                }],
            }
        }))
    }

    /// openvpn overlay: lazily created root ca, per-device client
    /// certificate, pem material shipped as extra files.
    async fn openvpn_overlay(
        &self,
        device: &Device,
        extra: &mut BTreeMap<String, Vec<u8>>,
    ) -> Result<Value, ReconcileError> {
        let pki_config = &self.config.pki;
        let now = Utc::now();

        let ca = match self.db.get_ca(&pki_config.ca_name).await? {
            Some(ca) => ca,
            None => {
                let generated = wispd_pki::generate_root_ca(
                    &pki_config.ca_name,
                    pki_config.cert_ttl_hours,
                    now,
                )?;
                self.db
                    .create_ca(&Ca {
                        id: 0,
                        name: pki_config.ca_name.clone(),
                        cert_pem: generated.cert_pem,
                        key_pem: generated.key_pem,
                        not_before: generated.not_before,
                        not_after: generated.not_after,
                        created_at: now,
                    })
                    .await?
            }
        };

        // reuse the device's current certificate while it is valid; a fresh
        // one every pass would make every poll rewrite the archive
        let cert = match self.db.get_device_certificate(device.id, ca.id, now).await? {
            Some(cert) => cert,
            None => {
                let issued = wispd_pki::issue_device_cert(
                    &ca.cert_pem,
                    &ca.key_pem,
                    &device.uuid,
                    pki_config.cert_ttl_hours,
                    now,
                )?;
                self.db
                    .create_certificate(&Certificate {
                        id: 0,
                        ca_id: ca.id,
                        device_id: Some(device.id),
                        cn: device.uuid.clone(),
                        cert_pem: issued.cert_pem,
                        key_pem: issued.key_pem,
                        not_before: issued.not_before,
                        not_after: issued.not_after,
                        created_at: now,
                    })
                    .await?
            }
        };

        let dir = format!("etc/openvpn/{}", device.uuid);
        extra.insert(format!("{dir}/ca.crt"), ca.cert_pem.into_bytes());
        extra.insert(format!("{dir}/client.crt"), cert.cert_pem.into_bytes());
        extra.insert(format!("{dir}/client.key"), cert.key_pem.into_bytes());

        let ovpn = &self.config.mgmt_vpn.openvpn;
        Ok(json!({
            "openvpn": {
                "clients": [{
                    "name": "client",
                    "remote": ovpn.remote,
                    "port": ovpn.port,
                    "proto": ovpn.proto,
                    "cipher": ovpn.cipher,
                    "auth": ovpn.auth,
                }],
            }
        }))
    }
}

/// merge a vpn overlay over the template base at overlay priority.
fn overlay_onto(base: Value, overlay: Value) -> Value {
    merge(vec![
        Source::new("base", BASE_PRIORITY, base),
        Source::new("overlay", OVERLAY_PRIORITY, overlay),
    ])
}

/// the variable bag for substitution: device identity fields.
fn device_vars(device: &Device) -> Map<String, Value> {
    let mut vars = Map::new();
    vars.insert("device_uuid".to_string(), json!(device.uuid));
    vars.insert("device_name".to_string(), json!(device.name));
    vars.insert("model".to_string(), json!(device.model));
    vars.insert("mac".to_string(), json!(device.mac));
    vars
}
