//! tests for the reconcile pipeline and vpn overlays.

mod common;

use common::*;
use wispd_db::Database;
use wispd_types::{Config, MgmtVpnMode};

fn wireguard_config() -> Config {
    let mut config = test_config();
    config.mgmt_vpn.mode = MgmtVpnMode::Wireguard;
    config.mgmt_vpn.wireguard.endpoint = "vpn.example.com:51820".to_string();
    config.mgmt_vpn.wireguard.server_public_key = "c2VydmVyLXB1YmxpYy1rZXk=".to_string();
    config.mgmt_vpn.wireguard.address_pool = "10.10.0.0/24".parse().unwrap();
    config.mgmt_vpn.wireguard.allowed_ips = vec!["10.10.0.0/24".to_string()];
    config.mgmt_vpn.wireguard.keepalive = 25;
    config
}

fn openvpn_config() -> Config {
    let mut config = test_config();
    config.mgmt_vpn.mode = MgmtVpnMode::Openvpn;
    config.mgmt_vpn.openvpn.remote = "vpn.example.com".to_string();
    config
}

#[tokio::test]
async fn test_reconcile_unknown_device_is_a_noop() {
    let (_app, db) = test_app(test_config()).await;
    let reconciler = wispd::Reconciler::new(db, test_config());
    let outcome = reconciler.reconcile("no-such-uuid").await.unwrap();
    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_reconcile_is_deterministic_and_skips_unchanged() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, _key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let reconciler = wispd::Reconciler::new(db.clone(), test_config());
    let first = reconciler.reconcile(&uuid).await.unwrap().unwrap();
    let second = reconciler.reconcile(&uuid).await.unwrap().unwrap();

    assert_eq!(first.checksum, second.checksum);
    // registration already built the archive, so neither run rewrites it
    assert!(!first.updated);
    assert!(!second.updated);

    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert_eq!(device.config_version, 1);
    assert_eq!(device.config_checksum, first.checksum);
}

#[tokio::test]
async fn test_checksum_invariant_after_reconcile() {
    use sha2::{Digest, Sha256};

    let (app, db) = test_app(test_config()).await;
    let (uuid, _key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let device = db.get_device(&uuid).await.unwrap().unwrap();
    assert!(device.has_archive());
    assert_eq!(
        device.config_checksum,
        hex::encode(Sha256::digest(&device.config_archive))
    );
}

#[tokio::test]
async fn test_wireguard_overlay_in_archive() {
    let (app, db) = test_app(wireguard_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    let files = unpack_archive(&body_bytes(download).await);

    // first device gets .2 + id 1 = 10.10.0.3/32
    let network = String::from_utf8(files["etc/config/network"].clone()).unwrap();
    assert!(network.contains("config interface 'wg0'"));
    assert!(network.contains("option proto 'wireguard'"));
    assert!(network.contains("list addresses '10.10.0.3/32'"));
    assert!(network.contains("config wireguard_wg0"));
    assert!(network.contains("option endpoint_host 'vpn.example.com'"));
    assert!(network.contains("option endpoint_port '51820'"));
    assert!(network.contains("option persistent_keepalive '25'"));

    let wg_conf = String::from_utf8(files["etc/wireguard/wg0.conf"].clone()).unwrap();
    assert!(wg_conf.contains("[Interface]"));
    assert!(wg_conf.contains("Address = 10.10.0.3/32"));
    assert!(wg_conf.contains("[Peer]"));

    // exactly one peer row backs the overlay
    let device = db.get_device(&uuid).await.unwrap().unwrap();
    let peer = db.get_wireguard_peer(device.id).await.unwrap().unwrap();
    assert_eq!(peer.address_cidr, "10.10.0.3/32");
    assert_eq!(peer.endpoint, "vpn.example.com:51820");
}

#[tokio::test]
async fn test_concurrent_reconciles_converge_on_one_peer() {
    let (app, db) = test_app(wireguard_config()).await;
    let (uuid, _key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let reconciler = wispd::Reconciler::new(db.clone(), wireguard_config());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let reconciler = reconciler.clone();
        let uuid = uuid.clone();
        handles.push(tokio::spawn(async move {
            reconciler.reconcile(&uuid).await.unwrap().unwrap()
        }));
    }

    let mut checksums = std::collections::HashSet::new();
    for handle in handles {
        checksums.insert(handle.await.unwrap().checksum);
    }
    assert_eq!(checksums.len(), 1, "all reconciles agree on the archive");

    let device = db.get_device(&uuid).await.unwrap().unwrap();
    // version advanced once per distinct archive, not once per reconcile
    assert_eq!(device.config_version, 1);
    assert!(db.get_wireguard_peer(device.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_wireguard_archive_is_stable_across_polls() {
    let (app, _db) = test_app(wireguard_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let first = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;
    let second = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;
    assert_eq!(first, second, "persisted peer material keeps archives stable");
}

#[tokio::test]
async fn test_openvpn_overlay_ships_pki_material() {
    let (app, db) = test_app(openvpn_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    let files = unpack_archive(&body_bytes(download).await);

    let openvpn = String::from_utf8(files["etc/config/openvpn"].clone()).unwrap();
    assert!(openvpn.contains("config openvpn 'client'"));
    assert!(openvpn.contains("option remote 'vpn.example.com 1194'"));
    assert!(openvpn.contains("option cipher 'AES-256-GCM'"));

    let ca_crt = String::from_utf8(files[&format!("etc/openvpn/{uuid}/ca.crt")].clone()).unwrap();
    assert!(ca_crt.starts_with("-----BEGIN CERTIFICATE-----"));
    let client_crt =
        String::from_utf8(files[&format!("etc/openvpn/{uuid}/client.crt")].clone()).unwrap();
    assert!(client_crt.starts_with("-----BEGIN CERTIFICATE-----"));
    let client_key =
        String::from_utf8(files[&format!("etc/openvpn/{uuid}/client.key")].clone()).unwrap();
    assert!(client_key.contains("PRIVATE KEY"));

    // the ca was created lazily with the default name
    assert!(db.get_ca("OpenWISP-Go-CA").await.unwrap().is_some());
}

#[tokio::test]
async fn test_openvpn_reconcile_reuses_device_certificate() {
    let (app, _db) = test_app(openvpn_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    // repeated polls must not reissue certificates and churn the archive
    let first = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;
    let second = body_string(get(&app, &format!("/controller/checksum/{uuid}?key={key}")).await)
        .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_zerotier_overlay() {
    let mut config = test_config();
    config.mgmt_vpn.mode = MgmtVpnMode::Zerotier;
    config.mgmt_vpn.zerotier.network_id = "8056c2e21c000001".to_string();

    let (app, _db) = test_app(config).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    let files = unpack_archive(&body_bytes(download).await);
    let zerotier = String::from_utf8(files["etc/config/zerotier"].clone()).unwrap();
    assert!(zerotier.contains("option enabled '1'"));
    assert!(zerotier.contains("list join '8056c2e21c000001'"));
}

#[tokio::test]
async fn test_device_vars_flow_into_templates() {
    let (app, db) = test_app(test_config()).await;
    let (uuid, key) = register_device(&app, "node1", "aa:bb:cc:dd:ee:01").await;

    use chrono::Utc;
    let now = Utc::now();
    db.create_template(&wispd_types::ConfigTemplate {
        id: 0,
        org_id: None,
        name: "hostname-from-vars".to_string(),
        priority: 10,
        netjson: serde_json::json!({
            "system": {"hostname": "{{ .device_name }}-edge"}
        }),
        vars_schema: None,
        created_at: now,
        updated_at: now,
    })
    .await
    .unwrap();

    let download = get(&app, &format!("/controller/download-config/{uuid}?key={key}")).await;
    let files = unpack_archive(&body_bytes(download).await);
    let system = String::from_utf8(files["etc/config/system"].clone()).unwrap();
    assert!(system.contains("option hostname 'node1-edge'"));
}
