//! wireguard key material and address assignment.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use ipnet::Ipv4Net;
use rand::RngCore;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use wispd_types::{DeviceId, WireGuardConfig, WireGuardPeer};

/// assign a /32 from an ipv4 /24 pool by device id.
///
/// hosts start at .2 and wrap modulo 250; collisions across more than 250
/// devices are accepted (a full ipam is out of scope).
pub fn pool_address(pool: &Ipv4Net, device_id: DeviceId) -> String {
    let base = pool.network().octets();
    let host = 2 + (device_id.as_u64() % 250) as u8;
    format!("{}.{}.{}.{}/32", base[0], base[1], base[2], host)
}

/// generate fresh peer material for a device: x25519 keypair plus a random
/// preshared key, all base64 like the wireguard tooling expects.
pub fn generate_peer(address_cidr: String, config: &WireGuardConfig) -> WireGuardPeer {
    let private = StaticSecret::random_from_rng(OsRng);
    let public = PublicKey::from(&private);

    let mut preshared = [0u8; 32];
    OsRng.fill_bytes(&mut preshared);

    WireGuardPeer {
        id: 0,
        device_id: DeviceId(0),
        private_key: BASE64.encode(private.to_bytes()),
        public_key: BASE64.encode(public.as_bytes()),
        preshared_key: BASE64.encode(preshared),
        address_cidr,
        server_public_key: config.server_public_key.clone(),
        endpoint: config.endpoint.clone(),
        allowed_ips: config.allowed_ips.join(","),
        keepalive: config.keepalive,
    }
}

/// render a wg-quick style wg0.conf for the device side.
pub fn render_wg_conf(peer: &WireGuardPeer) -> Vec<u8> {
    let mut out = String::from("[Interface]\n");
    out.push_str(&format!("Address = {}\n", peer.address_cidr));
    out.push_str(&format!("PrivateKey = {}\n", peer.private_key));

    out.push_str("\n[Peer]\n");
    if !peer.server_public_key.is_empty() {
        out.push_str(&format!("PublicKey = {}\n", peer.server_public_key));
    }
    if !peer.preshared_key.is_empty() {
        out.push_str(&format!("PresharedKey = {}\n", peer.preshared_key));
    }
    if !peer.endpoint.is_empty() {
        out.push_str(&format!("Endpoint = {}\n", peer.endpoint));
    }
    if !peer.allowed_ips.is_empty() {
        out.push_str(&format!("AllowedIPs = {}\n", peer.allowed_ips));
    }
    if peer.keepalive > 0 {
        out.push_str(&format!("PersistentKeepalive = {}\n", peer.keepalive));
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WireGuardConfig {
        WireGuardConfig {
            endpoint: "vpn.example.com:51820".to_string(),
            server_public_key: "c2VydmVy".to_string(),
            address_pool: "10.10.0.0/24".parse().unwrap(),
            allowed_ips: vec!["10.10.0.0/24".to_string()],
            keepalive: 25,
        }
    }

    #[test]
    fn addresses_start_at_dot_two_and_wrap() {
        let pool: Ipv4Net = "10.10.0.0/24".parse().unwrap();
        assert_eq!(pool_address(&pool, DeviceId(0)), "10.10.0.2/32");
        assert_eq!(pool_address(&pool, DeviceId(5)), "10.10.0.7/32");
        assert_eq!(pool_address(&pool, DeviceId(250)), "10.10.0.2/32");
    }

    #[test]
    fn generated_peers_are_unique() {
        let config = test_config();
        let a = generate_peer("10.10.0.2/32".to_string(), &config);
        let b = generate_peer("10.10.0.3/32".to_string(), &config);
        assert_ne!(a.private_key, b.private_key);
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.preshared_key, b.preshared_key);
        // 32 bytes of base64
        assert_eq!(BASE64.decode(&a.private_key).unwrap().len(), 32);
        assert_eq!(BASE64.decode(&a.public_key).unwrap().len(), 32);
        assert_eq!(a.endpoint, "vpn.example.com:51820");
        assert_eq!(a.allowed_ips, "10.10.0.0/24");
    }

    #[test]
    fn wg_conf_contains_interface_and_peer() {
        let mut peer = generate_peer("10.10.0.7/32".to_string(), &test_config());
        peer.private_key = "PRIV".to_string();
        let conf = String::from_utf8(render_wg_conf(&peer)).unwrap();
        assert!(conf.starts_with("[Interface]\n"));
        assert!(conf.contains("Address = 10.10.0.7/32"));
        assert!(conf.contains("PrivateKey = PRIV"));
        assert!(conf.contains("[Peer]"));
        assert!(conf.contains("PublicKey = c2VydmVy"));
        assert!(conf.contains("Endpoint = vpn.example.com:51820"));
        assert!(conf.contains("AllowedIPs = 10.10.0.0/24"));
        assert!(conf.contains("PersistentKeepalive = 25"));
    }
}
