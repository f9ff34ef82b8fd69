//! translation of merged NetJSON into OpenWrt UCI configuration files.
//!
//! each known top-level section maps to one file under `etc/config/`.
//! unknown keys are ignored; a missing section simply emits no file, and
//! entries missing required sub-fields (an interface with no name, say)
//! are skipped rather than treated as errors.

use serde_json::{Map, Value};

/// options for a render pass.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// hostname fallback when NetJSON carries none (the device's stored name).
    pub device_hostname: String,
}

/// one rendered file destined for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// path inside the archive, e.g. "etc/config/system".
    pub path: String,
    /// file contents.
    pub data: Vec<u8>,
    /// unix mode; 0 means the archive default (0644).
    pub mode: u32,
}

impl RenderedFile {
    fn config(path: &str, body: String) -> Self {
        Self {
            path: path.to_string(),
            data: body.into_bytes(),
            mode: 0o644,
        }
    }
}

/// render all UCI files for a merged NetJSON tree.
pub fn render_all(netjson: &Value, opts: &RenderOptions) -> Vec<RenderedFile> {
    let root = netjson.as_object();
    let mut files = Vec::new();

    files.push(render_system(root, opts));
    if let Some(f) = render_network(root) {
        files.push(f);
    }
    if let Some(f) = render_wireless(root) {
        files.push(f);
    }
    if let Some(f) = render_dhcp(root) {
        files.push(f);
    }
    if let Some(f) = render_firewall(root) {
        files.push(f);
    }
    if let Some(f) = render_openvpn(root) {
        files.push(f);
    }
    if let Some(f) = render_zerotier(root) {
        files.push(f);
    }

    files
}

// ===== writer helpers =====

/// escape single quotes for a uci value.
fn quote(s: &str) -> String {
    s.replace('\'', "\\'")
}

fn opt(out: &mut String, key: &str, value: &str) {
    if !value.is_empty() {
        out.push_str(&format!("\toption {} '{}'\n", key, quote(value)));
    }
}

fn opt_bool(out: &mut String, key: &str, value: bool) {
    if value {
        out.push_str(&format!("\toption {key} '1'\n"));
    }
}

fn list(out: &mut String, key: &str, value: &str) {
    if !value.is_empty() {
        out.push_str(&format!("\tlist {} '{}'\n", key, quote(value)));
    }
}

// ===== value accessors =====

fn section<'a>(root: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Map<String, Value>> {
    root?.get(key)?.as_object()
}

fn entries<'a>(map: &'a Map<String, Value>, key: &str) -> Vec<&'a Map<String, Value>> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn get_str<'a>(map: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    map.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn get_int(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    match map.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
    .unwrap_or(default)
}

fn get_bool(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        _ => default,
    }
}

/// render every element of an array-or-missing key as its display string.
fn string_items(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(display_scalar).collect())
        .unwrap_or_default()
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

// ===== system =====

fn render_system(root: Option<&Map<String, Value>>, opts: &RenderOptions) -> RenderedFile {
    // precedence: NetJSON > stored device name > default
    let mut hostname = section(root, "system")
        .map(|s| get_str(s, "hostname", ""))
        .unwrap_or("");
    if hostname.is_empty() {
        hostname = &opts.device_hostname;
    }
    if hostname.is_empty() {
        hostname = "OpenWrt";
    }

    let body = format!("config system\n\toption hostname '{}'\n", quote(hostname));
    RenderedFile::config("etc/config/system", body)
}

// ===== network (interfaces + wireguard overlay) =====

fn render_network(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let network = section(root, "network");
    let wireguard = section(root, "wireguard");
    if network.is_none() && wireguard.is_none() {
        return None;
    }

    let mut out = String::new();

    if let Some(network) = network {
        for iface in entries(network, "interfaces") {
            let name = get_str(iface, "name", "");
            if name.is_empty() {
                continue;
            }
            out.push_str(&format!("config interface '{}'\n", quote(name)));
            opt(&mut out, "proto", get_str(iface, "proto", "static"));
            opt(&mut out, "ipaddr", get_str(iface, "ipaddr", ""));
            opt(&mut out, "netmask", get_str(iface, "netmask", ""));
            opt(&mut out, "gateway", get_str(iface, "gateway", ""));
            for dns in string_items(iface, "dns") {
                list(&mut out, "dns", &dns);
            }
            let vlan = get_int(iface, "vlan", 0);
            if vlan > 0 {
                opt(&mut out, "ifname", &format!("{name}.{vlan}"));
            }
            opt_bool(&mut out, "disabled", get_bool(iface, "disabled", false));
            out.push('\n');
        }
    }

    // the wireguard overlay is appended to the same file so it coexists
    // with the plain interfaces
    if let Some(wg) = wireguard {
        render_wireguard_into(&mut out, wg);
    }

    Some(RenderedFile::config("etc/config/network", out))
}

fn render_wireguard_into(out: &mut String, wg: &Map<String, Value>) {
    let iface = get_str(wg, "interface", "wg0");
    out.push_str(&format!("config interface '{}'\n", quote(iface)));
    opt(out, "proto", "wireguard");
    opt(out, "private_key", get_str(wg, "private_key", ""));
    list(out, "addresses", get_str(wg, "address", ""));
    out.push('\n');

    for peer in entries(wg, "peers") {
        out.push_str(&format!("config wireguard_{}\n", quote(iface)));
        opt(out, "public_key", get_str(peer, "public_key", ""));
        opt(out, "preshared_key", get_str(peer, "preshared_key", ""));
        let endpoint = get_str(peer, "endpoint", "");
        if let Some((host, port)) = endpoint.rsplit_once(':') {
            opt(out, "endpoint_host", host);
            opt(out, "endpoint_port", port);
        }
        for ip in string_items(peer, "allowed_ips") {
            list(out, "allowed_ips", &ip);
        }
        let keepalive = get_int(peer, "keepalive", 0);
        if keepalive > 0 {
            opt(out, "persistent_keepalive", &keepalive.to_string());
        }
        out.push('\n');
    }
}

// ===== wireless =====

fn render_wireless(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let wireless = section(root, "wireless")?;
    let mut out = String::new();

    for radio in entries(wireless, "radios") {
        let name = get_str(radio, "name", "");
        if name.is_empty() {
            continue;
        }
        out.push_str(&format!("config wifi-device '{}'\n", quote(name)));
        opt(&mut out, "type", "mac80211");
        opt(&mut out, "hwmode", get_str(radio, "hwmode", ""));
        opt(&mut out, "channel", get_str(radio, "channel", "auto"));
        opt(&mut out, "country", get_str(radio, "country", ""));
        opt_bool(&mut out, "disabled", get_bool(radio, "disabled", false));
        out.push('\n');
    }

    for iface in entries(wireless, "interfaces") {
        out.push_str("config wifi-iface\n");
        opt(&mut out, "device", get_str(iface, "device", ""));
        opt(&mut out, "mode", get_str(iface, "mode", "ap"));
        opt(&mut out, "ssid", get_str(iface, "ssid", ""));
        opt(&mut out, "encryption", get_str(iface, "encryption", "psk2"));
        opt(&mut out, "key", get_str(iface, "key", ""));
        opt(&mut out, "network", get_str(iface, "network", "lan"));
        opt_bool(&mut out, "disabled", get_bool(iface, "disabled", false));
        out.push('\n');
    }

    Some(RenderedFile::config("etc/config/wireless", out))
}

// ===== dhcp =====

fn render_dhcp(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let dhcp = section(root, "dhcp")?;
    let mut out = String::new();

    for server in entries(dhcp, "servers") {
        let iface = get_str(server, "interface", "");
        if iface.is_empty() {
            continue;
        }
        out.push_str(&format!("config dhcp '{}'\n", quote(iface)));
        opt(&mut out, "interface", iface);
        let start = get_int(server, "start", 0);
        if start > 0 {
            opt(&mut out, "start", &start.to_string());
        }
        let limit = get_int(server, "limit", 0);
        if limit > 0 {
            opt(&mut out, "limit", &limit.to_string());
        }
        opt(&mut out, "leasetime", get_str(server, "leasetime", "12h"));
        out.push('\n');
    }

    Some(RenderedFile::config("etc/config/dhcp", out))
}

// ===== firewall =====

fn render_firewall(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let firewall = section(root, "firewall")?;
    let mut out = String::new();

    for zone in entries(firewall, "zones") {
        let name = get_str(zone, "name", "");
        if name.is_empty() {
            continue;
        }
        out.push_str("config zone\n");
        opt(&mut out, "name", name);
        opt(&mut out, "input", get_str(zone, "input", "ACCEPT"));
        opt(&mut out, "output", get_str(zone, "output", "ACCEPT"));
        opt(&mut out, "forward", get_str(zone, "forward", "REJECT"));
        for network in string_items(zone, "networks") {
            list(&mut out, "network", &network);
        }
        out.push('\n');
    }

    for (index, rule) in entries(firewall, "rules").into_iter().enumerate() {
        let default_name = format!("rule_{}", index + 1);
        out.push_str("config rule\n");
        opt(&mut out, "name", get_str(rule, "name", &default_name));
        opt(&mut out, "src", get_str(rule, "src", ""));
        opt(&mut out, "dest", get_str(rule, "dest", ""));
        opt(&mut out, "proto", get_str(rule, "proto", "tcpudp"));
        opt(&mut out, "target", get_str(rule, "target", "ACCEPT"));
        opt(&mut out, "dest_port", get_str(rule, "dest_port", ""));
        opt(&mut out, "family", get_str(rule, "family", ""));
        out.push('\n');
    }

    Some(RenderedFile::config("etc/config/firewall", out))
}

// ===== openvpn =====

fn render_openvpn(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let openvpn = section(root, "openvpn")?;
    let mut out = String::new();

    for client in entries(openvpn, "clients") {
        let name = get_str(client, "name", "client");
        out.push_str(&format!("config openvpn '{}'\n", quote(name)));
        opt(&mut out, "enabled", "1");
        opt(&mut out, "client", "1");
        let remote = get_str(client, "remote", "");
        if !remote.is_empty() {
            let port = get_int(client, "port", 1194);
            opt(&mut out, "remote", &format!("{remote} {port}"));
        }
        opt(&mut out, "proto", get_str(client, "proto", "udp"));
        opt(&mut out, "cipher", get_str(client, "cipher", "AES-256-GCM"));
        opt(&mut out, "auth", get_str(client, "auth", "SHA256"));
        opt(&mut out, "config", get_str(client, "config_file", ""));
        out.push('\n');
    }

    Some(RenderedFile::config("etc/config/openvpn", out))
}

// ===== zerotier =====

fn render_zerotier(root: Option<&Map<String, Value>>) -> Option<RenderedFile> {
    let zerotier = section(root, "zerotier")?;
    let mut out = String::new();

    out.push_str("config zerotier\n");
    opt_bool(&mut out, "enabled", get_bool(zerotier, "enabled", true));
    for network in string_items(zerotier, "networks") {
        list(&mut out, "join", &network);
    }
    out.push('\n');

    Some(RenderedFile::config("etc/config/zerotier", out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(netjson: Value) -> Vec<RenderedFile> {
        render_all(&netjson, &RenderOptions::default())
    }

    fn file_body(files: &[RenderedFile], path: &str) -> String {
        let file = files
            .iter()
            .find(|f| f.path == path)
            .unwrap_or_else(|| panic!("missing {path}"));
        String::from_utf8(file.data.clone()).unwrap()
    }

    #[test]
    fn system_hostname_precedence() {
        let files = render_all(
            &json!({"system": {"hostname": "edge"}}),
            &RenderOptions {
                device_hostname: "node1".to_string(),
            },
        );
        assert!(file_body(&files, "etc/config/system").contains("option hostname 'edge'"));

        let files = render_all(
            &json!({}),
            &RenderOptions {
                device_hostname: "node1".to_string(),
            },
        );
        assert!(file_body(&files, "etc/config/system").contains("option hostname 'node1'"));

        let files = render(json!({}));
        assert!(file_body(&files, "etc/config/system").contains("option hostname 'OpenWrt'"));
    }

    #[test]
    fn hostname_quotes_are_escaped() {
        let files = render(json!({"system": {"hostname": "it's"}}));
        assert!(file_body(&files, "etc/config/system").contains("option hostname 'it\\'s'"));
    }

    #[test]
    fn network_interfaces_render_with_defaults() {
        let files = render(json!({
            "network": {"interfaces": [
                {"name": "lan", "ipaddr": "192.168.1.1", "netmask": "255.255.255.0",
                 "dns": ["1.1.1.1", "8.8.8.8"], "vlan": 10},
                {"proto": "dhcp"} // no name: skipped
            ]}
        }));
        let body = file_body(&files, "etc/config/network");
        assert!(body.contains("config interface 'lan'"));
        assert!(body.contains("option proto 'static'"));
        assert!(body.contains("list dns '1.1.1.1'"));
        assert!(body.contains("list dns '8.8.8.8'"));
        assert!(body.contains("option ifname 'lan.10'"));
        assert!(!body.contains("dhcp"));
    }

    #[test]
    fn missing_sections_emit_no_files() {
        let files = render(json!({}));
        assert_eq!(files.len(), 1, "only etc/config/system is unconditional");
        assert_eq!(files[0].path, "etc/config/system");
    }

    #[test]
    fn wireguard_merges_into_network_file() {
        let files = render(json!({
            "network": {"interfaces": [{"name": "lan"}]},
            "wireguard": {
                "interface": "wg0",
                "address": "10.10.0.7/32",
                "private_key": "privkey",
                "peers": [{
                    "public_key": "srvpub",
                    "preshared_key": "psk",
                    "endpoint": "vpn.example.com:51820",
                    "allowed_ips": ["10.10.0.0/24"],
                    "keepalive": 25
                }]
            }
        }));
        // one network file carrying both the plain interface and the overlay
        assert_eq!(
            files.iter().filter(|f| f.path == "etc/config/network").count(),
            1
        );
        let body = file_body(&files, "etc/config/network");
        assert!(body.contains("config interface 'lan'"));
        assert!(body.contains("config interface 'wg0'"));
        assert!(body.contains("option proto 'wireguard'"));
        assert!(body.contains("list addresses '10.10.0.7/32'"));
        assert!(body.contains("config wireguard_wg0"));
        assert!(body.contains("option endpoint_host 'vpn.example.com'"));
        assert!(body.contains("option endpoint_port '51820'"));
        assert!(body.contains("option persistent_keepalive '25'"));
    }

    #[test]
    fn wireguard_without_network_section_still_renders() {
        let files = render(json!({
            "wireguard": {"address": "10.10.0.7/32", "private_key": "k", "peers": []}
        }));
        let body = file_body(&files, "etc/config/network");
        assert!(body.contains("config interface 'wg0'"));
    }

    #[test]
    fn wireless_defaults() {
        let files = render(json!({
            "wireless": {
                "radios": [{"name": "radio0", "hwmode": "11g"}],
                "interfaces": [{"device": "radio0", "ssid": "attic"}]
            }
        }));
        let body = file_body(&files, "etc/config/wireless");
        assert!(body.contains("config wifi-device 'radio0'"));
        assert!(body.contains("option type 'mac80211'"));
        assert!(body.contains("option channel 'auto'"));
        assert!(body.contains("config wifi-iface"));
        assert!(body.contains("option mode 'ap'"));
        assert!(body.contains("option encryption 'psk2'"));
        assert!(body.contains("option network 'lan'"));
    }

    #[test]
    fn dhcp_pools() {
        let files = render(json!({
            "dhcp": {"servers": [{"interface": "lan", "start": 100, "limit": 150}]}
        }));
        let body = file_body(&files, "etc/config/dhcp");
        assert!(body.contains("config dhcp 'lan'"));
        assert!(body.contains("option start '100'"));
        assert!(body.contains("option limit '150'"));
        assert!(body.contains("option leasetime '12h'"));
    }

    #[test]
    fn firewall_zone_and_rule_defaults() {
        let files = render(json!({
            "firewall": {
                "zones": [{"name": "lan", "networks": ["lan"]}],
                "rules": [{"dest_port": "22"}, {"name": "allow-dns"}]
            }
        }));
        let body = file_body(&files, "etc/config/firewall");
        assert!(body.contains("option input 'ACCEPT'"));
        assert!(body.contains("option forward 'REJECT'"));
        assert!(body.contains("option name 'rule_1'"));
        assert!(body.contains("option name 'allow-dns'"));
        assert!(body.contains("option proto 'tcpudp'"));
        assert!(body.contains("option target 'ACCEPT'"));
        assert!(body.contains("option dest_port '22'"));
    }

    #[test]
    fn openvpn_client_defaults() {
        let files = render(json!({
            "openvpn": {"clients": [{"remote": "vpn.example.com", "port": 1194}]}
        }));
        let body = file_body(&files, "etc/config/openvpn");
        assert!(body.contains("config openvpn 'client'"));
        assert!(body.contains("option enabled '1'"));
        assert!(body.contains("option remote 'vpn.example.com 1194'"));
        assert!(body.contains("option proto 'udp'"));
        assert!(body.contains("option cipher 'AES-256-GCM'"));
        assert!(body.contains("option auth 'SHA256'"));
    }

    #[test]
    fn zerotier_networks() {
        let files = render(json!({
            "zerotier": {"enabled": true, "networks": ["8056c2e21c000001"]}
        }));
        let body = file_body(&files, "etc/config/zerotier");
        assert!(body.contains("option enabled '1'"));
        assert!(body.contains("list join '8056c2e21c000001'"));
    }
}
