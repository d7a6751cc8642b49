//! Multi-outbound descriptor consumed by sing-box
//!
//! Only the subset of the sing-box format the client produces is modelled.
//! DNS servers, DNS rules and route rules are kept as raw JSON since they
//! are handed to the engine untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingBoxConfig {
    pub log: LogConfig,
    pub dns: DnsConfig,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub route: RouteConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Experimental>,
}

impl SingBoxConfig {
    /// Proxy protocols used by the outbounds, in outbound order
    pub fn enabled_protocols(&self) -> Vec<Protocol> {
        self.outbounds
            .iter()
            .filter_map(Outbound::protocol)
            .collect()
    }

    /// Port of the first inbound, where the engine accepts client traffic
    pub fn local_port(&self) -> Option<u16> {
        self.inbounds.first().map(|inbound| inbound.listen_port)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub timestamp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnsStrategy {
    PreferIpv4,
    PreferIpv6,
    Ipv4Only,
    Ipv6Only,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsConfig {
    pub servers: Vec<Value>,
    pub rules: Vec<Value>,
    /// Tag of the default DNS server
    #[serde(rename = "final")]
    pub final_server: String,
    pub strategy: DnsStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboundType {
    Mixed,
}

/// Local mixed (HTTP + SOCKS) listener
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inbound {
    #[serde(rename = "type")]
    pub inbound_type: InboundType,
    pub tag: String,
    pub listen: String,
    pub listen_port: u16,
    #[serde(default = "default_true")]
    pub sniff: bool,
    #[serde(default = "default_true")]
    pub sniff_override_destination: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Shadowsocks,
    Trojan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Shadowsocks(ShadowsocksOutbound),
    Trojan(TrojanOutbound),
    Direct(DirectOutbound),
}

impl Outbound {
    pub fn tag(&self) -> &str {
        match self {
            Outbound::Shadowsocks(o) => &o.tag,
            Outbound::Trojan(o) => &o.tag,
            Outbound::Direct(o) => &o.tag,
        }
    }

    /// The proxy protocol, `None` for direct outbounds
    pub fn protocol(&self) -> Option<Protocol> {
        match self {
            Outbound::Shadowsocks(_) => Some(Protocol::Shadowsocks),
            Outbound::Trojan(_) => Some(Protocol::Trojan),
            Outbound::Direct(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowsocksOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    /// Cipher, e.g. `2022-blake3-aes-128-gcm`
    pub method: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrojanOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TrojanTls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplex: Option<Multiplex>,
    /// V2Ray transport options, passed to the engine as is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrojanTls {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utls: Option<Utls>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utls {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectOutbound {
    pub tag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiplexProtocol {
    Smux,
    Yamux,
    H2mux,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplex {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<MultiplexProtocol>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_streams: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_streams: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub rules: Vec<Value>,
    pub rule_set: Vec<RuleSet>,
    /// Tag of the outbound used when no rule matches
    #[serde(rename = "final")]
    pub final_outbound: String,
    pub auto_detect_interface: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetType {
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSetFormat {
    Binary,
}

/// Remote rule-set downloaded by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(rename = "type")]
    pub rule_set_type: RuleSetType,
    pub tag: String,
    pub format: RuleSetFormat,
    pub url: String,
    pub download_detour: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experimental {
    pub cache_file: CacheFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clash_api: Option<ClashApi>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFile {
    pub enabled: bool,
    pub store_rdrc: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClashApi {
    pub default_mode: String,
}
