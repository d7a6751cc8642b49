//! The supported tunnel document schemas

use serde_json::{Map, Value};

use super::schema::{
    DefaultValue, Field, Kind, ObjectSchema, Rule, StrRule, UnionSchema, Violation,
};

const PORT: Kind = Kind::Integer { min: 1, max: 65535 };
const LIMIT: Kind = Kind::Integer {
    min: 0,
    max: u32::MAX as i64,
};
const TEXT: Kind = Kind::Str(StrRule::Any);

static STRING_ITEM: Kind = Kind::Str(StrRule::Any);
static ANY_ITEM: Kind = Kind::Any;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "fatal"];
const DNS_STRATEGIES: &[&str] = &["prefer_ipv4", "prefer_ipv6", "ipv4_only", "ipv6_only"];
const MULTIPLEX_PROTOCOLS: &[&str] = &["smux", "yamux", "h2mux"];
const PROXY_OUTBOUNDS: &[&str] = &["shadowsocks", "trojan"];

/// Which schema a payload is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaId {
    /// Legacy single-protocol `TunnelConfig`
    Tunnel,
    /// Multi-outbound `SingBoxConfig`
    SingBox,
}

impl SchemaId {
    pub fn schema(self) -> &'static ObjectSchema {
        match self {
            SchemaId::Tunnel => &TUNNEL_CONFIG,
            SchemaId::SingBox => &SINGBOX_CONFIG,
        }
    }

    pub fn name(self) -> &'static str {
        self.schema().name
    }

    /// Guess the schema of an untyped payload
    ///
    /// Payloads carrying any of the legacy top-level keys are legacy
    /// documents; everything else is held to the current schema.
    pub fn detect(payload: &Value) -> SchemaId {
        const LEGACY_KEYS: &[&str] = &["run_type", "local_addr", "remote_addr"];
        match payload.as_object() {
            Some(map) if LEGACY_KEYS.iter().any(|key| map.contains_key(*key)) => SchemaId::Tunnel,
            _ => SchemaId::SingBox,
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy TunnelConfig
// ---------------------------------------------------------------------------

fn ssl_requires_sni(ssl: &Map<String, Value>) -> Option<Violation> {
    let enabled = ssl.get("enabled").and_then(Value::as_bool).unwrap_or(false);
    let sni = ssl.get("sni").and_then(Value::as_str).unwrap_or_default();
    if enabled && sni.is_empty() {
        Some(Violation::on("sni", "sni is required when ssl is enabled"))
    } else {
        None
    }
}

static SSL: ObjectSchema = ObjectSchema {
    name: "ssl",
    fields: &[
        Field::required("enabled", Kind::Bool),
        Field::optional("sni", TEXT),
        Field::optional("verify", Kind::Bool),
        Field::optional("verify_hostname", Kind::Bool),
    ],
    rules: &[Rule {
        depends_on: &["enabled", "sni"],
        check: ssl_requires_sni,
    }],
};

static MUX: ObjectSchema = ObjectSchema {
    name: "mux",
    fields: &[Field::required("enabled", Kind::Bool)],
    rules: &[],
};

static ROUTER: ObjectSchema = ObjectSchema {
    name: "router",
    fields: &[
        Field::required("enabled", Kind::Bool),
        Field::optional(
            "bypass",
            Kind::Array {
                item: &STRING_ITEM,
                min_items: 0,
            },
        ),
        Field::optional(
            "block",
            Kind::Array {
                item: &STRING_ITEM,
                min_items: 0,
            },
        ),
        Field::optional(
            "proxy",
            Kind::Array {
                item: &STRING_ITEM,
                min_items: 0,
            },
        ),
        Field::optional("default_policy", TEXT),
        Field::optional("geoip", TEXT),
        Field::optional("geosite", TEXT),
    ],
    rules: &[],
};

pub static TUNNEL_CONFIG: ObjectSchema = ObjectSchema {
    name: "tunnel config",
    fields: &[
        Field::required("run_type", Kind::Str(StrRule::OneOf(&["client"]))),
        Field::required("local_addr", Kind::Str(StrRule::Ipv4)),
        Field::required("local_port", PORT),
        Field::required("remote_addr", Kind::Str(StrRule::Address)),
        Field::required("remote_port", PORT),
        Field::required(
            "password",
            Kind::Array {
                item: &STRING_ITEM,
                min_items: 1,
            },
        ),
        Field::optional("ssl", Kind::Object(&SSL)),
        Field::optional("mux", Kind::Object(&MUX)),
        Field::optional("router", Kind::Object(&ROUTER)),
    ],
    rules: &[],
};

// ---------------------------------------------------------------------------
// SingBoxConfig
// ---------------------------------------------------------------------------

static LOG: ObjectSchema = ObjectSchema {
    name: "log",
    fields: &[
        Field::required("level", Kind::Str(StrRule::OneOf(LOG_LEVELS))),
        Field::required("timestamp", Kind::Bool),
    ],
    rules: &[],
};

static DNS: ObjectSchema = ObjectSchema {
    name: "dns",
    fields: &[
        Field::required(
            "servers",
            Kind::Array {
                item: &ANY_ITEM,
                min_items: 0,
            },
        ),
        Field::required(
            "rules",
            Kind::Array {
                item: &ANY_ITEM,
                min_items: 0,
            },
        ),
        Field::required("final", TEXT),
        Field::required("strategy", Kind::Str(StrRule::OneOf(DNS_STRATEGIES))),
    ],
    rules: &[],
};

static INBOUND: ObjectSchema = ObjectSchema {
    name: "inbound",
    fields: &[
        Field::required("type", Kind::Str(StrRule::Literal("mixed"))),
        Field::required("tag", TEXT),
        Field::required("listen", Kind::Str(StrRule::Ipv4)),
        Field::required("listen_port", PORT),
        Field::defaulted("sniff", Kind::Bool, DefaultValue::Bool(true)),
        Field::defaulted(
            "sniff_override_destination",
            Kind::Bool,
            DefaultValue::Bool(true),
        ),
    ],
    rules: &[],
};
static INBOUND_ITEM: Kind = Kind::Object(&INBOUND);

static MULTIPLEX: ObjectSchema = ObjectSchema {
    name: "multiplex",
    fields: &[
        Field::required("enabled", Kind::Bool),
        Field::optional("protocol", Kind::Str(StrRule::OneOf(MULTIPLEX_PROTOCOLS))),
        Field::optional("max_connections", LIMIT),
        Field::optional("min_streams", LIMIT),
        Field::optional("max_streams", LIMIT),
    ],
    rules: &[],
};

static SHADOWSOCKS: ObjectSchema = ObjectSchema {
    name: "shadowsocks outbound",
    fields: &[
        Field::required("type", Kind::Str(StrRule::Literal("shadowsocks"))),
        Field::required("tag", TEXT),
        Field::required("server", Kind::Str(StrRule::Address)),
        Field::required("server_port", PORT),
        Field::required("method", TEXT),
        Field::required("password", TEXT),
        Field::optional("multiplex", Kind::Object(&MULTIPLEX)),
    ],
    rules: &[],
};

static UTLS: ObjectSchema = ObjectSchema {
    name: "utls",
    fields: &[
        Field::required("enabled", Kind::Bool),
        Field::optional("fingerprint", TEXT),
    ],
    rules: &[],
};

// server_name stays optional even with TLS enabled; sing-box falls back to
// the server address
static TROJAN_TLS: ObjectSchema = ObjectSchema {
    name: "tls",
    fields: &[
        Field::defaulted("enabled", Kind::Bool, DefaultValue::Bool(true)),
        Field::optional("server_name", TEXT),
        Field::optional("insecure", Kind::Bool),
        Field::optional(
            "alpn",
            Kind::Array {
                item: &STRING_ITEM,
                min_items: 0,
            },
        ),
        Field::optional("utls", Kind::Object(&UTLS)),
    ],
    rules: &[],
};

static TROJAN: ObjectSchema = ObjectSchema {
    name: "trojan outbound",
    fields: &[
        Field::required("type", Kind::Str(StrRule::Literal("trojan"))),
        Field::required("tag", TEXT),
        Field::required("server", Kind::Str(StrRule::Address)),
        Field::required("server_port", PORT),
        Field::required("password", TEXT),
        Field::optional("tls", Kind::Object(&TROJAN_TLS)),
        Field::optional("multiplex", Kind::Object(&MULTIPLEX)),
        Field::optional("transport", Kind::OpenObject),
    ],
    rules: &[],
};

static DIRECT: ObjectSchema = ObjectSchema {
    name: "direct outbound",
    fields: &[
        Field::required("type", Kind::Str(StrRule::Literal("direct"))),
        Field::required("tag", TEXT),
    ],
    rules: &[],
};

static OUTBOUND: UnionSchema = UnionSchema {
    name: "outbound",
    tag: "type",
    variants: &[
        ("shadowsocks", &SHADOWSOCKS),
        ("trojan", &TROJAN),
        ("direct", &DIRECT),
    ],
};
static OUTBOUND_ITEM: Kind = Kind::Union(&OUTBOUND);

static RULE_SET: ObjectSchema = ObjectSchema {
    name: "rule set",
    fields: &[
        Field::required("type", Kind::Str(StrRule::Literal("remote"))),
        Field::required("tag", TEXT),
        Field::required("format", Kind::Str(StrRule::Literal("binary"))),
        Field::required("url", Kind::Str(StrRule::Url)),
        Field::required("download_detour", TEXT),
    ],
    rules: &[],
};
static RULE_SET_ITEM: Kind = Kind::Object(&RULE_SET);

static ROUTE: ObjectSchema = ObjectSchema {
    name: "route",
    fields: &[
        Field::required(
            "rules",
            Kind::Array {
                item: &ANY_ITEM,
                min_items: 0,
            },
        ),
        Field::required(
            "rule_set",
            Kind::Array {
                item: &RULE_SET_ITEM,
                min_items: 0,
            },
        ),
        Field::required("final", TEXT),
        Field::required("auto_detect_interface", Kind::Bool),
    ],
    rules: &[],
};

static CACHE_FILE: ObjectSchema = ObjectSchema {
    name: "cache file",
    fields: &[
        Field::required("enabled", Kind::Bool),
        Field::required("store_rdrc", Kind::Bool),
    ],
    rules: &[],
};

static CLASH_API: ObjectSchema = ObjectSchema {
    name: "clash api",
    fields: &[Field::required("default_mode", TEXT)],
    rules: &[],
};

static EXPERIMENTAL: ObjectSchema = ObjectSchema {
    name: "experimental",
    fields: &[
        Field::required("cache_file", Kind::Object(&CACHE_FILE)),
        Field::optional("clash_api", Kind::Object(&CLASH_API)),
    ],
    rules: &[],
};

fn requires_proxy_outbound(config: &Map<String, Value>) -> Option<Violation> {
    let outbounds = config.get("outbounds")?.as_array()?;
    let has_proxy = outbounds.iter().any(|outbound| {
        outbound
            .get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| PROXY_OUTBOUNDS.contains(&t))
    });
    if has_proxy {
        None
    } else {
        Some(Violation::on(
            "outbounds",
            "at least one shadowsocks or trojan outbound is required",
        ))
    }
}

pub static SINGBOX_CONFIG: ObjectSchema = ObjectSchema {
    name: "sing-box config",
    fields: &[
        Field::required("log", Kind::Object(&LOG)),
        Field::required("dns", Kind::Object(&DNS)),
        Field::required(
            "inbounds",
            Kind::Array {
                item: &INBOUND_ITEM,
                min_items: 1,
            },
        ),
        Field::required(
            "outbounds",
            Kind::Array {
                item: &OUTBOUND_ITEM,
                min_items: 0,
            },
        ),
        Field::required("route", Kind::Object(&ROUTE)),
        Field::optional("experimental", Kind::Object(&EXPERIMENTAL)),
    ],
    rules: &[Rule {
        depends_on: &["outbounds"],
        check: requires_proxy_outbound,
    }],
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detect() {
        assert_eq!(
            SchemaId::detect(&json!({"run_type": "client"})),
            SchemaId::Tunnel
        );
        assert_eq!(
            SchemaId::detect(&json!({"outbounds": []})),
            SchemaId::SingBox
        );
        assert_eq!(SchemaId::detect(&json!("nonsense")), SchemaId::SingBox);
    }

    #[test]
    fn test_outbound_union_lookup() {
        assert_eq!(OUTBOUND.variant("trojan").map(|s| s.name), Some("trojan outbound"));
        assert!(OUTBOUND.variant("vmess").is_none());
        assert_eq!(
            OUTBOUND.tags().collect::<Vec<_>>(),
            vec!["shadowsocks", "trojan", "direct"]
        );
    }

    #[test]
    fn test_ssl_rule() {
        let on = json!({"enabled": true});
        let named = json!({"enabled": true, "sni": "example.com"});
        let off = json!({"enabled": false});
        assert!(ssl_requires_sni(on.as_object().unwrap()).is_some());
        assert!(ssl_requires_sni(named.as_object().unwrap()).is_none());
        assert!(ssl_requires_sni(off.as_object().unwrap()).is_none());
    }
}
