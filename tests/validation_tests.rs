mod common;

use common::{legacy_payload, singbox_payload, trojan_outbound};
use serde_json::json;
use tunnelconf::models::{Outbound, Protocol};
use tunnelconf::validator::{validate_document, validate_singbox_config, validate_tunnel_config};

#[cfg(test)]
mod singbox_validation_tests {
    use super::*;

    #[test]
    fn test_full_config_is_accepted() {
        let config = validate_singbox_config(&singbox_payload()).unwrap();

        assert_eq!(config.enabled_protocols(), vec![Protocol::Trojan]);
        assert_eq!(config.local_port(), Some(2080));
        assert!(config.inbounds[0].sniff);
        assert!(config.inbounds[0].sniff_override_destination);
        assert_eq!(config.route.final_outbound, "proxy");
        match &config.outbounds[0] {
            Outbound::Trojan(trojan) => {
                let tls = trojan.tls.as_ref().unwrap();
                assert_eq!(tls.utls.as_ref().unwrap().fingerprint.as_deref(), Some("chrome"));
            }
            other => panic!("unexpected outbound: {:?}", other),
        }
    }

    #[test]
    fn test_direct_only_outbounds_are_rejected() {
        let mut payload = singbox_payload();
        payload["outbounds"] = json!([{"type": "direct", "tag": "direct"}]);

        let errors = validate_singbox_config(&payload).unwrap_err();
        let issue = errors.at("outbounds").unwrap();
        assert_eq!(
            issue.message,
            "at least one shadowsocks or trojan outbound is required"
        );
    }

    #[test]
    fn test_trojan_tls_without_server_name_is_accepted() {
        let mut payload = singbox_payload();
        payload["outbounds"][0]["tls"] = json!({"enabled": true});

        let config = validate_singbox_config(&payload).unwrap();
        match &config.outbounds[0] {
            Outbound::Trojan(trojan) => {
                assert_eq!(trojan.tls.as_ref().unwrap().server_name, None)
            }
            other => panic!("unexpected outbound: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_outbound_type() {
        let mut payload = singbox_payload();
        payload["outbounds"] = json!([trojan_outbound(), {"type": "vmess", "tag": "v"}]);

        let errors = validate_singbox_config(&payload).unwrap_err();
        let issue = errors.at("outbounds[1].type").unwrap();
        assert_eq!(
            issue.message,
            "invalid outbound type \"vmess\", expected one of: shadowsocks, trojan, direct"
        );
    }

    #[test]
    fn test_lone_unknown_outbound_reports_only_its_type() {
        let mut payload = singbox_payload();
        payload["outbounds"] = json!([{"type": "vmess", "tag": "v"}]);

        let errors = validate_singbox_config(&payload).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.at("outbounds[0].type").is_some());
        assert!(errors.at("outbounds").is_none());
    }

    #[test]
    fn test_nested_issues_carry_full_path() {
        let mut payload = singbox_payload();
        payload["outbounds"][0]["tls"]["utls"] = json!({"fingerprint": "chrome"});
        payload["inbounds"][0]["listen"] = json!("localhost");

        let errors = validate_singbox_config(&payload).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.at("outbounds[0].tls.utls.enabled").is_some());
        assert!(errors.at("inbounds[0].listen").is_some());
    }

    #[test]
    fn test_inbounds_must_not_be_empty() {
        let mut payload = singbox_payload();
        payload["inbounds"] = json!([]);

        let errors = validate_singbox_config(&payload).unwrap_err();
        assert!(errors.at("inbounds").is_some());
    }

    #[test]
    fn test_rule_set_url_must_parse() {
        let mut payload = singbox_payload();
        payload["route"]["rule_set"][0]["url"] = json!("not a url");

        let errors = validate_singbox_config(&payload).unwrap_err();
        assert!(errors.at("route.rule_set[0].url").is_some());
    }

    #[test]
    fn test_accepted_config_revalidates_unchanged() {
        let config = validate_singbox_config(&singbox_payload()).unwrap();
        let stored = serde_json::to_value(&config).unwrap();

        assert_eq!(validate_singbox_config(&stored).unwrap(), config);
        assert_eq!(
            serde_json::from_value::<tunnelconf::SingBoxConfig>(stored).unwrap(),
            config
        );
    }

    #[test]
    fn test_shadowsocks_outbound() {
        let mut payload = singbox_payload();
        payload["outbounds"] = json!([{
            "type": "shadowsocks",
            "tag": "ss",
            "server": "10.0.0.2",
            "server_port": 8388,
            "method": "2022-blake3-aes-128-gcm",
            "password": "pw",
            "multiplex": {"enabled": true, "protocol": "h2mux", "max_streams": 4}
        }]);

        let config = validate_singbox_config(&payload).unwrap();
        assert_eq!(config.enabled_protocols(), vec![Protocol::Shadowsocks]);
        assert_eq!(config.outbounds[0].tag(), "ss");
    }
}

#[cfg(test)]
mod legacy_validation_tests {
    use super::*;

    #[test]
    fn test_legacy_config_is_accepted() {
        let config = validate_tunnel_config(&legacy_payload()).unwrap();
        assert_eq!(config.local_port, 1080);
        assert_eq!(config.password, vec!["correct horse".to_string()]);
        assert_eq!(config.ssl.unwrap().sni.as_deref(), Some("vpn.example.com"));
    }

    #[test]
    fn test_accepted_config_revalidates_unchanged() {
        let config = validate_tunnel_config(&legacy_payload()).unwrap();
        let stored = serde_json::to_value(&config).unwrap();
        assert_eq!(validate_tunnel_config(&stored).unwrap(), config);
    }

    #[test]
    fn test_ssl_without_sni_is_rejected() {
        let mut payload = legacy_payload();
        payload["ssl"] = json!({"enabled": true});

        let errors = validate_tunnel_config(&payload).unwrap_err();
        let issue = errors.at("ssl.sni").unwrap();
        assert_eq!(issue.message, "sni is required when ssl is enabled");
    }

    #[test]
    fn test_port_out_of_range() {
        let mut payload = legacy_payload();
        payload["local_port"] = json!(70000);

        let errors = validate_tunnel_config(&payload).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.at("local_port").unwrap().message.contains("65535"));
    }

    #[test]
    fn test_empty_password_list() {
        let mut payload = legacy_payload();
        payload["password"] = json!([]);

        let errors = validate_tunnel_config(&payload).unwrap_err();
        assert!(errors.at("password").is_some());
    }

    #[test]
    fn test_document_detection() {
        assert!(validate_document(&legacy_payload())
            .unwrap()
            .as_legacy()
            .is_some());
        assert!(validate_document(&singbox_payload())
            .unwrap()
            .as_singbox()
            .is_some());
    }
}
