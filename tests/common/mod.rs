#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use serde_json::{json, Value};
use tunnelconf::models::TrojanStatus;
use tunnelconf::process::{ProcessControl, ProcessError};

/// Proxy process stand-in that reports a fixed status and records calls
#[derive(Debug, Default)]
pub struct RecordingProcess {
    pub status: RefCell<TrojanStatus>,
    pub fail_status: Cell<bool>,
    pub stops: Cell<usize>,
    pub status_queries: Cell<usize>,
}

impl RecordingProcess {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn running(name: &str) -> Self {
        let process = Self::default();
        *process.status.borrow_mut() = TrojanStatus::running(name);
        process
    }

    pub fn unreachable() -> Self {
        let process = Self::default();
        process.fail_status.set(true);
        process
    }
}

impl ProcessControl for RecordingProcess {
    async fn status(&self) -> Result<TrojanStatus, ProcessError> {
        self.status_queries.set(self.status_queries.get() + 1);
        if self.fail_status.get() {
            return Err(ProcessError::Unavailable("ipc closed".into()));
        }
        Ok(self.status.borrow().clone())
    }

    async fn stop(&self) -> Result<(), ProcessError> {
        self.stops.set(self.stops.get() + 1);
        *self.status.borrow_mut() = TrojanStatus::default();
        Ok(())
    }

    async fn run(&self, name: &str, _config_path: &str) -> Result<(), ProcessError> {
        *self.status.borrow_mut() = TrojanStatus::running(name);
        Ok(())
    }
}

pub fn trojan_outbound() -> Value {
    json!({
        "type": "trojan",
        "tag": "proxy",
        "server": "vpn.example.com",
        "server_port": 443,
        "password": "correct horse",
        "tls": {
            "enabled": true,
            "server_name": "vpn.example.com",
            "utls": {"enabled": true, "fingerprint": "chrome"}
        }
    })
}

pub fn singbox_payload() -> Value {
    json!({
        "log": {"level": "info", "timestamp": true},
        "dns": {
            "servers": [{"tag": "remote", "address": "tls://8.8.8.8"}],
            "rules": [],
            "final": "remote",
            "strategy": "prefer_ipv4"
        },
        "inbounds": [{
            "type": "mixed",
            "tag": "mixed-in",
            "listen": "127.0.0.1",
            "listen_port": 2080
        }],
        "outbounds": [
            trojan_outbound(),
            {"type": "direct", "tag": "direct"}
        ],
        "route": {
            "rules": [],
            "rule_set": [{
                "type": "remote",
                "tag": "geosite-cn",
                "format": "binary",
                "url": "https://example.com/rules/geosite-cn.srs",
                "download_detour": "proxy"
            }],
            "final": "proxy",
            "auto_detect_interface": true
        }
    })
}

pub fn legacy_payload() -> Value {
    json!({
        "run_type": "client",
        "local_addr": "127.0.0.1",
        "local_port": 1080,
        "remote_addr": "vpn.example.com",
        "remote_port": 443,
        "password": ["correct horse"],
        "ssl": {"enabled": true, "sni": "vpn.example.com"}
    })
}
