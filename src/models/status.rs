use serde::{Deserialize, Serialize};

/// Runtime state reported by the proxy process
///
/// The default value is what an unreachable process reports: nothing
/// running, system proxy off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrojanStatus {
    pub is_running: bool,
    /// Name of the tunnel the process was started with
    pub name: Option<String>,
    /// Whether the system proxy currently points at the process
    pub proxy_status: bool,
}

impl TrojanStatus {
    pub fn running(name: &str) -> Self {
        Self {
            is_running: true,
            name: Some(name.to_string()),
            proxy_status: true,
        }
    }
}
