use serde::{Deserialize, Serialize};

/// Application-level switches, stored apart from the tunnel index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConfig {
    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,
}

// Default value functions for serde
pub fn default_auto_update() -> bool {
    true
}

pub fn default_auto_start() -> bool {
    true
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            auto_update: default_auto_update(),
            auto_start: default_auto_start(),
        }
    }
}
