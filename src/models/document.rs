use serde::{Deserialize, Serialize};

use super::{SingBoxConfig, TunnelConfig};

/// Typed content of a tunnel body file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TunnelDocument {
    SingBox(SingBoxConfig),
    Legacy(TunnelConfig),
}

impl TunnelDocument {
    pub fn as_singbox(&self) -> Option<&SingBoxConfig> {
        match self {
            TunnelDocument::SingBox(config) => Some(config),
            TunnelDocument::Legacy(_) => None,
        }
    }

    pub fn as_legacy(&self) -> Option<&TunnelConfig> {
        match self {
            TunnelDocument::Legacy(config) => Some(config),
            TunnelDocument::SingBox(_) => None,
        }
    }

    /// Port the engine listens on for client traffic
    pub fn local_port(&self) -> Option<u16> {
        match self {
            TunnelDocument::SingBox(config) => config.local_port(),
            TunnelDocument::Legacy(config) => Some(config.local_port),
        }
    }
}

impl From<SingBoxConfig> for TunnelDocument {
    fn from(config: SingBoxConfig) -> Self {
        TunnelDocument::SingBox(config)
    }
}

impl From<TunnelConfig> for TunnelDocument {
    fn from(config: TunnelConfig) -> Self {
        TunnelDocument::Legacy(config)
    }
}
