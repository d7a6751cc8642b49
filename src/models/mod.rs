//! Typed configuration models
//!
//! These are the shapes a payload takes once the validator has accepted
//! it. Field names follow the on-disk JSON exactly, so a model serializes
//! back to the document it was read from (minus unknown keys).
//!
//! # Usage
//!
//! ```rust
//! use tunnelconf::models::{SystemConfig, TunnelDocument};
//!
//! let system = SystemConfig::default();
//! assert!(system.auto_start);
//!
//! let doc: Option<TunnelDocument> = None;
//! assert!(doc.and_then(|d| d.local_port()).is_none());
//! ```

mod document;
mod singbox_config;
mod status;
mod system_config;
mod tunnel_config;

pub use document::TunnelDocument;
pub use singbox_config::*;
pub use status::TrojanStatus;
pub use system_config::SystemConfig;
pub use tunnel_config::*;
