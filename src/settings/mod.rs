//! Settings module for the configuration store
//!
//! This module contains the storage layout and its loaders

pub mod store_settings;

// Re-export settings struct and error
pub use store_settings::{SettingsError, StoreSettings};
