use std::io;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    APP_IDENTIFIER, CONF_DIR, INDEX_FILE, SYSTEM_CONFIG_FILE, TUNNEL_FILE_EXT, USER_DIR,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

// Default value functions for serde
fn default_user_dir() -> String {
    USER_DIR.to_string()
}

fn default_conf_dir() -> String {
    CONF_DIR.to_string()
}

fn default_index_file() -> String {
    INDEX_FILE.to_string()
}

fn default_system_file() -> String {
    SYSTEM_CONFIG_FILE.to_string()
}

fn default_app_identifier() -> String {
    APP_IDENTIFIER.to_string()
}

/// Storage layout of the configuration store
///
/// Every path is relative to the platform base directory. `conf_dir` must
/// live inside `user_dir`, which is created first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_user_dir")]
    pub user_dir: String,
    #[serde(default = "default_conf_dir")]
    pub conf_dir: String,
    #[serde(default = "default_index_file")]
    pub index_file: String,
    #[serde(default = "default_system_file")]
    pub system_file: String,
    /// Names the app-private data directory on disk
    #[serde(default = "default_app_identifier")]
    pub app_identifier: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            user_dir: default_user_dir(),
            conf_dir: default_conf_dir(),
            index_file: default_index_file(),
            system_file: default_system_file(),
            app_identifier: default_app_identifier(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    storage: Option<StoreSettings>,
}

impl StoreSettings {
    /// Parse settings from TOML text; the `[storage]` table is optional
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile = toml::from_str(content)?;
        let settings = file.storage.unwrap_or_default();
        settings.check()?;
        Ok(settings)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        debug!("Loading store settings from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn check(&self) -> Result<(), SettingsError> {
        for (key, value) in [
            ("user_dir", &self.user_dir),
            ("conf_dir", &self.conf_dir),
            ("index_file", &self.index_file),
            ("system_file", &self.system_file),
            ("app_identifier", &self.app_identifier),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::Invalid(format!("{} must not be empty", key)));
            }
        }
        if !self
            .conf_dir
            .starts_with(&format!("{}/", self.user_dir.trim_end_matches('/')))
        {
            return Err(SettingsError::Invalid(format!(
                "conf_dir {} is not inside user_dir {}",
                self.conf_dir, self.user_dir
            )));
        }
        Ok(())
    }

    /// Relative body path of tunnel `name`
    pub fn tunnel_path(&self, name: &str) -> String {
        format!(
            "{}/{}.{}",
            self.conf_dir.trim_end_matches('/'),
            name,
            TUNNEL_FILE_EXT
        )
    }
}
