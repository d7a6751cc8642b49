use std::path::{Path, PathBuf};

use log::debug;

use super::{BaseDir, FileAccess, VfsError};

/// Disk-backed file access rooted at the home and app-data directories
#[derive(Debug, Clone)]
pub struct LocalFs {
    home: PathBuf,
    app_data: PathBuf,
}

impl LocalFs {
    pub fn new(home: impl Into<PathBuf>, app_data: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            app_data: app_data.into(),
        }
    }

    /// Build from the user directories of the running process
    ///
    /// App data lives in `<data dir>/<app_id>`.
    pub fn from_env(app_id: &str) -> Result<Self, VfsError> {
        let home = dirs::home_dir()
            .ok_or_else(|| VfsError::ConfigError("Cannot resolve home directory".into()))?;
        let app_data = dirs::data_dir()
            .map(|dir| dir.join(app_id))
            .ok_or_else(|| {
                VfsError::ConfigError(format!("Cannot resolve data directory for {}", app_id))
            })?;
        debug!(
            "Local storage rooted at {} and {}",
            home.display(),
            app_data.display()
        );
        Ok(Self::new(home, app_data))
    }

    pub fn root(&self, base: BaseDir) -> &Path {
        match base {
            BaseDir::Home => &self.home,
            BaseDir::AppData => &self.app_data,
        }
    }

    fn full_path(&self, path: &str, base: BaseDir) -> PathBuf {
        self.root(base).join(path.trim_start_matches('/'))
    }
}

impl FileAccess for LocalFs {
    async fn exists(&self, path: &str, base: BaseDir) -> Result<bool, VfsError> {
        tokio::fs::try_exists(self.full_path(path, base))
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    async fn mkdir(&self, path: &str, base: BaseDir) -> Result<(), VfsError> {
        let full = self.full_path(path, base);
        debug!("Creating directory {}", full.display());
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    async fn read_text(&self, path: &str, base: BaseDir) -> Result<String, VfsError> {
        tokio::fs::read_to_string(self.full_path(path, base))
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    async fn write_text(&self, path: &str, base: BaseDir, content: &str) -> Result<(), VfsError> {
        tokio::fs::write(self.full_path(path, base), content)
            .await
            .map_err(|e| VfsError::from_io(e, path))
    }

    fn resolve(&self, path: &str, base: BaseDir) -> Option<PathBuf> {
        Some(self.full_path(path, base))
    }
}
