pub mod local;
pub mod memory;

use std::future::Future;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalFs;
pub use memory::{CallCounts, MemoryFs};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl VfsError {
    /// Classify an `io::Error` raised while touching `path`
    pub fn from_io(err: io::Error, path: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound(path.to_string()),
            _ => VfsError::IoError(format!("{}: {}", path, err)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
    }
}

/// Root a relative storage path is resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseDir {
    /// The user's home directory, used on desktop platforms
    Home,
    /// Application-private storage, used on mobile platforms
    AppData,
}

/// Access to text files below a platform base directory
///
/// All paths are relative to `base`. Implementations decide where each
/// base actually lives.
pub trait FileAccess {
    fn exists(&self, path: &str, base: BaseDir) -> impl Future<Output = Result<bool, VfsError>>;
    fn mkdir(&self, path: &str, base: BaseDir) -> impl Future<Output = Result<(), VfsError>>;
    fn read_text(
        &self,
        path: &str,
        base: BaseDir,
    ) -> impl Future<Output = Result<String, VfsError>>;
    fn write_text(
        &self,
        path: &str,
        base: BaseDir,
        content: &str,
    ) -> impl Future<Output = Result<(), VfsError>>;

    /// Absolute location of `path`, if this backend is disk based
    fn resolve(&self, _path: &str, _base: BaseDir) -> Option<PathBuf> {
        None
    }
}
