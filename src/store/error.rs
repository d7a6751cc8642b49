use thiserror::Error;

use super::index::IndexError;
use crate::validator::ValidationErrors;
use crate::vfs::VfsError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("tunnel {0} already exists, choose another name")]
    AlreadyExists(String),

    #[error("tunnel {0} is not indexed")]
    NotFound(String),

    #[error("invalid tunnel name {0:?}")]
    InvalidName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationErrors),

    #[error("tunnel {0} is running and cannot be removed")]
    InUse(String),

    #[error("storage error on {path}: {source}")]
    Io { path: String, source: VfsError },

    #[error("cannot encode configuration: {0}")]
    Serialize(String),
}

impl StoreError {
    pub fn io(path: &str, source: VfsError) -> Self {
        StoreError::Io {
            path: path.to_string(),
            source,
        }
    }
}

impl From<IndexError> for StoreError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DuplicateName(name) => StoreError::AlreadyExists(name),
            IndexError::Malformed(reason) => StoreError::Serialize(reason),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialize(err.to_string())
    }
}
