//! Local filesystem storage for uploads and derived artifacts.

mod local;

pub use local::{LocalStorage, StoredObject, DERIVED_SUFFIX};

/// Storage operation errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage name: {0}")]
    InvalidName(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage configuration error: {0}")]
    ConfigError(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::BackendError(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
