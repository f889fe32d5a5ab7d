//! Storage error types

use thiserror::Error;

/// Storage error type
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage access failed: {0}")]
    AccessFailed(String),

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
