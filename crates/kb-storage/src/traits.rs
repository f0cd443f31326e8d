//! Key-value storage abstraction
//!
//! The token store persists its single credential through this trait, so tests can
//! swap the durable backend for an in-memory one.

use async_trait::async_trait;
use kb_core::{KbError, TokenBackend};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for KbError {
    fn from(err: StorageError) -> Self {
        KbError::Storage(err.to_string())
    }
}

/// String key-value storage.
///
/// Keys are plain names (no path separators, no `..`).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> TokenBackend;
}

pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.contains('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "'{}' must be a plain, non-empty name",
            key
        )));
    }
    Ok(())
}
