//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob store backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use fentity_core::AppError;
use futures::Stream;
use std::pin::Pin;
use std::time::Instant;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Chunked content stream returned by [`Storage::read_stream`]
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Blob {} not found", key)),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Blob store abstraction
///
/// Every backend addresses content by a relative key (the record's locator).
/// Callers never see partially written content: `write` and `copy` must
/// replace the destination in a single step.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` at `key`, replacing any existing content
    async fn write(&self, key: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Read the full content stored at `key`
    async fn read(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Read content as a stream of chunks (for large files)
    async fn read_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Remove content at `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Copy content from `from_key` onto `to_key`, overwriting it.
    ///
    /// Readers of `to_key` observe either the old or the new content, never a
    /// mix. On error the destination is left as it was.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// `copy` that gives up with [`StorageError::Timeout`] once `deadline`
    /// passes, leaving the destination as it was.
    ///
    /// The default drops the `copy` future at the deadline, which is only
    /// sound for backends whose copy completes in a single step. Backends that
    /// hand work to blocking threads override this so that no work outlives
    /// the call.
    async fn copy_within(
        &self,
        from_key: &str,
        to_key: &str,
        deadline: Instant,
    ) -> StorageResult<()> {
        let deadline = tokio::time::Instant::from_std(deadline);
        match tokio::time::timeout_at(deadline, self.copy(from_key, to_key)).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout(format!(
                "copy of {} to {} did not finish in time",
                from_key, to_key
            ))),
        }
    }

    /// Remove every key below `prefix/`. Missing prefixes are not an error.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// Check if content exists at `key`
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Size in bytes of the content at `key`
    async fn content_length(&self, key: &str) -> StorageResult<u64>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Reject keys that could escape the store or name a directory
pub(crate) fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key.ends_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key {} names a directory",
            key
        )));
    }
    Ok(())
}
