//! Storage abstraction trait
//!
//! This module defines the `ObjectStore` trait the pipeline drives. Backends
//! report failures through the raw `StorageError` layer; classification into
//! the closed pipeline taxonomy happens on the orchestrator side.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable object store abstraction.
///
/// Keys follow the layout produced by the [`keys`](crate::keys) module:
/// `avatars/{user_id}/{session_id}/{kind}.{ext}`. Two sessions for the same
/// user never collide, and everything a session wrote is enumerable (and
/// deletable) by its `avatars/{user_id}/{session_id}/` prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object and return its publicly accessible URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all object keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
