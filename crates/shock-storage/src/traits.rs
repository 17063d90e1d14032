//! Storage abstraction trait
//!
//! This module defines the Storage trait the migration driver pushes node
//! content through.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
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

/// Kind of backend behind a [`Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    /// Process-local store, used for dry runs and tests
    Memory,
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(StorageError::ConfigError(format!(
                "Invalid storage backend: {}",
                s
            ))),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// What the store acknowledged for a finished upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub key: String,
    pub size_bytes: u64,
    /// ETag returned by a single put; multipart uploads report none.
    pub e_tag: Option<String>,
}

/// Result of a metadata lookup on a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub e_tag: Option<String>,
}

/// Strip surrounding quotes and lowercase an ETag for comparison.
pub fn normalize_etag(e_tag: &str) -> String {
    e_tag.trim().trim_matches('"').to_ascii_lowercase()
}

/// Whether an ETag denotes the given MD5 hex digest.
pub fn etag_matches_md5(e_tag: Option<&str>, md5: &str) -> bool {
    e_tag.is_some_and(|tag| normalize_etag(tag) == md5.trim().to_ascii_lowercase())
}

/// Storage abstraction trait
///
/// Keys are flat object names inside the backend's bucket; see [`crate::keys`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload a local file under `key`, attaching `metadata` as user metadata.
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        metadata: &[(&str, &str)],
    ) -> StorageResult<UploadReceipt>;

    /// Size and ETag of a stored object
    async fn head(&self, key: &str) -> StorageResult<ObjectSummary>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete an object
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Name of the bucket objects are written to
    fn bucket(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
