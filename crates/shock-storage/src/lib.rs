//! Shock Storage Library
//!
//! This crate provides the storage abstraction the migration driver pushes
//! node content through, and its object_store-backed implementation for
//! S3-compatible endpoints.
//!
//! # Object key format
//!
//! A node's content is stored as `{node_id}.data` at the root of the bucket,
//! with user metadata `shock-md5` set to the node's MD5. Key generation lives
//! in the `keys` module so every caller uses the same layout.

pub mod factory;
pub mod keys;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{node_object_key, MD5_METADATA_KEY};
pub use s3::{S3Storage, SINGLE_PUT_LIMIT};
pub use traits::{
    etag_matches_md5, normalize_etag, ObjectSummary, Storage, StorageBackend, StorageError,
    StorageResult, UploadReceipt,
};
