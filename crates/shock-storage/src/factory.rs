use std::sync::Arc;

use shock_core::S3Config;

use crate::{S3Storage, Storage, StorageBackend, StorageError, StorageResult};

/// Create a storage backend of the given kind.
///
/// The S3 backend requires a bucket and credentials; the memory backend
/// ignores credentials and keeps objects for the life of the process.
pub fn create_storage(
    backend: StorageBackend,
    config: &S3Config,
) -> StorageResult<Arc<dyn Storage>> {
    match backend {
        StorageBackend::S3 => {
            config
                .validate()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            Ok(Arc::new(S3Storage::new(config)?))
        }
        StorageBackend::Memory => {
            let bucket = config.bucket.clone().unwrap_or_else(|| "memory".to_string());
            Ok(Arc::new(S3Storage::in_memory(bucket)))
        }
    }
}
