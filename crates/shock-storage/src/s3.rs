use std::path::Path as FsPath;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::BufWriter;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use shock_core::S3Config;
use tokio::io::AsyncWriteExt;

use crate::keys::validate_key;
use crate::traits::{ObjectSummary, Storage, StorageBackend, StorageError, StorageResult, UploadReceipt};

/// Files up to this size are sent with a single put.
pub const SINGLE_PUT_LIMIT: u64 = 16 * 1024 * 1024;

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    backend: StorageBackend,
    single_put_limit: u64,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("backend", &self.backend)
            .finish()
    }
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// The endpoint may point at any S3-compatible provider; plain `http://`
    /// endpoints are allowed.
    pub fn new(config: &S3Config) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or_else(|| StorageError::ConfigError("S3 bucket not configured".to_string()))?;

        let mut builder = AmazonS3Builder::new()
            .with_region(config.region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref key) = config.access_key_id {
            builder = builder.with_access_key_id(key.clone());
        }
        if let Some(ref secret) = config.secret_access_key {
            builder = builder.with_secret_access_key(secret.clone());
        }
        if let Some(ref endpoint) = config.endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        tracing::debug!(
            bucket = %bucket,
            endpoint = ?config.endpoint_url,
            region = %config.region,
            "S3 storage configured"
        );

        Ok(Self::with_store(Arc::new(store), bucket, StorageBackend::S3))
    }

    /// Process-local store with the same behavior as S3.
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::with_store(Arc::new(InMemory::new()), bucket, StorageBackend::Memory)
    }

    pub fn with_store(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        backend: StorageBackend,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            backend,
            single_put_limit: SINGLE_PUT_LIMIT,
        }
    }

    pub fn with_single_put_limit(mut self, limit: u64) -> Self {
        self.single_put_limit = limit;
        self
    }

    fn attributes(metadata: &[(&str, &str)]) -> Attributes {
        let mut attributes = Attributes::new();
        for (key, value) in metadata {
            attributes.insert(
                Attribute::Metadata(key.to_string().into()),
                AttributeValue::from(value.to_string()),
            );
        }
        attributes
    }

    async fn put_single(
        &self,
        location: &Path,
        path: &FsPath,
        attributes: Attributes,
    ) -> StorageResult<Option<String>> {
        let data = tokio::fs::read(path).await?;
        let options = PutOptions {
            attributes,
            ..Default::default()
        };
        let result = self
            .store
            .put_opts(location, PutPayload::from(Bytes::from(data)), options)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;
        Ok(result.e_tag)
    }

    async fn put_buffered(
        &self,
        location: &Path,
        path: &FsPath,
        attributes: Attributes,
    ) -> StorageResult<Option<String>> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut writer =
            BufWriter::new(Arc::clone(&self.store), location.clone()).with_attributes(attributes);

        let copied = tokio::io::copy(&mut file, &mut writer).await;
        if let Err(e) = copied {
            let _ = writer.abort().await;
            return Err(StorageError::UploadFailed(e.to_string()));
        }
        writer
            .shutdown()
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        // The multipart completion response is not surfaced by the writer.
        Ok(None)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_file(
        &self,
        key: &str,
        path: &FsPath,
        metadata: &[(&str, &str)],
    ) -> StorageResult<UploadReceipt> {
        validate_key(key)?;
        let size = tokio::fs::metadata(path).await?.len();
        let location = Path::from(key.to_string());
        let attributes = Self::attributes(metadata);
        let start = std::time::Instant::now();

        let result = if size <= self.single_put_limit {
            self.put_single(&location, path, attributes).await
        } else {
            self.put_buffered(&location, path, attributes).await
        };

        let e_tag = result.inspect_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            multipart = size > self.single_put_limit,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(UploadReceipt {
            key: key.to_string(),
            size_bytes: size,
            e_tag,
        })
    }

    async fn head(&self, key: &str) -> StorageResult<ObjectSummary> {
        validate_key(key)?;
        let location = Path::from(key.to_string());
        let meta = self.store.head(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => StorageError::BackendError(other.to_string()),
        })?;

        Ok(ObjectSummary {
            key: key.to_string(),
            size: meta.size as u64,
            e_tag: meta.e_tag,
        })
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self.head(key).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        self.store.delete(&location).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::BackendError(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn backend_type(&self) -> StorageBackend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{node_object_key, MD5_METADATA_KEY};
    use object_store::GetOptions;

    fn write_file(dir: &tempfile::TempDir, name: &str, len: usize) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, vec![b'x'; len]).unwrap();
        path
    }

    #[tokio::test]
    async fn single_put_returns_etag_and_metadata() {
        let store = Arc::new(InMemory::new());
        let storage = S3Storage::with_store(store.clone(), "mgrast", StorageBackend::Memory);
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "n1.data", 1024);

        let receipt = storage
            .upload_file(&node_object_key("n1"), &path, &[(MD5_METADATA_KEY, "abc")])
            .await
            .unwrap();
        assert_eq!(receipt.key, "n1.data");
        assert_eq!(receipt.size_bytes, 1024);
        assert!(receipt.e_tag.is_some());

        let fetched = store
            .get_opts(&Path::from("n1.data"), GetOptions::default())
            .await
            .unwrap();
        assert_eq!(
            fetched
                .attributes
                .get(&Attribute::Metadata(MD5_METADATA_KEY.into()))
                .map(|v| v.as_ref()),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn large_file_goes_through_buffered_writer() {
        let storage = S3Storage::in_memory("mgrast").with_single_put_limit(16);
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "big.data", 4096);

        let receipt = storage.upload_file("big.data", &path, &[]).await.unwrap();
        assert_eq!(receipt.e_tag, None);

        let summary = storage.head("big.data").await.unwrap();
        assert_eq!(summary.size, 4096);
    }

    #[tokio::test]
    async fn head_missing_object_is_not_found() {
        let storage = S3Storage::in_memory("mgrast");
        assert!(matches!(
            storage.head("absent.data").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!storage.exists("absent.data").await.unwrap());
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let storage = S3Storage::in_memory("mgrast");
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "n2.data", 10);

        storage.upload_file("n2.data", &path, &[]).await.unwrap();
        assert!(storage.exists("n2.data").await.unwrap());
        storage.delete("n2.data").await.unwrap();
        assert!(!storage.exists("n2.data").await.unwrap());
    }

    #[tokio::test]
    async fn invalid_key_is_rejected() {
        let storage = S3Storage::in_memory("mgrast");
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "n3.data", 10);
        assert!(matches!(
            storage.upload_file("../n3.data", &path, &[]).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn missing_bucket_is_config_error() {
        let config = S3Config {
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            bucket: None,
            region: "us-east-1".into(),
        };
        assert!(matches!(
            S3Storage::new(&config),
            Err(StorageError::ConfigError(_))
        ));
    }
}
