//! Migration driver: copies node content to an S3 location and records it.
//!
//! Nodes are processed one at a time. Each node's content is downloaded to
//! `<work_dir>/<node-id>.data`, checked against the MD5 the service recorded,
//! pushed to the store as `<node-id>.data` with `shock-md5` metadata, checked
//! again on the remote side, and finally recorded as stored at the location.
//! A rejected token stops the batch; every other failure is confined to its
//! node.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shock_api_client::{ApiClient, DownloadOptions, LocationClient};
use shock_core::{ErrorMetadata, Node, ShockError, ShockResult};
use shock_storage::{etag_matches_md5, node_object_key, Storage, MD5_METADATA_KEY};

use crate::digest::verify_md5;
use crate::ids::validate_node_id;
use crate::report::MigrationReport;
use crate::retry::{retry, RetryPolicy};
use crate::state::{NodeOutcome, NodeState};

/// Settings of one migration run.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    /// Location id nodes are migrated to
    pub location: String,
    /// Directory holding downloaded content until it is pushed
    pub work_dir: PathBuf,
    pub retry: RetryPolicy,
    /// Stop after the skip check
    pub dry_run: bool,
}

impl MigrationSettings {
    pub fn new(location: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            work_dir: work_dir.into(),
            retry: RetryPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Local path a node's content is downloaded to.
    pub fn temp_path(&self, node_id: &str) -> PathBuf {
        self.work_dir.join(node_object_key(node_id))
    }
}

pub struct MigrationDriver {
    client: ApiClient,
    locations: LocationClient,
    storage: Arc<dyn Storage>,
    settings: MigrationSettings,
}

// A node-level failure, or an error that must stop the batch.
enum Halt {
    Node(NodeOutcome),
    Batch(ShockError),
}

impl Halt {
    fn at(stage: NodeState, error: ShockError) -> Self {
        if error.is_fatal() {
            Halt::Batch(error)
        } else {
            Halt::Node(NodeOutcome::failed(stage, error))
        }
    }
}

impl MigrationDriver {
    pub fn new(client: ApiClient, storage: Arc<dyn Storage>, settings: MigrationSettings) -> Self {
        let locations = client.locations();
        Self {
            client,
            locations,
            storage,
            settings,
        }
    }

    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Migrate every node in `node_ids`, in order.
    ///
    /// Returns `Err` only when the service rejects the credentials; the
    /// report of the nodes processed so far is logged before returning.
    pub async fn run(&self, node_ids: &[String]) -> ShockResult<MigrationReport> {
        tokio::fs::create_dir_all(&self.settings.work_dir).await?;

        let mut report = MigrationReport::new(&self.settings.location);
        tracing::info!(
            location = %self.settings.location,
            bucket = %self.storage.bucket(),
            nodes = node_ids.len(),
            dry_run = self.settings.dry_run,
            "Starting migration"
        );

        for node_id in node_ids {
            match self.migrate_node(node_id).await {
                Ok(outcome) => {
                    if let NodeOutcome::Failed { stage, error } = &outcome {
                        tracing::error!(node_id = %node_id, stage = %stage, error = %error, "Node migration failed");
                    }
                    report.push(node_id.as_str(), outcome);
                }
                Err(e) => {
                    tracing::error!(node_id = %node_id, error = %e, "Authorization rejected, aborting batch");
                    report.log_summary();
                    return Err(e);
                }
            }
        }

        report.log_summary();
        Ok(report)
    }

    /// Migrate a single node. `Err` is reserved for batch-fatal errors.
    pub async fn migrate_node(&self, node_id: &str) -> ShockResult<NodeOutcome> {
        match self.migrate_inner(node_id).await {
            Ok(outcome) => Ok(outcome),
            Err(Halt::Node(outcome)) => Ok(outcome),
            Err(Halt::Batch(e)) => Err(e),
        }
    }

    async fn migrate_inner(&self, node_id: &str) -> Result<NodeOutcome, Halt> {
        let location = self.settings.location.as_str();
        let policy = &self.settings.retry;

        validate_node_id(node_id)
            .map_err(|e| Halt::Node(NodeOutcome::failed(NodeState::Discovered, e)))?;

        let node = retry(policy, "get node", |_| self.client.get_node(node_id))
            .await
            .map_err(|e| Halt::at(NodeState::Discovered, e))?;

        if node.has_location(location) {
            tracing::info!(node_id = %node_id, location = %location, "Node already at location, skipping");
            return Ok(NodeOutcome::Skipped);
        }

        if self.settings.dry_run {
            tracing::info!(
                node_id = %node_id,
                location = %location,
                size_bytes = node.file.size,
                "Node would be migrated"
            );
            return Ok(NodeOutcome::Pending);
        }

        let md5 = node.md5().map(str::to_string).ok_or_else(|| {
            Halt::Node(NodeOutcome::failed(
                NodeState::Fetching,
                "node has no recorded MD5",
            ))
        })?;

        let path = self.fetch(&node, &md5).await?;
        self.push(&node, &md5, &path).await?;

        if let Err(e) = tokio::fs::remove_file(&path).await {
            tracing::warn!(node_id = %node_id, path = %path.display(), error = %e, "Failed to remove temp file");
        }

        match self.locations.set_node_location(node_id, location).await {
            Ok(_) => {
                tracing::info!(node_id = %node_id, location = %location, "Node migrated");
                Ok(NodeOutcome::Recorded)
            }
            Err(e) if e.is_fatal() => Err(Halt::Batch(e)),
            Err(e) => {
                tracing::error!(
                    node_id = %node_id,
                    location = %location,
                    error = %e,
                    "Content stored but location not recorded"
                );
                Ok(NodeOutcome::RecordFailed {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Download and verify; a final checksum mismatch removes the file.
    async fn fetch(&self, node: &Node, md5: &str) -> Result<PathBuf, Halt> {
        let path = self.settings.temp_path(&node.id);
        let options = DownloadOptions::default();

        let result = retry(&self.settings.retry, "download", |attempt| {
            let path = path.clone();
            let options = options.clone();
            async move {
                tracing::info!(node_id = %node.id, attempt, "Downloading node content");
                self.client
                    .download_to_path(&node.id, &path, &options)
                    .await?;
                verify_md5(&path, md5).await
            }
        })
        .await;

        match result {
            Ok(_) => Ok(path),
            Err(e @ ShockError::ChecksumMismatch { .. }) => {
                remove_quietly(&path).await;
                Err(Halt::Node(NodeOutcome::failed(NodeState::VerifiedLocal, e)))
            }
            Err(e) => Err(Halt::at(NodeState::Fetching, e)),
        }
    }

    /// Upload and confirm the remote copy.
    async fn push(&self, node: &Node, md5: &str, path: &Path) -> Result<(), Halt> {
        let key = node_object_key(&node.id);
        let receipt = self
            .storage
            .upload_file(&key, path, &[(MD5_METADATA_KEY, md5)])
            .await
            .map_err(|e| Halt::Node(NodeOutcome::failed(NodeState::Uploading, e)))?;

        if etag_matches_md5(receipt.e_tag.as_deref(), md5) {
            tracing::debug!(node_id = %node.id, key = %key, "Upload acknowledged with matching ETag");
            return Ok(());
        }

        let summary = self
            .storage
            .head(&key)
            .await
            .map_err(|e| Halt::Node(NodeOutcome::failed(NodeState::VerifiedRemote, e)))?;

        let etag_ok = etag_matches_md5(summary.e_tag.as_deref(), md5);
        let size_ok = summary.size == node.file.size;
        if etag_ok || size_ok {
            tracing::debug!(node_id = %node.id, key = %key, etag_ok, size_ok, "Remote copy verified");
            return Ok(());
        }

        Err(Halt::Node(NodeOutcome::failed(
            NodeState::VerifiedRemote,
            format!(
                "remote object does not match: etag {:?}, size {} (expected md5 {}, size {})",
                summary.e_tag, summary.size, md5, node.file.size
            ),
        )))
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::{json, Value};
    use shock_api_client::Transport;
    use shock_core::{AuthToken, ShockConfig, TransportPreference};
    use shock_storage::{ObjectSummary, S3Storage, StorageBackend, StorageError, StorageResult, UploadReceipt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const LOCATION: &str = "anls3_mgrast";
    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    fn envelope(data: Value) -> String {
        json!({"status": 200, "data": data, "error": null}).to_string()
    }

    fn node(id: &str, md5: &str, locations: Value) -> String {
        envelope(json!({
            "id": id,
            "file": {"name": "reads.fastq", "size": 5, "checksum": {"md5": md5}},
            "attributes": {"owner": "mgu1"},
            "locations": locations
        }))
    }

    fn driver(server: &ServerGuard, storage: Arc<dyn Storage>, work_dir: &Path) -> MigrationDriver {
        let config = ShockConfig::new(server.url())
            .with_token(Some("test-token"))
            .with_transport(TransportPreference::Http);
        let settings = MigrationSettings::new(LOCATION, work_dir)
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
        MigrationDriver::new(ApiClient::new(&config).unwrap(), storage, settings)
    }

    async fn mock_node(server: &mut ServerGuard, id: &str, md5: &str, locations: Value) {
        server
            .mock("GET", format!("/node/{}", id).as_str())
            .with_status(200)
            .with_body(node(id, md5, locations))
            .create_async()
            .await;
    }

    async fn mock_download(server: &mut ServerGuard, id: &str, body: &str, hits: usize) -> mockito::Mock {
        server
            .mock("GET", format!("/node/{}?download", id).as_str())
            .with_status(200)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    async fn mock_record(server: &mut ServerGuard, id: &str, status: usize) -> mockito::Mock {
        let body = if status == 200 {
            envelope(json!([{"id": LOCATION, "stored": true}]))
        } else {
            json!({"status": status, "data": null, "error": ["location write failed"]}).to_string()
        };
        server
            .mock("POST", format!("/node/{}/locations", id).as_str())
            .match_body(Matcher::Json(json!({"id": LOCATION, "stored": true})))
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    /// Store that accepts uploads but reports an object that matches nothing.
    struct MismatchedStorage;

    #[async_trait]
    impl Storage for MismatchedStorage {
        async fn upload_file(&self, key: &str, _path: &Path, _metadata: &[(&str, &str)]) -> StorageResult<UploadReceipt> {
            Ok(UploadReceipt {
                key: key.to_string(),
                size_bytes: 5,
                e_tag: None,
            })
        }

        async fn head(&self, key: &str) -> StorageResult<ObjectSummary> {
            Ok(ObjectSummary {
                key: key.to_string(),
                size: 1,
                e_tag: Some("\"deadbeef-2\"".into()),
            })
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(true)
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn bucket(&self) -> &str {
            "mismatched"
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    /// Store that acknowledges uploads with the content MD5 and fails heads.
    struct AcknowledgingStorage;

    #[async_trait]
    impl Storage for AcknowledgingStorage {
        async fn upload_file(&self, key: &str, _path: &Path, metadata: &[(&str, &str)]) -> StorageResult<UploadReceipt> {
            Ok(UploadReceipt {
                key: key.to_string(),
                size_bytes: 5,
                e_tag: metadata.first().map(|(_, md5)| format!("\"{}\"", md5.to_uppercase())),
            })
        }

        async fn head(&self, key: &str) -> StorageResult<ObjectSummary> {
            Err(StorageError::BackendError(format!("unexpected head of {}", key)))
        }

        async fn exists(&self, _key: &str) -> StorageResult<bool> {
            Ok(true)
        }

        async fn delete(&self, _key: &str) -> StorageResult<()> {
            Ok(())
        }

        fn bucket(&self) -> &str {
            "acknowledging"
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    /// Transport whose first downloads drop the connection.
    struct FlakyTransport {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for FlakyTransport {
        fn kind(&self) -> shock_api_client::TransportKind {
            shock_api_client::TransportKind::Http
        }

        async fn set_auth(&self, _auth: &AuthToken) -> ShockResult<()> {
            Ok(())
        }

        async fn upload_path(&self, path: &Path) -> ShockResult<Node> {
            Err(ShockError::InvalidInput(format!("unexpected upload of {}", path.display())))
        }

        async fn download_to_path(
            &self,
            _node_id: &str,
            path: &Path,
            _options: &DownloadOptions,
        ) -> ShockResult<PathBuf> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(ShockError::transport("http://shock", "connection reset"));
            }
            tokio::fs::write(path, b"hello").await?;
            Ok(path.to_path_buf())
        }
    }

    /// In-memory store that counts uploads.
    struct CountingStorage {
        inner: S3Storage,
        uploads: AtomicUsize,
    }

    #[async_trait]
    impl Storage for CountingStorage {
        async fn upload_file(&self, key: &str, path: &Path, metadata: &[(&str, &str)]) -> StorageResult<UploadReceipt> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.inner.upload_file(key, path, metadata).await
        }

        async fn head(&self, key: &str) -> StorageResult<ObjectSummary> {
            self.inner.head(key).await
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.inner.delete(key).await
        }

        fn bucket(&self) -> &str {
            self.inner.bucket()
        }

        fn backend_type(&self) -> StorageBackend {
            StorageBackend::Memory
        }
    }

    #[tokio::test]
    async fn node_is_copied_verified_and_recorded() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        let download = mock_download(&mut server, "n1", "hello", 1).await;
        let record = mock_record(&mut server, "n1", 200).await;

        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(S3Storage::in_memory("mgrast"));
        let driver = driver(&server, storage.clone(), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();

        assert_eq!(report.outcome("n1"), Some(&NodeOutcome::Recorded));
        assert_eq!(storage.head("n1.data").await.unwrap().size, 5);
        assert!(!dir.path().join("n1.data").exists());
        download.assert_async().await;
        record.assert_async().await;
    }

    #[tokio::test]
    async fn already_migrated_node_is_skipped() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, json!([{"id": LOCATION, "stored": true}])).await;
        let download = mock_download(&mut server, "n1", "hello", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(S3Storage::in_memory("mgrast"));
        let driver = driver(&server, storage.clone(), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.skipped(), 1);
        assert!(!storage.exists("n1.data").await.unwrap());
        download.assert_async().await;
    }

    #[tokio::test]
    async fn checksum_exhaustion_fails_and_removes_file() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", "00000000000000000000000000000000", Value::Null).await;
        let download = mock_download(&mut server, "n1", "hello", 3).await;

        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(S3Storage::in_memory("mgrast"));
        let driver = driver(&server, storage.clone(), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        match report.outcome("n1") {
            Some(NodeOutcome::Failed { stage, .. }) => assert_eq!(*stage, NodeState::VerifiedLocal),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!dir.path().join("n1.data").exists());
        assert!(!storage.exists("n1.data").await.unwrap());
        download.assert_async().await;
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/node/gone")
            .with_status(404)
            .with_body(json!({"status": 404, "data": null, "error": ["Node not found"]}).to_string())
            .expect(1)
            .create_async()
            .await;
        mock_node(&mut server, "n2", HELLO_MD5, Value::Null).await;
        mock_download(&mut server, "n2", "hello", 1).await;
        mock_record(&mut server, "n2", 200).await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let report = driver
            .run(&["gone".to_string(), "n2".to_string()])
            .await
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.recorded(), 1);
        assert!(matches!(
            report.outcome("gone"),
            Some(NodeOutcome::Failed { stage: NodeState::Discovered, .. })
        ));
    }

    #[tokio::test]
    async fn rejected_token_aborts_batch() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/node/n1")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/node/n2")
            .with_status(200)
            .with_body(node("n2", HELLO_MD5, Value::Null))
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let result = driver.run(&["n1".to_string(), "n2".to_string()]).await;
        assert!(matches!(result, Err(ShockError::Auth(_))));
        second.assert_async().await;
    }

    #[tokio::test]
    async fn failed_record_keeps_upload_and_reports() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        mock_download(&mut server, "n1", "hello", 1).await;
        let record = mock_record(&mut server, "n1", 500).await;

        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(S3Storage::in_memory("mgrast"));
        let driver = driver(&server, storage.clone(), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.record_failed(), 1);
        assert!(storage.exists("n1.data").await.unwrap());
        assert!(!dir.path().join("n1.data").exists());
        record.assert_async().await;
    }

    #[tokio::test]
    async fn unverifiable_remote_copy_fails_and_keeps_file() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        mock_download(&mut server, "n1", "hello", 1).await;
        let record = server
            .mock("POST", "/node/n1/locations")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(MismatchedStorage), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert!(matches!(
            report.outcome("n1"),
            Some(NodeOutcome::Failed { stage: NodeState::VerifiedRemote, .. })
        ));
        assert!(dir.path().join("n1.data").exists());
        record.assert_async().await;
    }

    #[tokio::test]
    async fn matching_put_etag_skips_head() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        mock_download(&mut server, "n1", "hello", 1).await;
        mock_record(&mut server, "n1", 200).await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(AcknowledgingStorage), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.recorded(), 1);
    }

    #[tokio::test]
    async fn node_without_md5_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/node/n1")
            .with_status(200)
            .with_body(envelope(json!({"id": "n1", "file": {"size": 5}, "locations": null})))
            .create_async()
            .await;
        let download = mock_download(&mut server, "n1", "hello", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.failed(), 1);
        download.assert_async().await;
    }

    #[tokio::test]
    async fn dry_run_stops_after_skip_check() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        let download = mock_download(&mut server, "n1", "hello", 0).await;

        let dir = tempfile::tempdir().unwrap();
        let config = ShockConfig::new(server.url()).with_transport(TransportPreference::Http);
        let settings = MigrationSettings::new(LOCATION, dir.path()).with_dry_run(true);
        let driver = MigrationDriver::new(
            ApiClient::new(&config).unwrap(),
            Arc::new(S3Storage::in_memory("mgrast")),
            settings,
        );

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.pending(), 1);
        download.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_token_on_download_aborts_batch() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        let download = server
            .mock("GET", "/node/n1?download")
            .with_status(401)
            .with_body(json!({"status": 401, "data": null, "error": ["Invalid authorization header"]}).to_string())
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/node/n2")
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let result = driver.run(&["n1".to_string(), "n2".to_string()]).await;
        assert!(matches!(result, Err(ShockError::Auth(_))));
        download.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn missing_content_is_not_retried() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        let download = server
            .mock("GET", "/node/n1?download")
            .with_status(404)
            .with_body(json!({"status": 404, "data": null, "error": ["Node not found"]}).to_string())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert!(matches!(
            report.outcome("n1"),
            Some(NodeOutcome::Failed { stage: NodeState::Fetching, .. })
        ));
        download.assert_async().await;
    }

    #[tokio::test]
    async fn transient_download_failure_is_retried_to_success() {
        let mut server = Server::new_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, Value::Null).await;
        let record = mock_record(&mut server, "n1", 200).await;

        let config = ShockConfig::new(server.url())
            .with_token(Some("test-token"))
            .with_transport(TransportPreference::Http);
        let transport = Arc::new(FlakyTransport {
            failures: 2,
            calls: AtomicUsize::new(0),
        });
        let client = ApiClient::with_transport(&config, transport.clone()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let settings = MigrationSettings::new(LOCATION, dir.path())
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1)));
        let driver = MigrationDriver::new(client, Arc::new(S3Storage::in_memory("mgrast")), settings);

        let report = driver.run(&["n1".to_string()]).await.unwrap();
        assert_eq!(report.outcome("n1"), Some(&NodeOutcome::Recorded));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        record.assert_async().await;
    }

    #[tokio::test]
    async fn second_run_over_migrated_nodes_is_a_no_op() {
        let mut server = Server::new_async().await;
        let before = server
            .mock("GET", "/node/n1")
            .with_status(200)
            .with_body(node("n1", HELLO_MD5, Value::Null))
            .create_async()
            .await;
        let download = mock_download(&mut server, "n1", "hello", 1).await;
        let record = mock_record(&mut server, "n1", 200).await;

        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(CountingStorage {
            inner: S3Storage::in_memory("mgrast"),
            uploads: AtomicUsize::new(0),
        });
        let driver = driver(&server, storage.clone(), dir.path());
        let ids = ["n1".to_string()];

        let first = driver.run(&ids).await.unwrap();
        assert_eq!(first.recorded(), 1);

        before.remove_async().await;
        mock_node(&mut server, "n1", HELLO_MD5, json!([{"id": LOCATION, "stored": true}])).await;

        let second = driver.run(&ids).await.unwrap();
        assert_eq!(second.skipped(), 1);
        assert_eq!(storage.uploads.load(Ordering::SeqCst), 1);
        download.assert_async().await;
        record.assert_async().await;
    }

    #[tokio::test]
    async fn path_like_node_id_fails_before_any_request() {
        let mut server = Server::new_async().await;
        let any = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let driver = driver(&server, Arc::new(S3Storage::in_memory("mgrast")), dir.path());

        let report = driver.run(&["../x".to_string()]).await.unwrap();
        assert!(matches!(
            report.outcome("../x"),
            Some(NodeOutcome::Failed { stage: NodeState::Discovered, .. })
        ));
        any.assert_async().await;
    }

    #[test]
    fn temp_path_uses_node_id() {
        let settings = MigrationSettings::new(LOCATION, "/tmp/work");
        assert_eq!(settings.temp_path("n1"), PathBuf::from("/tmp/work/n1.data"));
    }
}
