//! Upload and download transports.
//!
//! [`HttpTransport`] talks to the service directly. [`ExternalToolTransport`]
//! shells out to the `shock-client` helper for parallel transfers and falls
//! back to HTTP for anything the helper cannot express.

use std::ffi::OsStr;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::multipart::Form;
use reqwest::Method;
use shock_core::{AuthToken, Compression, Node, ShockError, ShockResult, TransportPreference};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::io::StreamReader;

use crate::payload::UploadFile;
use crate::{log_error, status_error, HttpCore};

/// Name of the external helper looked up on `PATH`.
pub const EXTERNAL_TOOL: &str = "shock-client";
/// Status reported when the external helper exits unsuccessfully.
pub const TOOL_FAILURE_STATUS: u16 = 502;

const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;
const TOOL_THREADS: &str = "-threads=4";
const PROGRESS_MARKER: &str = "Uploading";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    External,
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TransportKind::Http => write!(f, "http"),
            TransportKind::External => write!(f, "shock-client"),
        }
    }
}

/// Query options of `GET /node/{id}?download`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadOptions {
    pub compression: Option<Compression>,
    /// Index name and part list, e.g. `("chunkrecord", "1-3")`
    pub index: Option<(String, String)>,
}

impl DownloadOptions {
    pub fn is_plain(&self) -> bool {
        self.compression.is_none() && self.index.is_none()
    }

    pub fn query(&self) -> String {
        let mut query = String::from("download");
        if let Some(compression) = self.compression {
            query.push_str(&format!("&compression={}", compression));
        }
        if let Some((index, part)) = &self.index {
            query.push_str(&format!(
                "&index={}&part={}",
                urlencoding::encode(index),
                urlencoding::encode(part)
            ));
        }
        query
    }
}

/// Moves file content between the local machine and the service.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Register credentials with the transport.
    async fn set_auth(&self, auth: &AuthToken) -> ShockResult<()>;

    /// Create a node from a file on disk.
    async fn upload_path(&self, path: &Path) -> ShockResult<Node>;

    /// Write a node's content to `path` and return that path.
    async fn download_to_path(
        &self,
        node_id: &str,
        path: &Path,
        options: &DownloadOptions,
    ) -> ShockResult<PathBuf>;
}

/// Pick a transport for the given preference.
pub fn select(preference: TransportPreference, http: HttpCore) -> ShockResult<Arc<dyn Transport>> {
    let http = HttpTransport::new(http);
    match preference {
        TransportPreference::Http => Ok(Arc::new(http)),
        TransportPreference::External => {
            let program = find_on_path(EXTERNAL_TOOL).ok_or_else(|| {
                ShockError::InvalidInput(format!("{} not found on PATH", EXTERNAL_TOOL))
            })?;
            Ok(Arc::new(ExternalToolTransport::new(program, http)))
        }
        TransportPreference::Auto => match find_on_path(EXTERNAL_TOOL) {
            Some(program) => Ok(Arc::new(ExternalToolTransport::new(program, http))),
            None => Ok(Arc::new(http)),
        },
    }
}

/// Locate an executable in the directories listed by `PATH`.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: HttpCore,
}

impl HttpTransport {
    pub fn new(http: HttpCore) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    async fn set_auth(&self, _auth: &AuthToken) -> ShockResult<()> {
        // The header is attached to every request by HttpCore.
        Ok(())
    }

    async fn upload_path(&self, path: &Path) -> ShockResult<Node> {
        let part = UploadFile::new(path).into_part().await?;
        let form = Form::new().part("upload", part);
        let url = self.http.build_url("/node");
        let request = self.http.streaming_request(Method::POST, &url).multipart(form);
        self.http.send_data(request, &url).await
    }

    async fn download_to_path(
        &self,
        node_id: &str,
        path: &Path,
        options: &DownloadOptions,
    ) -> ShockResult<PathBuf> {
        let url = self
            .http
            .node_url(node_id, &format!("?{}", options.query()));
        let start = std::time::Instant::now();

        let response = self
            .http
            .send(self.http.streaming_request(Method::GET, &url), &url)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| ShockError::transport(&url, e))?;
            let error = status_error(status, &body);
            log_error(&url, &error);
            return Err(error);
        }

        let stream = response.bytes_stream().map_err(io::Error::other);
        let mut reader = StreamReader::new(stream);
        let mut file = tokio::fs::File::create(path).await?;
        let mut buffer = vec![0u8; DOWNLOAD_CHUNK_SIZE];
        let mut written: u64 = 0;

        loop {
            let read = reader
                .read(&mut buffer)
                .await
                .map_err(|e| ShockError::transport(&url, e))?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read]).await?;
            file.flush().await?;
            written += read as u64;
        }

        tracing::debug!(
            node_id = %node_id,
            path = %path.display(),
            size_bytes = written,
            duration_ms = start.elapsed().as_millis() as u64,
            "Downloaded node content"
        );

        Ok(path.to_path_buf())
    }
}

/// Transfers through the `shock-client` command-line helper.
#[derive(Clone, Debug)]
pub struct ExternalToolTransport {
    program: PathBuf,
    fallback: HttpTransport,
}

impl ExternalToolTransport {
    pub fn new(program: impl Into<PathBuf>, fallback: HttpTransport) -> Self {
        Self {
            program: program.into(),
            fallback,
        }
    }

    async fn run<I, S>(&self, args: I) -> ShockResult<Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ShockError::transport(&program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(
                program = %program,
                exit = ?output.status.code(),
                stderr = %stderr,
                "External transfer tool failed"
            );
            return Err(ShockError::service(TOOL_FAILURE_STATUS, stderr));
        }

        Ok(output)
    }
}

/// Node JSON printed by `pcreate`, with progress lines removed.
fn parse_create_output(stdout: &[u8]) -> ShockResult<Node> {
    let text = String::from_utf8_lossy(stdout);
    let json: String = text
        .lines()
        .filter(|line| !line.contains(PROGRESS_MARKER))
        .collect::<Vec<_>>()
        .join("\n");
    serde_json::from_str(&json)
        .map_err(|e| ShockError::MalformedResponse(format!("{} output: {}", EXTERNAL_TOOL, e)))
}

#[async_trait]
impl Transport for ExternalToolTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::External
    }

    async fn set_auth(&self, auth: &AuthToken) -> ShockResult<()> {
        let token = serde_json::json!({ "access_token": auth.token() }).to_string();
        self.run(["auth", "set-token", token.as_str()]).await?;
        Ok(())
    }

    async fn upload_path(&self, path: &Path) -> ShockResult<Node> {
        if !path.is_file() {
            return Err(ShockError::InvalidInput(format!(
                "not a file: {}",
                path.display()
            )));
        }
        let output = self
            .run([
                OsStr::new("pcreate"),
                OsStr::new(TOOL_THREADS),
                OsStr::new("-full"),
                path.as_os_str(),
            ])
            .await?;
        parse_create_output(&output.stdout)
    }

    async fn download_to_path(
        &self,
        node_id: &str,
        path: &Path,
        options: &DownloadOptions,
    ) -> ShockResult<PathBuf> {
        if !options.is_plain() {
            return self.fallback.download_to_path(node_id, path, options).await;
        }
        self.run([
            OsStr::new("pdownload"),
            OsStr::new(TOOL_THREADS),
            OsStr::new(node_id),
            path.as_os_str(),
        ])
        .await?;
        Ok(path.to_path_buf())
    }
}
