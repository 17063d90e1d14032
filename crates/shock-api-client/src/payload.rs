//! Upload inputs.
//!
//! A file part may come from a path on disk, an in-memory buffer or an open
//! reader. The variant is chosen by the caller; nothing is probed at runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use reqwest::multipart::Part;
use reqwest::Body;
use shock_core::{ShockError, ShockResult};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// File name sent when neither the caller nor the payload supplies one.
pub const PLACEHOLDER_NAME: &str = "unknown";

/// Source of an uploaded file part.
pub enum Payload {
    Path(PathBuf),
    Bytes(Vec<u8>),
    Handle(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Payload::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Payload::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl From<PathBuf> for Payload {
    fn from(path: PathBuf) -> Self {
        Payload::Path(path)
    }
}

impl From<&Path> for Payload {
    fn from(path: &Path) -> Self {
        Payload::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

/// A payload plus the file name to report in the multipart part.
#[derive(Debug)]
pub struct UploadFile {
    pub payload: Payload,
    pub name: Option<String>,
}

impl UploadFile {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            name: None,
        }
    }

    pub fn named(payload: impl Into<Payload>, name: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            name: Some(name.into()),
        }
    }

    /// Explicit name, else the path's base name, else the placeholder.
    pub fn file_name(&self) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }

        match &self.payload {
            Payload::Path(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(PLACEHOLDER_NAME)
                .to_string(),
            _ => PLACEHOLDER_NAME.to_string(),
        }
    }

    /// Path of the payload when it is a file on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Build the multipart part. Files and readers are streamed, not buffered.
    pub async fn into_part(self) -> ShockResult<Part> {
        let file_name = self.file_name();

        let part = match self.payload {
            Payload::Bytes(bytes) => Part::bytes(bytes),
            Payload::Path(path) => {
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    ShockError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
                })?;
                let length = file.metadata().await?.len();
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), length)
            }
            Payload::Handle(reader) => Part::stream(Body::wrap_stream(ReaderStream::new(reader))),
        };

        Ok(part.file_name(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_name_wins() {
        let upload = UploadFile::named(PathBuf::from("/data/reads.fastq"), "sample.fastq");
        assert_eq!(upload.file_name(), "sample.fastq");
    }

    #[test]
    fn path_basename_is_used() {
        let upload = UploadFile::new(PathBuf::from("/data/reads.fastq"));
        assert_eq!(upload.file_name(), "reads.fastq");
        assert_eq!(upload.path(), Some(Path::new("/data/reads.fastq")));
    }

    #[test]
    fn buffers_and_handles_get_placeholder() {
        assert_eq!(UploadFile::new(b"abc".to_vec()).file_name(), "unknown");

        let reader: Box<dyn AsyncRead + Send + Sync + Unpin> = Box::new(&b"abc"[..]);
        let upload = UploadFile::new(Payload::Handle(reader));
        assert_eq!(upload.file_name(), "unknown");
        assert_eq!(format!("{:?}", upload.payload), "Handle(..)");
    }

    #[tokio::test]
    async fn missing_path_is_invalid_input() {
        let upload = UploadFile::new(PathBuf::from("/definitely/not/here.bin"));
        assert!(matches!(
            upload.into_part().await,
            Err(ShockError::InvalidInput(_))
        ));
    }
}
