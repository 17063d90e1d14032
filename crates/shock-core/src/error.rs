//! Error types module
//!
//! Every failure a Shock client operation can report is a [`ShockError`].
//! The variants mirror how a caller is expected to react: transport faults and
//! checksum mismatches may be retried, an auth rejection is fatal for a whole
//! batch, and everything else is a failure of the single operation.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a missing node
    Debug,
    /// Warning level - for recoverable issues like a dropped connection
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be handled by callers.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether the failed operation may succeed if attempted again
    fn is_recoverable(&self) -> bool;

    /// Whether the error invalidates every further request (bad credentials)
    fn is_fatal(&self) -> bool;

    /// Status code reported by the service, when there is one
    fn status(&self) -> Option<u16>;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ShockError {
    #[error("Unable to connect to Shock server {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Shock error {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Return data not valid Shock format: {0}")]
    MalformedResponse(String),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unauthorized: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for Shock client operations
pub type ShockResult<T> = Result<T, ShockError>;

impl ShockError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        ShockError::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn service(status: u16, message: impl Into<String>) -> Self {
        ShockError::Service {
            status,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ShockError {
    fn from(err: serde_json::Error) -> Self {
        ShockError::MalformedResponse(err.to_string())
    }
}

impl ErrorMetadata for ShockError {
    fn error_code(&self) -> &'static str {
        match self {
            ShockError::Transport { .. } => "TRANSPORT_ERROR",
            ShockError::Service { .. } => "SERVICE_ERROR",
            ShockError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ShockError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            ShockError::Auth(_) => "UNAUTHORIZED",
            ShockError::NotFound(_) => "NOT_FOUND",
            ShockError::InvalidInput(_) => "INVALID_INPUT",
            ShockError::Io(_) => "IO_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShockError::Transport { .. } | ShockError::ChecksumMismatch { .. }
        )
    }

    fn is_fatal(&self) -> bool {
        matches!(self, ShockError::Auth(_))
    }

    fn status(&self) -> Option<u16> {
        match self {
            ShockError::Service { status, .. } => Some(*status),
            ShockError::Auth(_) => Some(401),
            ShockError::NotFound(_) => Some(404),
            _ => None,
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            ShockError::NotFound(_) | ShockError::InvalidInput(_) => LogLevel::Debug,
            ShockError::Transport { .. } | ShockError::ChecksumMismatch { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
