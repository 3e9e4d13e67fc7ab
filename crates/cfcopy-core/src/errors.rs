//! Error taxonomy for object copies.
//!
//! Every failure a copy can surface maps onto one [`CopyError`] variant. Each
//! variant also carries an [`ErrorCategory`] so callers can decide whether
//! re-running the whole copy is worthwhile:
//! - Retryable: transient failures that may succeed on a fresh attempt (network, 5xx)
//! - Fatal: permanent failures that will never succeed (bad credentials, corrupt data)

use std::io;

use thiserror::Error;

/// Category of copy error for retry decision-making.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient error - re-running the copy may succeed.
    Retryable,
    /// Permanent error - re-running the copy will fail the same way.
    Fatal,
}

/// Which part of a chunk transfer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Download,
    Upload,
    /// The chunk worker itself died before reporting an outcome.
    Worker,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferStage::Download => write!(f, "download"),
            TransferStage::Upload => write!(f, "upload"),
            TransferStage::Worker => write!(f, "chunk transfer"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CopyError {
    /// Identity exchange failed; no partial work was attempted.
    #[error("could not authenticate: {0}")]
    Auth(String),

    #[error("object not found: {path}")]
    NotFound { path: String },

    /// Download or upload I/O failure.
    #[error("{stage} failed for {path}: {message}")]
    Transfer {
        stage: TransferStage,
        path: String,
        message: String,
        retryable: bool,
    },

    /// The hash reported for an upload does not match the bytes that were downloaded.
    #[error("upload etag does not match download etag for {path}: {downloaded} != {uploaded}")]
    Integrity {
        path: String,
        downloaded: String,
        uploaded: String,
    },

    #[error("could not put manifest for {path}: {message}")]
    Manifest { path: String, message: String },

    #[error("invalid size: object size {size} / chunk size {chunk_size} must both be non-zero")]
    InvalidSize { size: u64, chunk_size: u64 },

    #[error("invalid copy options: {0}")]
    InvalidOptions(String),

    #[error("copy cancelled after dispatching {dispatched} of {total} chunk(s)")]
    Cancelled { dispatched: usize, total: usize },
}

impl CopyError {
    pub fn download(path: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        CopyError::Transfer {
            stage: TransferStage::Download,
            path: path.into(),
            message: message.into(),
            retryable,
        }
    }

    pub fn upload(path: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        CopyError::Transfer {
            stage: TransferStage::Upload,
            path: path.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Wrap a local I/O error raised while moving bytes for `path`.
    pub fn from_io(stage: TransferStage, path: impl Into<String>, err: &io::Error) -> Self {
        CopyError::Transfer {
            stage,
            path: path.into(),
            message: err.to_string(),
            retryable: categorize_io_error(err) == ErrorCategory::Retryable,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CopyError::Transfer {
                retryable: true, ..
            } => ErrorCategory::Retryable,
            CopyError::Manifest { .. } => ErrorCategory::Retryable,
            CopyError::Auth(_)
            | CopyError::NotFound { .. }
            | CopyError::Transfer { .. }
            | CopyError::Integrity { .. }
            | CopyError::InvalidSize { .. }
            | CopyError::InvalidOptions(_)
            | CopyError::Cancelled { .. } => ErrorCategory::Fatal,
        }
    }

    /// Check if re-invoking the whole copy could succeed.
    pub fn should_retry(&self) -> bool {
        self.category() == ErrorCategory::Retryable
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CopyError::NotFound { .. })
    }
}

/// Categorize an IO error for retry decisions.
pub fn categorize_io_error(err: &io::Error) -> ErrorCategory {
    match err.kind() {
        io::ErrorKind::TimedOut
        | io::ErrorKind::Interrupted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::WouldBlock => ErrorCategory::Retryable,

        // Unknown errors - default to fatal to avoid retry loops
        _ => ErrorCategory::Fatal,
    }
}

/// Result type for copy operations.
pub type CopyResult<T> = std::result::Result<T, CopyError>;
