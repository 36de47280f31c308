//! Error types for roster-sync.

use std::path::PathBuf;

use thiserror::Error;

use roster_core::ErrorCode;
use roster_store::StoreError;

/// The payload was rejected before any job was created.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(
        "unsupported payload shape: expected an array, or an object with an \
         `items`, `employees` or `data` array; got {found}"
    )]
    UnsupportedShape { found: &'static str },

    #[error("item {index} is not an object")]
    ItemNotObject { index: usize },

    #[error("item {index}: field `{field}` cannot be {found}")]
    InvalidField {
        index: usize,
        field: &'static str,
        found: &'static str,
    },
}

/// Errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Payload(#[from] PayloadError),

    /// A storage fault outside any record scope.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (snapshot encoding).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// An expected, per-record failure. Persisted as an `error` record; never
/// aborts the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl RecordFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
