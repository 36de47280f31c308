//! Error types for roster-store.

use std::path::PathBuf;

use thiserror::Error;

use roster_core::{JobId, JobStatus, RecordId, RecordStatus};

/// All errors that can arise from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file could not be opened.
    #[error("cannot open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON column could not be encoded.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema on disk is newer than this build.
    #[error("database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Terminal jobs are never reopened or finished twice.
    #[error("job {id} is already {status}")]
    JobFinished { id: JobId, status: JobStatus },

    /// Only orphaned records accept a reviewer decision.
    #[error("record {id} has status '{status}'; only orphaned records take a decision")]
    NotDecidable { id: RecordId, status: RecordStatus },
}

/// Convenience constructor for [`StoreError::NotFound`].
pub(crate) fn not_found(entity: &'static str, id: i64) -> StoreError {
    StoreError::NotFound { entity, id }
}
