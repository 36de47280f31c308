use std::path::PathBuf;

use thiserror::Error;

/// Error surface of the scheduled trigger.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    #[error("store error: {0}")]
    Store(#[from] roster_store::StoreError),

    #[error("sync error: {0}")]
    Sync(#[from] roster_sync::SyncError),

    #[error("no `source` configured; set it in config.yaml or run `roster init --source <path>`")]
    NoSource,

    #[error("{0}")]
    Task(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
