//! Error taxonomy for scanning and baseline persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the scan-and-reconcile engine.
///
/// Per-file errors (`Io`, `Storage`, `DuplicateKey`, `MissingRecord`) are
/// logged and the file is skipped. Per-root errors (`Path`, `ReadDir`) abort
/// the affected subtree only.
#[derive(Error, Debug)]
pub enum Error {
    /// A file could not be opened or read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scan root could not be resolved to an absolute path.
    #[error("Failed to resolve absolute path for '{path}': {source}")]
    Path {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A directory could not be listed.
    #[error("Can not read dir {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any store connect/prepare/query/insert/update failure.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Insert collided with an existing baseline record.
    #[error("Baseline record already exists: {0}")]
    DuplicateKey(String),

    /// Hash update targeted a path with no baseline record.
    #[error("No baseline record for {0}")]
    MissingRecord(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Notification transport failure.
    #[error("Notification failed: {0}")]
    Notify(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
