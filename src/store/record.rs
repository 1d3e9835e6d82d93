//! Baseline record and run history types

use crate::mode::RunMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    /// Content as originally captured; `None` when the file was not
    /// capture-eligible at insert time
    pub content: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn content_text(&self) -> Option<String> {
        self.content
            .as_deref()
            .map(|c| String::from_utf8_lossy(c).into_owned())
    }
}

/// Result of a baseline lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(FileRecord),
    Absent,
}

impl Lookup {
    pub fn is_absent(&self) -> bool {
        matches!(self, Lookup::Absent)
    }

    pub fn into_record(self) -> Option<FileRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::Absent => None,
        }
    }
}

/// Counters for a single run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files fingerprinted
    pub scanned: usize,
    /// New records written
    pub inserted: usize,
    pub unchanged: usize,
    /// Hash mismatches detected, whatever the mode did about them
    pub drifted: usize,
    /// Records whose hash was updated (renew)
    pub renewed: usize,
    /// Alerts emitted (check)
    pub alerts: usize,
    /// Files skipped on I/O or storage errors
    pub skipped: usize,
    /// Directories that could not be listed or resolved
    pub failed_dirs: usize,
    pub bytes_hashed: u64,
}

impl RunStats {
    pub fn mutations(&self) -> usize {
        self.inserted + self.renewed
    }

    pub fn has_errors(&self) -> bool {
        self.skipped > 0 || self.failed_dirs > 0
    }
}

/// A recorded run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub stats: RunStats,
}
