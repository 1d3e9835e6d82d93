//! Directory traversal
//!
//! Depth-first, one directory listing at a time. Each admitted file is
//! fingerprinted and handed to the reconciler before the walk moves on.

use crate::error::{Error, Result};
use crate::filter::FilterSet;
use crate::fingerprint::Fingerprint;
use crate::reconcile::{Outcome, Reconciler};
use crate::store::RunStats;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// A scan root as supplied by config or CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub path: String,
    pub recursive: bool,
}

impl ScanTarget {
    pub fn new(path: impl Into<String>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }

    /// Absolute form of the root, without touching the filesystem
    pub fn resolve(&self) -> Result<PathBuf> {
        let trimmed = self.path.trim();
        std::path::absolute(trimmed).map_err(|source| Error::Path {
            path: trimmed.to_string(),
            source,
        })
    }
}

pub struct Walker<'a> {
    filters: &'a FilterSet,
    reconciler: &'a Reconciler<'a>,
    progress: Option<&'a ProgressBar>,
    stats: RunStats,
}

impl<'a> Walker<'a> {
    pub fn new(filters: &'a FilterSet, reconciler: &'a Reconciler<'a>) -> Self {
        Self {
            filters,
            reconciler,
            progress: None,
            stats: RunStats::default(),
        }
    }

    pub fn with_progress(mut self, progress: &'a ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_stats(self) -> RunStats {
        self.stats
    }

    /// Walk one root. An error means this root was abandoned; the caller can
    /// carry on with the next one.
    pub fn walk(&mut self, target: &ScanTarget) -> Result<()> {
        let root = match target.resolve() {
            Ok(root) => root,
            Err(e) => {
                error!("{}", e);
                self.stats.failed_dirs += 1;
                return Err(e);
            }
        };

        debug!("Scanning {} (recursive: {})", root.display(), target.recursive);
        self.walk_dir(&root, target.recursive).map_err(|e| {
            error!("{}", e);
            self.stats.failed_dirs += 1;
            e
        })
    }

    /// Walk every root in order. A failing root is logged and counted in
    /// `failed_dirs`; the remaining roots still run.
    pub fn walk_all<'t>(&mut self, targets: impl IntoIterator<Item = &'t ScanTarget>) {
        for target in targets {
            if self.walk(target).is_err() {
                warn!("Skipping scan root {}", target.path);
            }
        }
    }

    fn walk_dir(&mut self, dir: &Path, recursive: bool) -> Result<()> {
        let listing = fs::read_dir(dir).map_err(|source| Error::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries: Vec<fs::DirEntry> = listing
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Failed to read entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .collect();
        entries.sort_by_key(|e| e.file_name());

        debug!(
            "Scanning files in {}, {} entries, recursive: {}",
            dir.display(),
            entries.len(),
            recursive
        );
        if let Some(pb) = self.progress {
            pb.set_message(format!("Scanning {}", dir.display()));
        }

        for entry in entries {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) => {
                    warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                if !recursive || self.filters.is_excluded_dir(&name) {
                    continue;
                }

                if let Err(e) = self.walk_dir(&path, recursive) {
                    error!("{}", e);
                    self.stats.failed_dirs += 1;
                }
                continue;
            }

            if file_type.is_symlink() && path.is_dir() {
                debug!("Not following directory symlink {}", path.display());
                continue;
            }

            if self.filters.is_excluded_file(&name) {
                continue;
            }

            self.visit_file(&path);
        }

        info!("Scan {} finished!", dir.display());
        Ok(())
    }

    fn visit_file(&mut self, path: &Path) {
        let capture = self.filters.is_capture_eligible(path);
        let fingerprint = match Fingerprint::from_path(path, capture) {
            Ok(fp) => fp,
            Err(e) => {
                error!("Get {} fingerprint failed: {}", path.display(), e);
                self.stats.skipped += 1;
                return;
            }
        };

        self.stats.scanned += 1;
        self.stats.bytes_hashed += fingerprint.size;

        let outcome = self.reconciler.reconcile(&fingerprint);
        self.tally(outcome);
    }

    fn tally(&mut self, outcome: Outcome) {
        let stats = &mut self.stats;
        match outcome {
            Outcome::Inserted { notified } => {
                stats.inserted += 1;
                if notified {
                    stats.alerts += 1;
                }
            }
            Outcome::Unchanged => stats.unchanged += 1,
            Outcome::Renewed => {
                stats.drifted += 1;
                stats.renewed += 1;
            }
            Outcome::Alerted => {
                stats.drifted += 1;
                stats.alerts += 1;
            }
            Outcome::Drifted => stats.drifted += 1,
            Outcome::Skipped => stats.skipped += 1,
        }
    }
}
