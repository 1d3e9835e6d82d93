//! Exclusion and capture-eligibility filtering
//!
//! Matching is by base name only: exclusions compare the trimmed entry name
//! against exact, case-sensitive names. No globbing and no nested paths.

use crate::config::{Config, StringList};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Immutable filter configuration, built once per run
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    excluded_dirs: HashSet<String>,
    excluded_files: HashSet<String>,
    capture: Option<Regex>,
}

impl FilterSet {
    pub fn new(exclude_dir: &StringList, exclude_file: &StringList, diff_extension: &StringList) -> Self {
        Self {
            excluded_dirs: to_set(exclude_dir),
            excluded_files: to_set(exclude_file),
            capture: capture_pattern(diff_extension),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.exclude_dir, &config.exclude_file, &config.diff_extension)
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        is_excluded_name(name, &self.excluded_dirs)
    }

    pub fn is_excluded_file(&self, name: &str) -> bool {
        is_excluded_name(name, &self.excluded_files)
    }

    /// Whether the full content of `path` should be captured
    pub fn is_capture_eligible(&self, path: &Path) -> bool {
        match &self.capture {
            Some(re) => re.is_match(&path.to_string_lossy()),
            None => false,
        }
    }
}

/// True iff the trimmed name exactly matches an entry of the set
pub fn is_excluded_name(name: &str, exclusions: &HashSet<String>) -> bool {
    exclusions.contains(name.trim())
}

fn to_set(list: &StringList) -> HashSet<String> {
    list.iter().map(|s| s.trim().to_string()).collect()
}

/// Single alternation anchored to end-of-string; `None` when the allow-list
/// is empty (hash-only mode).
fn capture_pattern(extensions: &StringList) -> Option<Regex> {
    let alternation = extensions
        .iter()
        .map(|ext| ext.trim().trim_start_matches('.'))
        .filter(|ext| !ext.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");

    if alternation.is_empty() {
        return None;
    }

    // Escaped literals joined by '|' always form a valid pattern
    Regex::new(&format!(r"\.(?:{})$", alternation)).ok()
}
