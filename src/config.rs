//! Configuration loading
//!
//! The config file is TOML. List-valued keys accept either a comma-separated
//! string (`scan_dir = "/etc, /usr/bin"`) or an array of strings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan roots
    #[serde(alias = "scanDir")]
    pub scan_dir: StringList,
    /// Extensions whose full content is captured for diffing
    #[serde(alias = "diffExtension")]
    pub diff_extension: StringList,
    /// Directory base names never descended into
    #[serde(alias = "excludeDir")]
    pub exclude_dir: StringList,
    /// File base names never fingerprinted
    #[serde(alias = "excludeFile")]
    pub exclude_file: StringList,
    #[serde(alias = "logPath")]
    pub log_path: Option<PathBuf>,
    #[serde(alias = "sqlite")]
    pub store: StoreConfig,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file holding the baseline
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub smtp: String,
    pub port: u16,
    pub account: String,
    pub pass: String,
    pub from: String,
    pub to: StringList,
    pub starttls: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            smtp: String::new(),
            port: 587,
            account: String::new(),
            pass: String::new(),
            from: String::new(),
            to: StringList::default(),
            starttls: true,
        }
    }
}

impl NotificationConfig {
    /// Whether enough is configured to attempt delivery
    pub fn is_configured(&self) -> bool {
        !self.smtp.trim().is_empty() && !self.from.trim().is_empty() && !self.to.is_empty()
    }
}

/// A list of trimmed, non-empty names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawList", into = "Vec<String>")]
pub struct StringList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Joined(String),
    Items(Vec<String>),
}

impl From<RawList> for StringList {
    fn from(raw: RawList) -> Self {
        match raw {
            RawList::Joined(s) => StringList::parse(&s),
            RawList::Items(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl From<StringList> for Vec<String> {
    fn from(list: StringList) -> Self {
        list.0
    }
}

impl<'a> FromIterator<&'a str> for StringList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        StringList(
            iter.into_iter()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl StringList {
    /// Split a comma-separated value
    pub fn parse(value: &str) -> Self {
        value.split(',').collect()
    }

    pub fn extend(&mut self, other: StringList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a StringList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// Returns `Ok(None)` when the file does not exist so the caller can
    /// decide whether running on defaults is acceptable.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;

        Self::from_toml(&content)
            .map(Some)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Store file location, falling back to the per-user data directory
    pub fn store_file(&self) -> PathBuf {
        self.store
            .file
            .clone()
            .unwrap_or_else(|| data_dir().join("baseline.db"))
    }
}

/// Per-user data directory for the store and default log files
pub fn data_dir() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("", "", "baseliner") {
        return dirs.data_dir().to_path_buf();
    }

    directories::BaseDirs::new()
        .map(|b| b.home_dir().join(".baseliner"))
        .unwrap_or_else(|| std::env::temp_dir().join("baseliner"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
scan_dir = "/bin, /sbin"
exclude_dir = ""
exclude_file = ".gitignore"
diff_extension = ["go", " php "]
log_path = "mylog.log"

[store]
file = "testdb.db"

[notification]
smtp = "smtp.example.com"
port = 2525
account = "account"
pass = "password"
from = "account@example.com"
to = "ops@example.com, oncall@example.com"
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.scan_dir.as_slice(), ["/bin", "/sbin"]);
        assert!(config.exclude_dir.is_empty());
        assert_eq!(config.exclude_file.as_slice(), [".gitignore"]);
        assert_eq!(config.diff_extension.as_slice(), ["go", "php"]);
        assert_eq!(config.log_path, Some(PathBuf::from("mylog.log")));
        assert_eq!(config.store_file(), PathBuf::from("testdb.db"));
        assert_eq!(config.notification.port, 2525);
        assert_eq!(config.notification.to.len(), 2);
        assert!(config.notification.starttls);
        assert!(config.notification.is_configured());
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = Config::from_toml(
            "scanDir = \"/srv\"\ndiffExtension = \"conf\"\nexcludeDir = \".git,node_modules\"\n\n[sqlite]\nfile = \"x.db\"\n",
        )
        .unwrap();

        assert_eq!(config.scan_dir.as_slice(), ["/srv"]);
        assert_eq!(config.diff_extension.as_slice(), ["conf"]);
        assert_eq!(config.exclude_dir.as_slice(), [".git", "node_modules"]);
        assert_eq!(config.store_file(), PathBuf::from("x.db"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();

        assert!(config.scan_dir.is_empty());
        assert!(config.log_path.is_none());
        assert!(!config.notification.is_configured());
        assert!(config.store_file().ends_with("baseline.db"));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = Config::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "scan_dir = [1, 2").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_string_list_parse_trims_and_drops_empty() {
        let list = StringList::parse(" a , ,b,");
        assert_eq!(list.as_slice(), ["a", "b"]);
    }
}
