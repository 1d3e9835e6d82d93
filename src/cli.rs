use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::*;
use tracing::{info, warn};

use crate::config::{self, Config, StringList, DEFAULT_CONFIG_FILE};
use crate::error::Error;
use crate::filter::FilterSet;
use crate::logging::{self, LogConfig};
use crate::mode::RunMode;
use crate::notify;
use crate::output::{self, RunReport, StatusReport};
use crate::progress;
use crate::reconcile::Reconciler;
use crate::store::BaselineStore;
use crate::walker::{ScanTarget, Walker};

/// Exit code when no scan directory was configured
pub const EXIT_NO_SCAN_DIR: u8 = 2;
/// Exit code when the store location cannot be made absolute
pub const EXIT_STORE_PATH: u8 = 3;
/// Exit code when the store cannot be opened or initialized
pub const EXIT_STORE_INIT: u8 = 4;

/// Fatal conditions with a dedicated exit code
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Please use -d or the scan_dir config key to set scan directories")]
    NoScanDirs,

    #[error("Convert store file absolute path error: {path}: {source}")]
    StorePath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to open baseline store {path}: {source}")]
    StoreInit {
        path: PathBuf,
        #[source]
        source: Error,
    },
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::NoScanDirs => EXIT_NO_SCAN_DIR,
            CliError::StorePath { .. } => EXIT_STORE_PATH,
            CliError::StoreInit { .. } => EXIT_STORE_INIT,
        }
    }
}

#[derive(Parser)]
#[command(name = "baseliner")]
#[command(version)]
#[command(about = "Record file fingerprints and alert when they drift")]
#[command(long_about = "baseliner walks directory trees, stores an MD5 fingerprint of every \
    file in a SQLite baseline and reports files that appeared or changed since.\n\n\
    Examples:\n  \
    baseliner -d /etc -r scan          # Record the baseline for /etc\n  \
    baseliner -d /etc -r check         # Alert on new or changed files\n  \
    baseliner -d /etc -r renew         # Accept current contents as the baseline\n  \
    baseliner --config /etc/baseliner.toml check")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directories to scan, comma separated (added to scan_dir from the config)
    #[arg(short = 'd', long = "directory", value_name = "DIRS", global = true)]
    pub directory: Option<String>,

    /// Descend into subdirectories
    #[arg(short = 'r', long, global = true)]
    pub recursive: bool,

    /// Config file location
    #[arg(long = "config", visible_alias = "cfg", value_name = "PATH", default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Log file location (overrides log_path from the config)
    #[arg(long = "log", value_name = "PATH", global = true)]
    pub log: Option<PathBuf>,

    /// Enable debug logging, mirrored to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Record new files in the baseline; changed files are only counted
    #[command(visible_alias = "s")]
    Scan,

    /// Alert on new and changed files without touching existing records
    #[command(visible_alias = "c")]
    Check,

    /// Accept changed files into the baseline
    #[command(visible_alias = "re")]
    Renew,

    /// Show baseline size and the last run
    Status,
}

impl Commands {
    /// Run mode for scanning commands, `None` for read-only ones
    pub fn run_mode(&self) -> Option<RunMode> {
        match self {
            Commands::Scan => Some(RunMode::Baseline),
            Commands::Check => Some(RunMode::Check),
            Commands::Renew => Some(RunMode::Renew),
            Commands::Status => None,
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn run(self) -> anyhow::Result<()> {
        let config = match Config::load(&self.config)? {
            Some(config) => config,
            None => {
                eprintln!(
                    "{} config file {} not found, you can use --config to set its location",
                    "Warning:".yellow(),
                    self.config.display()
                );
                Config::default()
            }
        };

        let log_path = logging::resolve_log_path(
            self.log.as_deref(),
            config.log_path.as_deref(),
            &config::data_dir(),
            self.debug,
        );
        let _log_guard = match logging::init_logging(LogConfig {
            path: &log_path,
            debug: self.debug,
        }) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("{} {:#}", "Warning:".yellow(), e);
                None
            }
        };

        let store_path = absolute_store_path(&config.store_file())?;

        match self.command.run_mode() {
            Some(mode) => self.run_scan(mode, &config, &store_path, &log_path),
            None => self.run_status(&store_path),
        }
    }

    fn run_scan(&self, mode: RunMode, config: &Config, store_path: &Path, log_path: &Path) -> anyhow::Result<()> {
        let roots = scan_roots(config, self.directory.as_deref())?;
        let store = open_store(store_path)?;

        tracing::debug!("scan_dir: {:?}, recursive: {}", roots.as_slice(), self.recursive);

        let run_id = match store.start_run(mode) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Failed to record run start: {}", e);
                None
            }
        };

        let notifier = notify::from_config(&config.notification);
        let recipients = config.notification.to.as_slice();
        let filters = FilterSet::from_config(config);
        let reconciler = Reconciler::new(&store, notifier.as_ref(), recipients, mode);

        let spinner = if self.json || self.debug {
            progress::hidden()
        } else {
            progress::create_spinner("Starting scan...")
        };

        let targets: Vec<ScanTarget> = roots
            .iter()
            .map(|root| ScanTarget::new(root.as_str(), self.recursive))
            .collect();

        let mut walker = Walker::new(&filters, &reconciler).with_progress(&spinner);
        walker.walk_all(&targets);
        progress::finish_and_clear(&spinner);

        let stats = walker.into_stats();
        info!(
            "{} finished: {} files, {} new, {} changed, {} skipped",
            mode, stats.scanned, stats.inserted, stats.drifted, stats.skipped
        );

        if let Some(run_id) = run_id {
            if let Err(e) = store.finish_run(run_id, &stats) {
                warn!("Failed to record run result: {}", e);
            }
        }

        let report = RunReport {
            mode,
            roots: roots.iter().cloned().collect(),
            store: store_path.to_path_buf(),
            log: log_path.to_path_buf(),
            stats,
        };

        if self.json {
            output::print_json(&report)?;
        } else {
            output::print_run(&report);
        }

        Ok(())
    }

    fn run_status(&self, store_path: &Path) -> anyhow::Result<()> {
        let store = open_store(store_path)?;
        let report = StatusReport {
            store: store_path.to_path_buf(),
            records: store.record_count().context("Failed to count baseline records")?,
            last_run: store.last_run().context("Failed to read run history")?,
        };

        if self.json {
            output::print_json(&report)?;
        } else {
            output::print_status(&report);
        }

        Ok(())
    }
}

/// Scan roots from the config followed by those given with `-d`
pub fn scan_roots(config: &Config, directory_flag: Option<&str>) -> Result<StringList, CliError> {
    let mut roots = config.scan_dir.clone();
    if let Some(flag) = directory_flag {
        roots.extend(StringList::parse(flag));
    }

    if roots.is_empty() {
        return Err(CliError::NoScanDirs);
    }
    Ok(roots)
}

fn absolute_store_path(path: &Path) -> Result<PathBuf, CliError> {
    std::path::absolute(path).map_err(|source| CliError::StorePath {
        path: path.to_path_buf(),
        source,
    })
}

fn open_store(path: &Path) -> Result<BaselineStore, CliError> {
    BaselineStore::open(path).map_err(|source| {
        tracing::error!("Failed to open baseline store {}: {}", path.display(), source);
        CliError::StoreInit {
            path: path.to_path_buf(),
            source,
        }
    })
}
