//! Log sink setup
//!
//! Everything goes to one append-only log file through a non-blocking
//! writer. The five audit levels map onto tracing as follows:
//!
//! | audit   | tracing                            |
//! |---------|------------------------------------|
//! | DEBUG   | `debug!`                           |
//! | INFO    | `info!`                            |
//! | WARNING | `warn!`                            |
//! | DANGER  | `warn!(target: "baseliner::alert")`|
//! | ERROR   | `error!`                           |

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "baseliner=info";
const DEBUG_LOG_FILTER: &str = "baseliner=debug";

pub struct LogConfig<'a> {
    pub path: &'a Path,
    /// Debug level, mirrored to stderr
    pub debug: bool,
}

/// Pick the log file: `--log` flag, then the config, then the data dir
pub fn resolve_log_path(flag: Option<&Path>, configured: Option<&Path>, data_dir: &Path, debug: bool) -> PathBuf {
    if let Some(path) = flag.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return path.to_path_buf();
    }

    data_dir.join(if debug { "debug.log" } else { "baseliner.log" })
}

/// Install the global subscriber. The returned guard flushes the file
/// writer on drop and must live until the process exits.
pub fn init_logging(config: LogConfig<'_>) -> Result<WorkerGuard> {
    let dir = match config.path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let file_name = config
        .path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", config.path.display()))?;

    let appender = tracing_appender::rolling::never(&dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_filter(env_filter(config.debug));

    let console_layer = config.debug.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(env_filter(true))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

fn env_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if debug { DEBUG_LOG_FILTER } else { DEFAULT_LOG_FILTER })
    })
}
