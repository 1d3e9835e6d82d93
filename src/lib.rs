//! Baseliner library crate
//!
//! Records an MD5 fingerprint of every file under a set of scan roots in a
//! SQLite baseline, then reports files that appear or change between runs.
//! The CLI binary is a thin wrapper over this API.

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod logging;
pub mod mode;
pub mod notify;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod store;
pub mod walker;

pub use error::{Error, Result};
pub use mode::RunMode;
