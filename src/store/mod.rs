//! Persistent baseline of file fingerprints
//!
//! One record per absolute path. Records are inserted on first observation
//! and only ever have their hash updated afterwards; nothing here deletes a
//! record. The store also keeps a small history of runs.

pub mod database;
pub mod record;

pub use database::BaselineStore;
pub use record::{FileRecord, Lookup, RunRecord, RunStats};
