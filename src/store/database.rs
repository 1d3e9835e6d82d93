//! SQLite baseline store

use crate::error::{Error, Result};
use crate::mode::RunMode;
use crate::store::record::{FileRecord, Lookup, RunRecord, RunStats};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_VERSION: i32 = 1;

const FIND_FILE_SQL: &str =
    "SELECT path, hash, content, created_at, updated_at FROM files WHERE path = ?1";
const INSERT_FILE_SQL: &str =
    "INSERT INTO files (path, hash, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)";
const UPDATE_HASH_SQL: &str = "UPDATE files SET hash = ?1, updated_at = ?2 WHERE path = ?3";

/// Baseline store backed by a single SQLite file.
///
/// Statements are prepared on first use and reused through the connection's
/// statement cache.
#[derive(Debug)]
pub struct BaselineStore {
    db: Connection,
}

impl BaselineStore {
    /// Open or create the baseline at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let is_new = !db_path.exists();
        let db = Connection::open(db_path)?;

        db.pragma_update(None, "journal_mode", "WAL")?;
        // Serializes writers if two instances ever share a baseline
        db.busy_timeout(Duration::from_secs(30))?;

        let store = Self::with_connection(db)?;
        if is_new {
            info!("Created baseline store at {}", db_path.display());
        } else {
            debug!("Using baseline store at {}", db_path.display());
        }
        Ok(store)
    }

    /// Throwaway store, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db: Connection) -> Result<Self> {
        let mut store = Self { db };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&mut self) -> Result<()> {
        self.db.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
            [],
        )?;

        let version: Option<i32> = self
            .db
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?;

        let version = match version {
            Some(v) => v,
            None => {
                self.db
                    .execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
                0
            }
        };

        if version < SCHEMA_VERSION {
            self.migrate_schema(version)?;
        }

        Ok(())
    }

    fn migrate_schema(&mut self, from_version: i32) -> Result<()> {
        let tx = self.db.transaction()?;

        if from_version == 0 {
            tx.execute(
                "CREATE TABLE IF NOT EXISTS files (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    path BLOB NOT NULL UNIQUE,
                    hash TEXT NOT NULL,
                    content BLOB,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                )",
                [],
            )?;

            tx.execute(
                "CREATE TABLE IF NOT EXISTS runs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    mode TEXT NOT NULL,
                    started_at INTEGER NOT NULL,
                    finished_at INTEGER,
                    scanned INTEGER,
                    inserted INTEGER,
                    unchanged INTEGER,
                    drifted INTEGER,
                    renewed INTEGER,
                    alerts INTEGER,
                    skipped INTEGER,
                    failed_dirs INTEGER,
                    bytes_hashed INTEGER
                )",
                [],
            )?;

            tx.execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Look up the baseline record for `path`
    pub fn find(&self, path: &Path) -> Result<Lookup> {
        let key = path_key(path);
        let mut stmt = self.db.prepare_cached(FIND_FILE_SQL)?;

        let record = stmt
            .query_row([&key], |row| {
                let stored: Vec<u8> = row.get(0)?;
                let created_at: i64 = row.get(3)?;
                let updated_at: i64 = row.get(4)?;
                Ok(FileRecord {
                    path: String::from_utf8_lossy(&stored).into_owned(),
                    hash: row.get(1)?,
                    content: row.get(2)?,
                    created_at: from_timestamp(created_at),
                    updated_at: from_timestamp(updated_at),
                })
            })
            .optional()?;

        Ok(match record {
            Some(record) => Lookup::Found(record),
            None => Lookup::Absent,
        })
    }

    /// Insert a new record. Fails with `DuplicateKey` if `path` is present.
    pub fn insert(&self, path: &Path, hash: &str, content: Option<&[u8]>) -> Result<()> {
        let key = path_key(path);
        let now = Utc::now().timestamp();
        let mut stmt = self.db.prepare_cached(INSERT_FILE_SQL)?;

        match stmt.execute(params![key, hash, content, now]) {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(Error::DuplicateKey(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored hash. Captured content is left as it was.
    pub fn update_hash(&self, path: &Path, hash: &str) -> Result<()> {
        let key = path_key(path);
        let now = Utc::now().timestamp();
        let mut stmt = self.db.prepare_cached(UPDATE_HASH_SQL)?;

        let changed = stmt.execute(params![hash, now, key])?;
        if changed == 0 {
            return Err(Error::MissingRecord(path.display().to_string()));
        }
        Ok(())
    }

    /// Number of records in the baseline
    pub fn record_count(&self) -> Result<u64> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Open a run history entry
    pub fn start_run(&self, mode: RunMode) -> Result<i64> {
        self.db.execute(
            "INSERT INTO runs (mode, started_at) VALUES (?1, ?2)",
            params![mode.as_str(), Utc::now().timestamp()],
        )?;
        Ok(self.db.last_insert_rowid())
    }

    /// Close a run history entry with its counters
    pub fn finish_run(&self, run_id: i64, stats: &RunStats) -> Result<()> {
        self.db.execute(
            "UPDATE runs SET
                finished_at = ?1,
                scanned = ?2,
                inserted = ?3,
                unchanged = ?4,
                drifted = ?5,
                renewed = ?6,
                alerts = ?7,
                skipped = ?8,
                failed_dirs = ?9,
                bytes_hashed = ?10
             WHERE id = ?11",
            params![
                Utc::now().timestamp(),
                stats.scanned as i64,
                stats.inserted as i64,
                stats.unchanged as i64,
                stats.drifted as i64,
                stats.renewed as i64,
                stats.alerts as i64,
                stats.skipped as i64,
                stats.failed_dirs as i64,
                stats.bytes_hashed.min(i64::MAX as u64) as i64,
                run_id
            ],
        )?;
        Ok(())
    }

    /// Most recent run, finished or not
    pub fn last_run(&self) -> Result<Option<RunRecord>> {
        let run = self
            .db
            .query_row(
                "SELECT id, mode, started_at, finished_at, scanned, inserted, unchanged,
                        drifted, renewed, alerts, skipped, failed_dirs, bytes_hashed
                 FROM runs
                 ORDER BY id DESC LIMIT 1",
                [],
                |row| {
                    let mode: String = row.get(1)?;
                    let started_at: i64 = row.get(2)?;
                    let finished_at: Option<i64> = row.get(3)?;
                    let mode: RunMode = mode.parse().map_err(|e: String| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into())
                    })?;
                    let count = |idx: usize| -> rusqlite::Result<usize> {
                        Ok(row.get::<_, Option<i64>>(idx)?.unwrap_or(0) as usize)
                    };

                    Ok(RunRecord {
                        id: row.get(0)?,
                        mode,
                        started_at: from_timestamp(started_at),
                        finished_at: finished_at.map(from_timestamp),
                        stats: RunStats {
                            scanned: count(4)?,
                            inserted: count(5)?,
                            unchanged: count(6)?,
                            drifted: count(7)?,
                            renewed: count(8)?,
                            alerts: count(9)?,
                            skipped: count(10)?,
                            failed_dirs: count(11)?,
                            bytes_hashed: row.get::<_, Option<i64>>(12)?.unwrap_or(0) as u64,
                        },
                    })
                },
            )
            .optional()?;

        Ok(run)
    }
}

/// Key used for storage and lookup
///
/// Windows paths are lower-cased and use forward slashes. Elsewhere the key is
/// the raw OS bytes of the path, so names that are not valid UTF-8 stay
/// distinct.
pub fn path_key(path: &Path) -> Vec<u8> {
    #[cfg(windows)]
    {
        path.to_string_lossy().to_lowercase().replace('\\', "/").into_bytes()
    }
    #[cfg(not(windows))]
    {
        path.as_os_str().as_encoded_bytes().to_vec()
    }
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_file_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("baseline.db");

        let store = BaselineStore::open(&db_path).unwrap();
        assert!(db_path.exists());
        assert_eq!(store.record_count().unwrap(), 0);
    }

    #[test]
    fn test_reopen_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("baseline.db");

        {
            let store = BaselineStore::open(&db_path).unwrap();
            store.insert(Path::new("/etc/hosts"), "abc", None).unwrap();
        }

        let store = BaselineStore::open(&db_path).unwrap();
        assert_eq!(store.record_count().unwrap(), 1);
        assert!(!store.find(Path::new("/etc/hosts")).unwrap().is_absent());
    }

    #[test]
    fn test_find_absent() {
        let store = BaselineStore::open_in_memory().unwrap();
        assert_eq!(store.find(Path::new("/nope")).unwrap(), Lookup::Absent);
    }

    #[test]
    fn test_find_after_insert() {
        let store = BaselineStore::open_in_memory().unwrap();
        store
            .insert(Path::new("/tmp/sample/a.go"), "9dd4e461268c8034f5c8564e155c67a6", Some(&b"x"[..]))
            .unwrap();

        let record = store.find(Path::new("/tmp/sample/a.go")).unwrap().into_record().unwrap();
        assert_eq!(record.path, "/tmp/sample/a.go");
        assert_eq!(record.hash, "9dd4e461268c8034f5c8564e155c67a6");
        assert_eq!(record.content.as_deref(), Some(&b"x"[..]));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn test_not_captured_and_empty_content_are_distinct() {
        let store = BaselineStore::open_in_memory().unwrap();
        store.insert(Path::new("/a.bin"), "h1", None).unwrap();
        store.insert(Path::new("/a.go"), "h2", Some(&b""[..])).unwrap();

        let bin = store.find(Path::new("/a.bin")).unwrap().into_record().unwrap();
        let go = store.find(Path::new("/a.go")).unwrap().into_record().unwrap();
        assert_eq!(bin.content, None);
        assert_eq!(go.content, Some(Vec::new()));
    }

    #[test]
    fn test_duplicate_insert() {
        let store = BaselineStore::open_in_memory().unwrap();
        store.insert(Path::new("/a"), "h1", None).unwrap();

        let err = store.insert(Path::new("/a"), "h2", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(ref p) if p == "/a"));

        let record = store.find(Path::new("/a")).unwrap().into_record().unwrap();
        assert_eq!(record.hash, "h1");
    }

    #[test]
    fn test_update_hash_keeps_content() {
        let store = BaselineStore::open_in_memory().unwrap();
        store.insert(Path::new("/a.go"), "old", Some(&b"x"[..])).unwrap();

        store.update_hash(Path::new("/a.go"), "new").unwrap();

        let record = store.find(Path::new("/a.go")).unwrap().into_record().unwrap();
        assert_eq!(record.hash, "new");
        assert_eq!(record.content.as_deref(), Some(&b"x"[..]));
        assert_eq!(store.record_count().unwrap(), 1);
    }

    #[test]
    fn test_update_hash_missing_record() {
        let store = BaselineStore::open_in_memory().unwrap();
        let err = store.update_hash(Path::new("/missing"), "h").unwrap_err();
        assert!(matches!(err, Error::MissingRecord(_)));
    }

    #[test]
    fn test_run_history() {
        let store = BaselineStore::open_in_memory().unwrap();
        assert!(store.last_run().unwrap().is_none());

        let run_id = store.start_run(RunMode::Check).unwrap();
        let open = store.last_run().unwrap().unwrap();
        assert_eq!(open.id, run_id);
        assert!(open.finished_at.is_none());

        let stats = RunStats {
            scanned: 3,
            inserted: 1,
            unchanged: 1,
            drifted: 1,
            alerts: 2,
            bytes_hashed: 42,
            ..Default::default()
        };
        store.finish_run(run_id, &stats).unwrap();

        let run = store.last_run().unwrap().unwrap();
        assert_eq!(run.mode, RunMode::Check);
        assert!(run.finished_at.is_some());
        assert_eq!(run.stats, stats);
    }

    #[test]
    fn test_unknown_run_mode_is_reported() {
        let store = BaselineStore::open_in_memory().unwrap();
        store
            .db
            .execute("INSERT INTO runs (mode, started_at) VALUES ('watch', 0)", [])
            .unwrap();

        let err = store.last_run().unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(rusqlite::Error::FromSqlConversionFailure(1, Type::Text, _))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_get_distinct_records() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let store = BaselineStore::open_in_memory().unwrap();
        let first = Path::new("/srv").join(OsStr::from_bytes(b"a\xff"));
        let second = Path::new("/srv").join(OsStr::from_bytes(b"a\xfe"));

        store.insert(&first, "h1", None).unwrap();
        store.insert(&second, "h2", None).unwrap();

        assert_eq!(store.record_count().unwrap(), 2);
        assert_eq!(store.find(&first).unwrap().into_record().unwrap().hash, "h1");
        assert_eq!(store.find(&second).unwrap().into_record().unwrap().hash, "h2");
    }
}
