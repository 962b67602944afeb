//! Live store handle
//!
//! The laboratory application keeps all of its data in one SQLite file. The
//! backup subsystem never owns that connection; it borrows a [`LiveStore`]
//! from the caller and only ever closes, reopens and pings it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};

use crate::error::{LabkeepError, LabkeepResult};

/// Handle to the application's live data store
///
/// `close` and `open` must be idempotent: closing a closed store or opening an
/// open one is a no-op.
pub trait LiveStore: Send + Sync {
    /// Release the connection so the backing file can be copied or replaced
    fn close(&self) -> LabkeepResult<()>;

    /// Re-establish the connection
    fn open(&self) -> LabkeepResult<()>;

    /// Location of the backing file
    fn file_path(&self) -> PathBuf;

    /// Run a trivial query against the open connection
    fn health_check(&self) -> LabkeepResult<()>;

    /// Rough number of rows across the store's tables. Diagnostic only.
    fn approximate_record_count(&self) -> Option<u64> {
        None
    }
}

/// SQLite-backed live store
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open an existing store file
    pub fn open_existing(path: impl Into<PathBuf>) -> LabkeepResult<Self> {
        let store = Self {
            path: path.into(),
            conn: Mutex::new(None),
        };
        store.open()?;
        Ok(store)
    }

    /// Create the store file if needed and open it
    pub fn create(path: impl Into<PathBuf>) -> LabkeepResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS store_info (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );
             INSERT OR IGNORE INTO store_info (key, value)
                 VALUES ('created_at', datetime('now'));",
        )?;

        Ok(Self {
            path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Run a closure against the open connection
    pub fn with_connection<T, F>(&self, f: F) -> LabkeepResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| LabkeepError::Storage(format!("Failed to acquire lock: {}", e)))?;

        let conn = guard
            .as_ref()
            .ok_or_else(|| LabkeepError::Storage("Store is closed".into()))?;

        Ok(f(conn)?)
    }

    /// Whether a connection is currently held
    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|c| c.is_some()).unwrap_or(false)
    }
}

impl LiveStore for SqliteStore {
    fn close(&self) -> LabkeepResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| LabkeepError::Storage(format!("Failed to acquire lock: {}", e)))?;

        if let Some(conn) = guard.take() {
            conn.close().map_err(|(conn, e)| {
                // Keep the handle so a later close can retry
                *guard = Some(conn);
                LabkeepError::Storage(format!("Failed to close store: {}", e))
            })?;
        }
        Ok(())
    }

    fn open(&self) -> LabkeepResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| LabkeepError::Storage(format!("Failed to acquire lock: {}", e)))?;

        if guard.is_none() {
            let conn = Connection::open_with_flags(
                &self.path,
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| {
                LabkeepError::Storage(format!(
                    "Failed to open store {}: {}",
                    self.path.display(),
                    e
                ))
            })?;
            *guard = Some(conn);
        }
        Ok(())
    }

    fn file_path(&self) -> PathBuf {
        self.path.clone()
    }

    fn health_check(&self) -> LabkeepResult<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })
        })?;
        Ok(())
    }

    fn approximate_record_count(&self) -> Option<u64> {
        self.with_connection(count_rows).ok()
    }
}

/// Sum of row counts over every user table
fn count_rows(conn: &Connection) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut total = 0u64;
    for table in tables {
        let sql = format!("SELECT count(*) FROM \"{}\"", table.replace('"', "\"\""));
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        total += count.max(0) as u64;
    }
    Ok(total)
}

/// Open a store file read-only and run a trivial metadata query
pub fn probe_read_only(path: &Path) -> LabkeepResult<()> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| LabkeepError::StructuralCorruption(e.to_string()))?;

    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| LabkeepError::StructuralCorruption(e.to_string()))?;

    Ok(())
}
