//! SQLite Archive (`sqlar`) record store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};

use super::{RecordIter, RecordStore};
use crate::{DEFAULT_FILE_MODE, FsError, PathInfo, Record};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sqlar(
    name TEXT PRIMARY KEY,
    mode INT,
    mtime INT,
    sz INT,
    data BLOB
);
"#;

const COLUMNS: &str = "name, mode, mtime, sz, data";

/// Rows fetched per round trip by [`RecordStore::list_prefix`].
const BATCH_SIZE: usize = 128;

/// Record store over the `sqlar` table of an SQLite database.
///
/// The connection sits behind a mutex; [`put`](RecordStore::put) replaces a
/// record by deleting and inserting inside one transaction while holding it.
/// Prefix listings fetch rows in batches, taking the lock once per batch.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open or create an archive at `path`, creating the table if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FsError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened sqlar archive");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing archive without write access.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, FsError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        tracing::debug!(path = %path.display(), "opened sqlar archive read-only");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory archive (for testing).
    pub fn in_memory() -> Result<Self, FsError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Location of the archive file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Keyset-paged scan over the names starting with a prefix.
struct PrefixBatches {
    conn: Arc<Mutex<Connection>>,
    prefix: String,
    after: Option<String>,
    pending: std::vec::IntoIter<Record>,
    exhausted: bool,
}

impl PrefixBatches {
    fn fetch(&self) -> Result<Vec<Record>, FsError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COLUMNS} FROM sqlar \
             WHERE substr(name, 1, ?2) = ?1 AND (?3 IS NULL OR name > ?3) \
             ORDER BY name LIMIT ?4"
        ))?;
        let rows = stmt.query_map(
            params![
                self.prefix,
                self.prefix.chars().count() as i64,
                self.after,
                BATCH_SIZE as i64,
            ],
            row_to_record,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl Iterator for PrefixBatches {
    type Item = Result<Record, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.next() {
                return Some(Ok(record));
            }
            if self.exhausted {
                return None;
            }
            match self.fetch() {
                Ok(batch) => {
                    self.exhausted = batch.len() < BATCH_SIZE;
                    if let Some(last) = batch.last() {
                        self.after = Some(last.name.clone());
                    }
                    self.pending = batch.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mode: Option<i64> = row.get(1)?;
    Ok(Record {
        name: row.get(0)?,
        mode: mode.map(|m| m as u32).unwrap_or(DEFAULT_FILE_MODE),
        mtime: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        size: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        data: row.get(4)?,
    })
}

impl RecordStore for SqliteStore {
    fn get(&self, name: &str) -> Result<Option<Record>, FsError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sqlar WHERE name = ?1"),
                params![name],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn put(&self, record: Record) -> Result<(), FsError> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sqlar WHERE name = ?1", params![record.name])?;
        tx.execute(
            "INSERT INTO sqlar (name, mode, mtime, sz, data) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.name,
                record.mode as i64,
                record.mtime,
                record.size,
                record.data,
            ],
        )?;
        tx.commit()?;
        tracing::debug!(name = %record.name, size = record.size, "stored record");
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool, FsError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM sqlar WHERE name = ?1", params![name])?;
        tracing::debug!(name = %name, removed, "deleted record");
        Ok(removed > 0)
    }

    fn list_prefix(&self, prefix: &str) -> Result<RecordIter, FsError> {
        Ok(RecordIter::new(PrefixBatches {
            conn: Arc::clone(&self.conn),
            prefix: prefix.to_string(),
            after: None,
            pending: Vec::new().into_iter(),
            exhausted: false,
        }))
    }

    fn stat(&self, name: &str) -> Result<Option<PathInfo>, FsError> {
        // an empty blob stands in for the payload so files stay files
        let record = self
            .conn
            .lock()
            .query_row(
                "SELECT name, mode, mtime, sz, CASE WHEN data IS NULL THEN NULL ELSE x'' END \
                 FROM sqlar WHERE name = ?1",
                params![name],
                row_to_record,
            )
            .optional()?;
        Ok(record.map(|record| PathInfo::from_record(&record)))
    }

    fn list_names(&self, prefix: &str) -> Result<Vec<String>, FsError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT name FROM sqlar WHERE substr(name, 1, ?2) = ?1 ORDER BY name")?;
        let names = stmt
            .query_map(params![prefix, prefix.chars().count() as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn newest_mtime(&self, prefix: &str) -> Result<Option<i64>, FsError> {
        let conn = self.conn.lock();
        let (count, newest): (i64, Option<i64>) = conn.query_row(
            "SELECT COUNT(*), MAX(mtime) FROM sqlar WHERE substr(name, 1, ?2) = ?1",
            params![prefix, prefix.chars().count() as i64],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((count > 0).then(|| newest.unwrap_or(0)))
    }

    fn has_prefix(&self, prefix: &str) -> Result<bool, FsError> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT 1 FROM sqlar WHERE substr(name, 1, ?2) = ?1 LIMIT 1",
                params![prefix, prefix.chars().count() as i64],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn exec(&self, sql: &str) -> Result<(), FsError> {
        self.conn.lock().execute_batch(sql)?;
        tracing::debug!("executed raw sql");
        Ok(())
    }
}
