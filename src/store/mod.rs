//! # Record Store
//!
//! The flat backing table the filesystem is projected from.
//!
//! [`RecordStore`] is the capability the rest of the crate consumes: get,
//! atomic put, delete, prefix listing and glob enumeration. [`SqliteStore`]
//! implements it over the standard `sqlar` table.
//!
//! Directory questions only need names, sizes and mtimes.
//! [`RecordStore::stat`], [`RecordStore::list_names`] and
//! [`RecordStore::newest_mtime`] answer them without touching payloads; the
//! defaults fall back to [`RecordStore::get`] and [`RecordStore::list_prefix`].
//!
//! ## Atomic replace
//!
//! [`RecordStore::put`] must look atomic to readers. Stores without a native
//! upsert sequence delete-if-exists and insert inside one transaction held
//! under the store's own lock. Replacing the same key concurrently through
//! separate connections is undefined without external locking.

mod sqlite;

pub use sqlite::SqliteStore;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::{FsError, GlobPattern, PathInfo, Record};

/// Flat name → record mapping backing a filesystem.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`; stores
/// use interior mutability for their connection.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn RecordStore`.
pub trait RecordStore: Send + Sync {
    /// Fetch the record stored under `name`.
    fn get(&self, name: &str) -> Result<Option<Record>, FsError>;

    /// Insert `record`, atomically replacing any record with the same name.
    fn put(&self, record: Record) -> Result<(), FsError>;

    /// Delete the record stored under `name`.
    ///
    /// Returns `true` if a record was removed.
    fn delete(&self, name: &str) -> Result<bool, FsError>;

    /// All records whose name starts with `prefix`, ordered by name.
    fn list_prefix(&self, prefix: &str) -> Result<RecordIter, FsError>;

    /// Describe the record stored under `name` without returning its payload.
    fn stat(&self, name: &str) -> Result<Option<PathInfo>, FsError> {
        Ok(self.get(name)?.map(|record| PathInfo::from_record(&record)))
    }

    /// Names of all records starting with `prefix`, ordered, without payloads.
    fn list_names(&self, prefix: &str) -> Result<Vec<String>, FsError> {
        self.list_prefix(prefix)?
            .map(|record| record.map(|r| r.name))
            .collect()
    }

    /// Largest mtime among records starting with `prefix`, `None` when there
    /// are none.
    fn newest_mtime(&self, prefix: &str) -> Result<Option<i64>, FsError> {
        let mut newest: Option<i64> = None;
        for record in self.list_prefix(prefix)? {
            let mtime = record?.mtime;
            newest = Some(newest.map_or(mtime, |n| n.max(mtime)));
        }
        Ok(newest)
    }

    /// Returns `true` if at least one record name starts with `prefix`.
    fn has_prefix(&self, prefix: &str) -> Result<bool, FsError> {
        match self.list_prefix(prefix)?.next() {
            Some(Ok(_)) => Ok(true),
            Some(Err(e)) => Err(e),
            None => Ok(false),
        }
    }

    /// Records whose name matches a shell-style glob.
    ///
    /// See [`GlobPattern::new`] for the anchored/unanchored semantics.
    fn enumerate(&self, pattern: &str, anchored: bool) -> Result<RecordIter, FsError> {
        let glob = GlobPattern::new(pattern, anchored)?;
        let records = self.list_prefix("")?;
        Ok(RecordIter::new(records.filter(move |item| match item {
            Ok(record) => glob.matches(&record.name),
            Err(_) => true,
        })))
    }

    /// Execute raw statements against the backing database.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] for stores without a query language
    fn exec(&self, _sql: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported {
            operation: "exec",
            details: String::from("store has no query language"),
        })
    }
}

/// Lazy sequence of records.
///
/// Wraps a boxed iterator so every store can hand back its own iteration
/// strategy. Each item's `Result` reports whether that row could be decoded.
pub struct RecordIter(Box<dyn Iterator<Item = Result<Record, FsError>> + Send + 'static>);

impl RecordIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<Record, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(records: Vec<Result<Record, FsError>>) -> Self {
        Self(Box::new(records.into_iter()))
    }

    /// Collect all records, short-circuiting on the first error.
    pub fn collect_all(self) -> Result<Vec<Record>, FsError> {
        self.collect()
    }
}

impl Iterator for RecordIter {
    type Item = Result<Record, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Current time in whole seconds since the epoch.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
