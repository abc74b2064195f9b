//! # File Handle
//!
//! A buffered session between one path and the record store.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──▶ Unopened ──first access──▶ Buffered ⇄ Dirty ──close──▶ Closed
//! ```
//!
//! - The payload is fetched at most once per handle. Read-only handles fetch
//!   it at open; every other mode fetches it on the first `read`, `write`,
//!   `seek` or `truncate`.
//! - All edits apply to the in-memory buffer. A flush writes the whole
//!   buffer back as one record replacement.
//! - Handles of the same path are independent: the last flush wins, and a
//!   handle that already buffered the payload does not see later flushes.

use std::fmt;
use std::io::{self, SeekFrom};
use std::sync::Arc;

use crate::store::unix_now;
use crate::{
    DEFAULT_FILE_MODE, DirectorySynthesizer, FsError, OpenMode, Record, RecordStore, SharedStore,
};

/// An open file.
///
/// Implements [`std::io::Read`], [`std::io::Write`] and [`std::io::Seek`] on
/// top of the inherent methods. Dropping an open handle closes it; a flush
/// failure during drop is logged and otherwise lost, so call
/// [`close`](Self::close) to observe it.
///
/// # Example
///
/// ```rust
/// use sqlarfs::{OpenMode, SqlarFs};
/// use std::io::SeekFrom;
///
/// let fs = SqlarFs::in_memory().unwrap();
/// let mut file = fs.open("/notes.txt", OpenMode::WRITE).unwrap();
/// file.write(b"hello world").unwrap();
/// file.seek(SeekFrom::Start(6)).unwrap();
/// file.write(b"there").unwrap();
/// file.close().unwrap();
///
/// let mut file = fs.open("/notes.txt", OpenMode::READ).unwrap();
/// assert_eq!(file.read(None).unwrap(), b"hello there");
/// ```
pub struct FileHandle<S: RecordStore> {
    path: String,
    mode: OpenMode,
    shared: Arc<SharedStore<S>>,
    buffer: Option<Vec<u8>>,
    cursor: u64,
    dirty: bool,
    closed: bool,
}

impl<S: RecordStore + 'static> FileHandle<S> {
    /// Open `path` (already resolved) with `mode`.
    ///
    /// Create on a missing path and truncate on an existing one write an
    /// empty record before returning.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidMode`] for a contradictory mode
    /// - [`FsError::IsADirectory`] if `path` is a directory
    /// - [`FsError::AlreadyExists`] for exclusive create on an existing path
    /// - [`FsError::NotFound`] for a missing path without create
    /// - [`FsError::AncestorMissing`] when creating under a missing directory
    pub fn open(
        shared: Arc<SharedStore<S>>,
        dirs: &DirectorySynthesizer<S>,
        path: &str,
        mode: OpenMode,
    ) -> Result<Self, FsError> {
        mode.validate()?;
        shared.ensure_open()?;

        let existing = dirs.try_info(path)?;
        let mut buffer = None;
        match existing {
            Some(info) if info.is_dir() => {
                return Err(FsError::IsADirectory {
                    path: path.to_string(),
                    operation: "open",
                });
            }
            Some(_) if mode.exclusive => {
                return Err(FsError::AlreadyExists {
                    path: path.to_string(),
                    operation: "open",
                });
            }
            Some(info) if mode.truncate => {
                shared
                    .store()?
                    .put(Record::file(path, info.mode, unix_now(), Vec::new()))?;
                buffer = Some(Vec::new());
            }
            Some(_) => {}
            None if !mode.create => {
                return Err(FsError::NotFound {
                    path: path.to_string(),
                });
            }
            None => {
                dirs.validate_ancestors(path)?;
                shared
                    .store()?
                    .put(Record::file(path, DEFAULT_FILE_MODE, unix_now(), Vec::new()))?;
                buffer = Some(Vec::new());
            }
        }

        let mut handle = Self {
            path: path.to_string(),
            mode,
            shared,
            buffer: None,
            cursor: 0,
            dirty: false,
            closed: false,
        };
        handle.shared.register_handle();

        match buffer {
            Some(empty) => handle.buffer = Some(empty),
            None if !mode.writable() => {
                handle.load()?;
            }
            None => {}
        }
        tracing::debug!(path = %handle.path, mode = %mode, "opened handle");
        Ok(handle)
    }
}

impl<S: RecordStore> FileHandle<S> {
    /// The path this handle is bound to.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The mode this handle was opened with.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Current cursor position.
    pub fn tell(&self) -> u64 {
        self.cursor
    }

    /// Returns `true` while buffered edits have not been flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Read up to `size` bytes from the cursor, or everything up to the end
    /// when `size` is `None`. Returns an empty vector at end of file.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the handle is not readable
    pub fn read(&mut self, size: Option<usize>) -> Result<Vec<u8>, FsError> {
        self.check("read", self.mode.readable())?;
        let cursor = self.cursor;
        let buffer = self.load()?;

        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(buffer.len());
        let end = match size {
            Some(n) => start.saturating_add(n).min(buffer.len()),
            None => buffer.len(),
        };
        let bytes = buffer[start..end].to_vec();
        self.cursor += bytes.len() as u64;
        Ok(bytes)
    }

    /// Write `bytes` at the cursor, or at the end in append mode.
    ///
    /// A cursor past the end zero-fills the gap. Returns `bytes.len()`.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the handle is not writable
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize, FsError> {
        self.check("write", self.mode.writable())?;
        let append = self.mode.append;
        let cursor = self.cursor;
        let buffer = self.load()?;

        let start = if append {
            buffer.len()
        } else {
            to_index(cursor)?
        };
        let Some(end) = start.checked_add(bytes.len()) else {
            return Err(FsError::NotSupported {
                operation: "write",
                details: format!("writing {} bytes at offset {start} overflows", bytes.len()),
            });
        };
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[start..end].copy_from_slice(bytes);

        self.cursor = end as u64;
        self.dirty = true;
        Ok(bytes.len())
    }

    /// Move the cursor. The cursor may be placed past the end.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidSeek`] if the target is before byte 0
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        self.check("seek", true)?;
        let cursor = self.cursor;
        let len = self.load()?.len() as i128;

        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => cursor as i128 + delta as i128,
            SeekFrom::End(delta) => len + delta as i128,
        };
        let Ok(target) = u64::try_from(target) else {
            return Err(FsError::InvalidSeek {
                path: self.path.clone(),
                offset: i64::try_from(target).unwrap_or(i64::MIN),
            });
        };
        self.cursor = target;
        Ok(target)
    }

    /// Resize the file to `size` bytes, dropping the tail or padding with
    /// zeros. The cursor is left where it was.
    ///
    /// # Errors
    ///
    /// - [`FsError::PermissionDenied`] if the handle is not writable
    pub fn truncate(&mut self, size: u64) -> Result<(), FsError> {
        self.check("truncate", self.mode.writable())?;
        let size = to_index(size)?;
        self.load()?.resize(size, 0);
        self.dirty = true;
        Ok(())
    }

    /// Write the buffer back as one record replacement.
    ///
    /// No-op when nothing changed or the handle is not writable, even after
    /// the filesystem was closed. The mode of the existing record is carried
    /// forward; the mtime becomes now.
    pub fn flush(&mut self) -> Result<(), FsError> {
        if !self.closed && (!self.dirty || !self.mode.writable()) {
            return Ok(());
        }
        self.check("flush", true)?;
        let Some(buffer) = &self.buffer else {
            return Ok(());
        };

        let store = self.shared.store()?;
        let mode = store
            .stat(&self.path)?
            .map_or(DEFAULT_FILE_MODE, |info| info.mode);
        store.put(Record::file(&self.path, mode, unix_now(), buffer.clone()))?;
        self.dirty = false;
        tracing::debug!(path = %self.path, size = buffer.len(), "flushed handle");
        Ok(())
    }

    /// Flush pending edits and release the handle.
    ///
    /// Idempotent. The handle is closed even when the final flush fails; the
    /// failure is returned.
    pub fn close(&mut self) -> Result<(), FsError> {
        if self.closed {
            return Ok(());
        }
        let flushed = self.flush();
        self.closed = true;
        self.buffer = None;
        self.shared.release_handle();
        tracing::debug!(path = %self.path, "closed handle");
        flushed
    }

    fn check(&self, operation: &'static str, allowed: bool) -> Result<(), FsError> {
        if self.closed {
            return Err(FsError::Closed {
                path: self.path.clone(),
                operation,
            });
        }
        self.shared.ensure_open()?;
        if !allowed {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation,
            });
        }
        Ok(())
    }

    fn load(&mut self) -> Result<&mut Vec<u8>, FsError> {
        if self.buffer.is_none() {
            let data = self
                .shared
                .store()?
                .get(&self.path)?
                .and_then(|record| record.data)
                .unwrap_or_default();
            if self.mode.append {
                self.cursor = data.len() as u64;
            }
            tracing::debug!(path = %self.path, size = data.len(), "buffered payload");
            self.buffer = Some(data);
        }
        Ok(self.buffer.get_or_insert_with(Vec::new))
    }
}

fn to_index(offset: u64) -> Result<usize, FsError> {
    usize::try_from(offset).map_err(|_| FsError::NotSupported {
        operation: "seek",
        details: format!("offset {offset} exceeds addressable memory"),
    })
}

impl<S: RecordStore> fmt::Debug for FileHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("cursor", &self.cursor)
            .field("dirty", &self.dirty)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<S: RecordStore> Drop for FileHandle<S> {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!(path = %self.path, %error, "failed to flush dropped handle");
        }
    }
}

impl<S: RecordStore> io::Read for FileHandle<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let bytes = FileHandle::read(self, Some(buf.len()))?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }
}

impl<S: RecordStore> io::Write for FileHandle<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(FileHandle::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(FileHandle::flush(self)?)
    }
}

impl<S: RecordStore> io::Seek for FileHandle<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(FileHandle::seek(self, pos)?)
    }
}
