//! Shared, lazily opened store connection.
//!
//! The facade and every handle it opens hold an `Arc<SharedStore<S>>`.
//! Handles never own the store: they borrow it for the length of one call
//! through [`SharedStore::store`], so closing the facade takes effect for
//! all of them at once.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::{FsError, RecordStore};

type Opener<S> = Box<dyn Fn() -> Result<S, FsError> + Send + Sync>;

enum Slot<S> {
    Pending(Opener<S>),
    Open(Arc<S>),
    Closed,
}

/// Store connection shared between a filesystem and its handles.
pub struct SharedStore<S> {
    slot: Mutex<Slot<S>>,
    handles: AtomicUsize,
}

impl<S: RecordStore> SharedStore<S> {
    /// Defer opening the store until the first operation needs it.
    ///
    /// A failed open leaves the connection pending so the next call retries.
    pub fn lazy<F>(opener: F) -> Self
    where
        F: Fn() -> Result<S, FsError> + Send + Sync + 'static,
    {
        Self {
            slot: Mutex::new(Slot::Pending(Box::new(opener))),
            handles: AtomicUsize::new(0),
        }
    }

    /// Wrap an already open store.
    pub fn ready(store: S) -> Self {
        Self {
            slot: Mutex::new(Slot::Open(Arc::new(store))),
            handles: AtomicUsize::new(0),
        }
    }

    /// Borrow the store, opening it on first use.
    ///
    /// # Errors
    ///
    /// - [`FsError::FilesystemClosed`] after [`close`](Self::close)
    /// - whatever the opener returns on failure
    pub fn store(&self) -> Result<Arc<S>, FsError> {
        let mut slot = self.slot.lock();
        let store = match &*slot {
            Slot::Open(store) => return Ok(Arc::clone(store)),
            Slot::Closed => return Err(FsError::FilesystemClosed),
            Slot::Pending(open) => Arc::new(open()?),
        };
        tracing::debug!("store connection opened");
        *slot = Slot::Open(Arc::clone(&store));
        Ok(store)
    }

    /// Release the store. Returns `false` if it was already closed.
    ///
    /// Outstanding handles are not closed; their next operation fails with
    /// [`FsError::FilesystemClosed`].
    pub fn close(&self) -> bool {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Closed) {
            return false;
        }
        let outstanding = self.outstanding();
        if outstanding > 0 {
            tracing::warn!(outstanding, "closing store with open handles");
        }
        *slot = Slot::Closed;
        true
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Closed)
    }

    /// Fail with [`FsError::FilesystemClosed`] once closed.
    pub fn ensure_open(&self) -> Result<(), FsError> {
        if self.is_closed() {
            Err(FsError::FilesystemClosed)
        } else {
            Ok(())
        }
    }

    /// Number of handles currently registered.
    pub fn outstanding(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }

    pub(crate) fn register_handle(&self) {
        self.handles.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release_handle(&self) {
        self.handles.fetch_sub(1, Ordering::SeqCst);
    }
}
