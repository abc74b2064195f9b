//! Read-side operations: info and listings.

use crate::{FsError, Page, PathInfo, ScanIter};

/// Inspect entries and list directories.
///
/// Paths are caller-supplied and resolved by the implementation.
pub trait FsRead: Send + Sync {
    /// Describe the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::InvalidPath`] if `path` cannot be resolved
    fn get_info(&self, path: &str) -> Result<PathInfo, FsError>;

    /// Names of the direct children of `path`, in lexicographic order.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::NotADirectory`] if `path` is not a directory
    fn list(&self, path: &str) -> Result<Vec<String>, FsError>;

    /// Lazily describe the direct children of `path`, optionally paged.
    ///
    /// # Errors
    ///
    /// Same as [`list`](FsRead::list).
    fn scandir(&self, path: &str, page: Option<Page>) -> Result<ScanIter, FsError>;
}
