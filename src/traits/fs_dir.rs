//! Directory operations.

use crate::{FsError, PathInfo};

/// Create and remove directories.
pub trait FsDir: Send + Sync {
    /// Create a directory marker at `path`.
    ///
    /// With `recreate`, an existing directory is accepted.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `path` exists (and is not an
    ///   accepted directory)
    /// - [`FsError::AncestorMissing`] if the parent chain is incomplete
    fn make_directory(&self, path: &str, recreate: bool) -> Result<PathInfo, FsError>;

    /// Create `path` and every missing ancestor.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component exists as a file
    fn make_directories(&self, path: &str) -> Result<PathInfo, FsError>;

    /// Remove the empty directory at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::CannotRemoveRoot`] for the root
    /// - [`FsError::NotFound`] if missing
    /// - [`FsError::NotADirectory`] if `path` is not a directory
    /// - [`FsError::NotEmpty`] if it has children
    fn remove_directory(&self, path: &str) -> Result<(), FsError>;
}
