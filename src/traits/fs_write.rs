//! Write-side operations: handles, removal and metadata.

use std::io::{Read, Seek, Write};

use crate::{FsError, MetadataUpdate, OpenMode};

/// Open files and change entries.
pub trait FsWrite: Send + Sync {
    /// Handle type returned by [`open`](FsWrite::open).
    type File: Read + Write + Seek;

    /// Open the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidMode`] for a contradictory mode
    /// - [`FsError::NotFound`] if missing and `mode` does not create
    /// - [`FsError::AlreadyExists`] for exclusive create on an existing file
    /// - [`FsError::IsADirectory`] if `path` is a directory
    /// - [`FsError::AncestorMissing`] when creating under a missing directory
    fn open(&self, path: &str, mode: OpenMode) -> Result<Self::File, FsError>;

    /// Delete the file or symlink at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::IsADirectory`] if `path` is a directory
    fn remove(&self, path: &str) -> Result<(), FsError>;

    /// Change stored metadata.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] naming every requested field
    fn set_metadata(&self, path: &str, update: &MetadataUpdate) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FileHandle, SqliteStore};

    #[test]
    fn fs_write_is_object_safe() {
        fn _check(_: &dyn FsWrite<File = FileHandle<SqliteStore>>) {}
    }
}
