//! Error types for the sqlar filesystem layer.

/// Filesystem error type with contextual variants.
///
/// Variants carry the normalized path (and the failing operation where it
/// helps). Every error is local to the call that produced it: validation
/// always happens before any store mutation, so prior state is unchanged.
///
/// # Examples
///
/// ```rust
/// use sqlarfs::FsError;
///
/// let err = FsError::NotFound { path: "/missing".into() };
/// assert_eq!(err.to_string(), "not found: /missing");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/entry errors
    /// Path resolves to no record and implies no directory.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Expected a file but the path is a directory.
    #[error("{operation}: is a directory: {path}")]
    IsADirectory {
        /// The directory path.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a directory but the path is something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: String,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// An intermediate path segment is missing or not a directory.
    #[error("ancestor missing: {ancestor} (while resolving {path})")]
    AncestorMissing {
        /// The path whose ancestry was being validated.
        path: String,
        /// The first ancestor that is missing or not a directory.
        ancestor: String,
    },

    /// Directory has children.
    #[error("directory not empty: {path}")]
    NotEmpty {
        /// The non-empty directory.
        path: String,
    },

    /// The root directory can never be removed.
    #[error("cannot remove root directory")]
    CannotRemoveRoot,

    /// Path contains forbidden characters or escapes the root.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The raw path as supplied by the caller.
        path: String,
        /// What made it invalid.
        reason: &'static str,
    },

    // Handle errors
    /// Unsupported or contradictory open mode.
    #[error("invalid open mode: {mode} ({reason})")]
    InvalidMode {
        /// Textual form of the rejected mode.
        mode: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The handle was opened without the direction the operation needs.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path bound to the handle.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Seek target lies before the start of the file.
    #[error("invalid seek to {offset} in {path}")]
    InvalidSeek {
        /// The path bound to the handle.
        path: String,
        /// The (negative) target offset.
        offset: i64,
    },

    /// Operation on a closed handle.
    #[error("{operation}: handle closed: {path}")]
    Closed {
        /// The path bound to the handle.
        path: String,
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Operation after the filesystem closed its store connection.
    #[error("filesystem closed")]
    FilesystemClosed,

    // Backend/operation errors
    /// Operation is not supported by this layer.
    #[error("operation not supported: {operation} ({details})")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
        /// Which parts are unsupported.
        details: String,
    },

    /// The backing store failed.
    #[error("backend error: {0}")]
    Backend(#[from] rusqlite::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Attach a path and operation to a local I/O error.
    pub fn io(operation: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        FsError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for FsError {
    /// Unwraps an [`FsError`] that travelled through `std::io`; anything else
    /// becomes [`FsError::Io`].
    fn from(error: std::io::Error) -> Self {
        if !error.get_ref().is_some_and(|inner| inner.is::<FsError>()) {
            return FsError::io("io", "", error);
        }
        let kind = error.kind();
        match error.into_inner().map(|inner| inner.downcast::<FsError>()) {
            Some(Ok(fs_error)) => *fs_error,
            Some(Err(inner)) => FsError::io("io", "", std::io::Error::new(kind, inner)),
            None => FsError::io("io", "", std::io::Error::from(kind)),
        }
    }
}

impl From<FsError> for std::io::Error {
    fn from(error: FsError) -> Self {
        use std::io::ErrorKind;

        let kind = match &error {
            FsError::NotFound { .. } | FsError::AncestorMissing { .. } => ErrorKind::NotFound,
            FsError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            FsError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            FsError::InvalidPath { .. }
            | FsError::InvalidMode { .. }
            | FsError::InvalidSeek { .. } => ErrorKind::InvalidInput,
            FsError::NotSupported { .. } => ErrorKind::Unsupported,
            FsError::Io { source, .. } => source.kind(),
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, error)
    }
}
