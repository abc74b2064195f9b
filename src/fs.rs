//! # Filesystem Facade
//!
//! [`SqlarFs`] composes path resolution, directory synthesis and file
//! handles over one shared store connection.
//!
//! Every caller path goes through the [`PathResolver`] first, so the
//! components below only ever see normalized, rooted names.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    DirectorySynthesizer, FileHandle, FsConfig, FsDir, FsError, FsRead, FsWrite, MetadataUpdate,
    OpenMode, Page, PathInfo, PathResolver, RecordStore, ScanIter, SharedStore, SqliteStore,
};

/// Hierarchical filesystem over a flat record store.
///
/// # Example
///
/// ```rust
/// use sqlarfs::{OpenMode, SqlarFs};
///
/// let fs = SqlarFs::in_memory().unwrap();
/// fs.make_directory("/a", false).unwrap();
///
/// let mut file = fs.open("/a/b.txt", OpenMode::WRITE).unwrap();
/// file.write(b"hello").unwrap();
/// file.close().unwrap();
///
/// assert_eq!(fs.list("/a").unwrap(), vec!["b.txt"]);
/// fs.remove("/a/b.txt").unwrap();
/// fs.remove_directory("/a").unwrap();
/// ```
pub struct SqlarFs<S: RecordStore + 'static = SqliteStore> {
    shared: Arc<SharedStore<S>>,
    resolver: PathResolver,
    dirs: DirectorySynthesizer<S>,
    read_only: bool,
}

impl SqlarFs<SqliteStore> {
    /// Use the archive at `path`. The file is opened on first use.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `config.root` is not a valid path
    pub fn new<P: AsRef<Path>>(path: P, config: FsConfig) -> Result<Self, FsError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let read_only = config.read_only;
        let shared = SharedStore::lazy(move || {
            if read_only {
                SqliteStore::open_read_only(&path)
            } else {
                SqliteStore::open(&path)
            }
        });
        Self::with_shared(Arc::new(shared), config)
    }

    /// Filesystem over a fresh in-memory archive.
    pub fn in_memory() -> Result<Self, FsError> {
        Self::from_store(SqliteStore::in_memory()?, FsConfig::default())
    }
}

impl<S: RecordStore + 'static> SqlarFs<S> {
    /// Filesystem over an already open store.
    pub fn from_store(store: S, config: FsConfig) -> Result<Self, FsError> {
        Self::with_shared(Arc::new(SharedStore::ready(store)), config)
    }

    fn with_shared(shared: Arc<SharedStore<S>>, config: FsConfig) -> Result<Self, FsError> {
        let resolver = PathResolver::new(&config.root)?;
        let dirs = DirectorySynthesizer::new(Arc::clone(&shared), resolver.clone());
        Ok(Self {
            shared,
            resolver,
            dirs,
            read_only: config.read_only,
        })
    }

    /// Resolve a caller path to the record name it addresses.
    pub fn resolve(&self, path: &str) -> Result<String, FsError> {
        self.resolver.resolve(path)
    }

    /// Borrow the underlying store, opening it if needed.
    pub fn store(&self) -> Result<Arc<S>, FsError> {
        self.shared.store()
    }

    /// See [`FsRead::get_info`].
    pub fn get_info(&self, path: &str) -> Result<PathInfo, FsError> {
        let path = self.resolve(path)?;
        self.dirs.get_info(&path)
    }

    /// See [`FsRead::list`].
    pub fn list(&self, path: &str) -> Result<Vec<String>, FsError> {
        self.scandir(path, None)?
            .map(|info| info.map(|info| info.name))
            .collect()
    }

    /// See [`FsRead::scandir`].
    pub fn scandir(&self, path: &str, page: Option<Page>) -> Result<ScanIter, FsError> {
        let path = self.resolve(path)?;
        self.dirs.scan(&path, page)
    }

    /// See [`FsDir::make_directory`].
    pub fn make_directory(&self, path: &str, recreate: bool) -> Result<PathInfo, FsError> {
        let path = self.resolve(path)?;
        self.check_writable(&path, "make_directory")?;
        self.dirs.make_directory(&path, recreate)
    }

    /// See [`FsDir::make_directories`].
    pub fn make_directories(&self, path: &str) -> Result<PathInfo, FsError> {
        let path = self.resolve(path)?;
        self.check_writable(&path, "make_directories")?;
        self.dirs.make_directories(&path)
    }

    /// See [`FsDir::remove_directory`].
    pub fn remove_directory(&self, path: &str) -> Result<(), FsError> {
        let path = self.resolve(path)?;
        self.check_writable(&path, "remove_directory")?;
        self.dirs.remove_directory(&path)
    }

    /// See [`FsWrite::open`].
    pub fn open(&self, path: &str, mode: OpenMode) -> Result<FileHandle<S>, FsError> {
        let path = self.resolve(path)?;
        if mode.writable() || mode.create || mode.truncate {
            self.check_writable(&path, "open")?;
        }
        FileHandle::open(Arc::clone(&self.shared), &self.dirs, &path, mode)
    }

    /// Open with a conventional mode string such as `"r"`, `"w+"` or `"ab"`.
    pub fn open_str(&self, path: &str, mode: &str) -> Result<FileHandle<S>, FsError> {
        self.open(path, mode.parse()?)
    }

    /// See [`FsWrite::remove`].
    pub fn remove(&self, path: &str) -> Result<(), FsError> {
        let path = self.resolve(path)?;
        self.check_writable(&path, "remove")?;
        if self.dirs.get_info(&path)?.is_dir() {
            return Err(FsError::IsADirectory {
                path,
                operation: "remove",
            });
        }
        self.shared.store()?.delete(&path)?;
        tracing::debug!(path = %path, "removed file");
        Ok(())
    }

    /// See [`FsWrite::set_metadata`].
    pub fn set_metadata(&self, path: &str, update: &MetadataUpdate) -> Result<(), FsError> {
        let path = self.resolve(path)?;
        self.dirs.get_info(&path)?;
        let fields = update.fields();
        if fields.is_empty() {
            return Ok(());
        }
        Err(FsError::NotSupported {
            operation: "set_metadata",
            details: fields.join(", "),
        })
    }

    /// Close the store connection. Returns `false` if already closed.
    ///
    /// Open handles are not flushed; their next operation fails with
    /// [`FsError::FilesystemClosed`].
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Returns `true` once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of handles opened from this filesystem and not yet closed.
    pub fn open_handles(&self) -> usize {
        self.shared.outstanding()
    }

    fn check_writable(&self, path: &str, operation: &'static str) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::PermissionDenied {
                path: path.to_string(),
                operation,
            });
        }
        Ok(())
    }
}

impl<S: RecordStore + 'static> FsRead for SqlarFs<S> {
    fn get_info(&self, path: &str) -> Result<PathInfo, FsError> {
        SqlarFs::get_info(self, path)
    }

    fn list(&self, path: &str) -> Result<Vec<String>, FsError> {
        SqlarFs::list(self, path)
    }

    fn scandir(&self, path: &str, page: Option<Page>) -> Result<ScanIter, FsError> {
        SqlarFs::scandir(self, path, page)
    }
}

impl<S: RecordStore + 'static> FsWrite for SqlarFs<S> {
    type File = FileHandle<S>;

    fn open(&self, path: &str, mode: OpenMode) -> Result<Self::File, FsError> {
        SqlarFs::open(self, path, mode)
    }

    fn remove(&self, path: &str) -> Result<(), FsError> {
        SqlarFs::remove(self, path)
    }

    fn set_metadata(&self, path: &str, update: &MetadataUpdate) -> Result<(), FsError> {
        SqlarFs::set_metadata(self, path, update)
    }
}

impl<S: RecordStore + 'static> FsDir for SqlarFs<S> {
    fn make_directory(&self, path: &str, recreate: bool) -> Result<PathInfo, FsError> {
        SqlarFs::make_directory(self, path, recreate)
    }

    fn make_directories(&self, path: &str) -> Result<PathInfo, FsError> {
        SqlarFs::make_directories(self, path)
    }

    fn remove_directory(&self, path: &str) -> Result<(), FsError> {
        SqlarFs::remove_directory(self, path)
    }
}
