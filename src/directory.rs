//! # Directory Synthesizer
//!
//! Answers "what is at this path" and "what is inside this directory" over a
//! flat namespace.
//!
//! ## Rules
//!
//! - The root is always a directory, stamped with the query time.
//! - An explicit record always wins: a directory marker is a directory, any
//!   other record is a file or symlink.
//! - With no record, a path is a directory if some record name starts with
//!   `path + "/"`. Such implied directories get mode `0o777` and the mtime of
//!   their newest descendant.
//!
//! Listings are ordered lexicographically by child name. Descendants more
//! than one level down contribute their first segment as an implied child.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::path_resolver::{child_prefix, join};
use crate::store::unix_now;
use crate::{
    DEFAULT_DIR_MODE, FsError, Page, PathInfo, PathResolver, Record, RecordStore, SharedStore,
};

/// Directory operations over a shared record store.
///
/// Every path handed to these methods must already be resolved by the
/// [`PathResolver`] the synthesizer was built with.
pub struct DirectorySynthesizer<S> {
    shared: Arc<SharedStore<S>>,
    resolver: PathResolver,
}

impl<S> Clone for DirectorySynthesizer<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            resolver: self.resolver.clone(),
        }
    }
}

impl<S: RecordStore + 'static> DirectorySynthesizer<S> {
    /// Create a synthesizer over `shared`.
    pub fn new(shared: Arc<SharedStore<S>>, resolver: PathResolver) -> Self {
        Self { shared, resolver }
    }

    /// Describe the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if there is neither a record nor an implied
    ///   directory at `path`
    pub fn get_info(&self, path: &str) -> Result<PathInfo, FsError> {
        if self.resolver.is_root(path) {
            self.shared.ensure_open()?;
            return Ok(PathInfo::synthesized_dir(path, unix_now()));
        }

        let store = self.shared.store()?;
        if let Some(info) = store.stat(path)? {
            return Ok(info);
        }

        match store.newest_mtime(&child_prefix(path))? {
            Some(mtime) => Ok(PathInfo::synthesized_dir(path, mtime)),
            None => Err(FsError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Like [`get_info`](Self::get_info) but maps `NotFound` to `None`.
    pub fn try_info(&self, path: &str) -> Result<Option<PathInfo>, FsError> {
        match self.get_info(path) {
            Ok(info) => Ok(Some(info)),
            Err(FsError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns `true` if `path` is a directory, `false` if it is missing or
    /// not a directory.
    pub fn is_dir(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.try_info(path)?.is_some_and(|info| info.is_dir()))
    }

    /// Require every ancestor of `path` below the root to be a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::AncestorMissing`] naming the first missing ancestor
    pub fn validate_ancestors(&self, path: &str) -> Result<(), FsError> {
        self.resolver
            .validate_ancestors(path, |ancestor| self.is_dir(ancestor))
    }

    /// List the direct children of `path`.
    ///
    /// Child names are gathered up front without reading payloads; their
    /// [`PathInfo`] is computed lazily, after `page` has been applied.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::NotADirectory`] if `path` is not a directory
    pub fn scan(&self, path: &str, page: Option<Page>) -> Result<ScanIter, FsError> {
        if !self.get_info(path)?.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }

        let prefix = child_prefix(path);
        let store = self.shared.store()?;
        let mut children = BTreeSet::new();
        for name in store.list_names(&prefix)? {
            let Some(rest) = name.strip_prefix(prefix.as_str()) else {
                continue;
            };
            match rest.split('/').next() {
                Some(child) if !child.is_empty() => {
                    children.insert(child.to_string());
                }
                _ => {}
            }
        }

        let Page { skip, take } = page.unwrap_or(Page::new(0, usize::MAX));
        let this = self.clone();
        let dir = path.to_string();
        Ok(ScanIter::new(
            children
                .into_iter()
                .skip(skip)
                .take(take)
                .map(move |child| this.get_info(&join(&dir, &child))),
        ))
    }

    /// Create a directory marker at `path`.
    ///
    /// With `recreate`, an existing directory is accepted and returned.
    ///
    /// # Errors
    ///
    /// - [`FsError::AncestorMissing`] if the parent chain is incomplete
    /// - [`FsError::AlreadyExists`] if a directory exists and `recreate` is
    ///   false, or a file or symlink occupies `path`
    pub fn make_directory(&self, path: &str, recreate: bool) -> Result<PathInfo, FsError> {
        let exists = || FsError::AlreadyExists {
            path: path.to_string(),
            operation: "make_directory",
        };

        self.validate_ancestors(path)?;

        if let Some(info) = self.try_info(path)? {
            return if info.is_dir() && recreate {
                Ok(info)
            } else {
                Err(exists())
            };
        }

        let record = Record::directory(path, DEFAULT_DIR_MODE, unix_now());
        let info = PathInfo::from_record(&record);
        self.shared.store()?.put(record)?;
        tracing::debug!(path = %path, "created directory");
        Ok(info)
    }

    /// Create `path` and every missing ancestor.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component exists as a file or symlink
    pub fn make_directories(&self, path: &str) -> Result<PathInfo, FsError> {
        let mut current = String::from(self.resolver.root());
        let tail = path
            .strip_prefix(self.resolver.root())
            .unwrap_or(path)
            .to_string();

        let mut last = self.get_info(&current)?;
        for segment in tail.split('/').filter(|s| !s.is_empty()) {
            current = join(&current, segment);
            last = match self.try_info(&current)? {
                Some(info) if info.is_dir() => info,
                Some(_) => {
                    return Err(FsError::NotADirectory { path: current });
                }
                None => self.make_directory(&current, true)?,
            };
        }
        Ok(last)
    }

    /// Delete the directory marker at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::CannotRemoveRoot`] for the root
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::NotADirectory`] if `path` is a file or symlink
    /// - [`FsError::NotEmpty`] if the directory has children
    pub fn remove_directory(&self, path: &str) -> Result<(), FsError> {
        if self.resolver.is_root(path) {
            return Err(FsError::CannotRemoveRoot);
        }
        if !self.get_info(path)?.is_dir() {
            return Err(FsError::NotADirectory {
                path: path.to_string(),
            });
        }

        let store = self.shared.store()?;
        if store.has_prefix(&child_prefix(path))? {
            return Err(FsError::NotEmpty {
                path: path.to_string(),
            });
        }
        store.delete(path)?;
        tracing::debug!(path = %path, "removed directory");
        Ok(())
    }
}

/// Lazy sequence of directory entries.
///
/// Compose paging with the usual `skip(n).take(m)`; restart by calling
/// `scan` again.
pub struct ScanIter(Box<dyn Iterator<Item = Result<PathInfo, FsError>> + Send + 'static>);

impl ScanIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<PathInfo, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Collect all entries, short-circuiting on the first error.
    pub fn collect_all(self) -> Result<Vec<PathInfo>, FsError> {
        self.collect()
    }
}

impl Iterator for ScanIter {
    type Item = Result<PathInfo, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
