//! # Path Resolver
//!
//! Normalizes, validates and roots caller-supplied paths before any store
//! access.
//!
//! ## Responsibility
//! - Reject forbidden characters (`\`, `:`, `@`, newline, NUL)
//! - Collapse `.` and `..` segments against an absolute convention
//! - Prefix the configured root
//! - Check that every ancestor of a path is a directory
//!
//! ## Usage
//!
//! ```rust
//! use sqlarfs::PathResolver;
//!
//! let resolver = PathResolver::new("/").unwrap();
//! assert_eq!(resolver.resolve("a/./b/../c.txt").unwrap(), "/a/c.txt");
//! assert!(resolver.resolve("c:\\windows").is_err());
//! ```

use crate::FsError;

/// Characters never allowed in any path component.
pub const FORBIDDEN_CHARS: [char; 5] = ['\\', ':', '@', '\n', '\0'];

/// Resolves raw paths into normalized absolute record names.
///
/// Resolution is idempotent: resolving an already-resolved path returns it
/// unchanged, including when a non-`/` root is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    root: String,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self {
            root: String::from("/"),
        }
    }
}

impl PathResolver {
    /// Create a resolver rooted at `root` (itself normalized).
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `root` is not a valid path
    pub fn new(root: &str) -> Result<Self, FsError> {
        let root = normalize(root)?;
        Ok(Self { root })
    }

    /// The configured root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns `true` if `path` (already resolved) is the root, or `/`.
    pub fn is_root(&self, path: &str) -> bool {
        path == "/" || path == self.root
    }

    /// Resolve a caller-supplied path to a normalized, rooted record name.
    ///
    /// Relative paths are taken relative to the root; the empty path is the
    /// root itself.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for forbidden characters or a `..` that
    ///   climbs above the top
    pub fn resolve(&self, raw: &str) -> Result<String, FsError> {
        let normalized = normalize(raw)?;
        if self.root == "/" || within(&normalized, &self.root) {
            return Ok(normalized);
        }
        if normalized == "/" {
            Ok(self.root.clone())
        } else {
            Ok(format!("{}{}", self.root, normalized))
        }
    }

    /// Require every ancestor of `path` between it and the root to be a
    /// directory.
    ///
    /// `is_dir` answers whether an (already resolved) ancestor exists as a
    /// directory. Walks from the parent upwards and stops at the first
    /// failure; nothing is modified.
    ///
    /// # Errors
    ///
    /// - [`FsError::AncestorMissing`] naming the first bad ancestor
    /// - any error returned by `is_dir`
    pub fn validate_ancestors<F>(&self, path: &str, mut is_dir: F) -> Result<(), FsError>
    where
        F: FnMut(&str) -> Result<bool, FsError>,
    {
        let mut current = path;
        while let Some(ancestor) = parent(current) {
            if self.is_root(ancestor) {
                break;
            }
            if !is_dir(ancestor)? {
                return Err(FsError::AncestorMissing {
                    path: path.to_string(),
                    ancestor: ancestor.to_string(),
                });
            }
            current = ancestor;
        }
        Ok(())
    }
}

/// Parent of a normalized path; `None` for `/`.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Final segment of a normalized path; empty for `/`.
pub fn leaf(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// Join a normalized directory and a single segment.
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Prefix every descendant of `dir` starts with.
pub fn child_prefix(dir: &str) -> String {
    if dir == "/" {
        String::from("/")
    } else {
        format!("{dir}/")
    }
}

fn within(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn normalize(raw: &str) -> Result<String, FsError> {
    if raw.contains(FORBIDDEN_CHARS) {
        return Err(FsError::InvalidPath {
            path: raw.to_string(),
            reason: "forbidden character",
        });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(FsError::InvalidPath {
                        path: raw.to_string(),
                        reason: "traverses above the root",
                    });
                }
            }
            s => segments.push(s),
        }
    }

    Ok(format!("/{}", segments.join("/")))
}

// ============================================================================
// Tests
// ============================================================================
