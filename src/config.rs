//! Filesystem configuration.

/// Options for opening a [`SqlarFs`](crate::SqlarFs).
///
/// ```rust
/// use sqlarfs::FsConfig;
///
/// let config = FsConfig::default().root("/site").read_only(true);
/// assert_eq!(config.root, "/site");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FsConfig {
    /// Prefix applied to every caller path. Defaults to `/`.
    pub root: String,
    /// Open the archive without write access and refuse writable handles.
    pub read_only: bool,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            root: String::from("/"),
            read_only: false,
        }
    }
}

impl FsConfig {
    /// Set the root prefix.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Set read-only access.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}
