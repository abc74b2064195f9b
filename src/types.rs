//! Core types for the sqlar filesystem layer.

use std::fmt;
use std::str::FromStr;

use crate::FsError;

/// Mode stored on directory markers and synthesized directories.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// Mode given to regular files created through a handle.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Size value that marks a record as a symbolic link.
pub const SYMLINK_SIZE: i64 = -1;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory (explicit marker or implied by a name prefix).
    Directory,
    /// Symbolic link; the payload holds the target text.
    Symlink,
}

impl FileType {
    /// Short label used by archive listings.
    pub const fn label(self) -> &'static str {
        match self {
            FileType::File => "FILE",
            FileType::Directory => "DIR",
            FileType::Symlink => "SYM",
        }
    }
}

/// One entry of the flat archive.
///
/// The `size` field encodes the entry type:
///
/// | `size` | `data` | meaning |
/// |--------|--------|---------|
/// | `-1` | link target | symbolic link |
/// | `0` | absent | directory marker |
/// | `0` | empty | empty regular file |
/// | `>0` | bytes | regular file |
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Record {
    /// Normalized absolute path; unique key.
    pub name: String,
    /// Permission/type bits, opaque to this layer.
    pub mode: u32,
    /// Modification time in seconds since the epoch.
    pub mtime: i64,
    /// Size, see the table above.
    pub size: i64,
    /// Payload bytes, absent for directory markers.
    pub data: Option<Vec<u8>>,
}

impl Record {
    /// A directory marker.
    pub fn directory(name: impl Into<String>, mode: u32, mtime: i64) -> Self {
        Self {
            name: name.into(),
            mode,
            mtime,
            size: 0,
            data: None,
        }
    }

    /// A regular file; `size` follows the payload length.
    pub fn file(name: impl Into<String>, mode: u32, mtime: i64, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mode,
            mtime,
            size: data.len() as i64,
            data: Some(data),
        }
    }

    /// A symbolic link pointing at `target`.
    pub fn symlink(name: impl Into<String>, mode: u32, mtime: i64, target: &str) -> Self {
        Self {
            name: name.into(),
            mode,
            mtime,
            size: SYMLINK_SIZE,
            data: Some(target.as_bytes().to_vec()),
        }
    }

    /// Decode the entry type from `size` and `data`.
    pub fn file_type(&self) -> FileType {
        match (self.size, &self.data) {
            (SYMLINK_SIZE, _) => FileType::Symlink,
            (0, None) => FileType::Directory,
            _ => FileType::File,
        }
    }

    /// Returns `true` for directory markers.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }
}

/// Information about a path, derived from a record or synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathInfo {
    /// Leaf name (empty for the root).
    pub name: String,
    /// Full normalized path.
    pub path: String,
    /// Type of the entry.
    pub file_type: FileType,
    /// Stored size (`-1` for symlinks, `0` for directories).
    pub size: i64,
    /// Modification time in seconds since the epoch.
    pub mtime: i64,
    /// Raw mode bits.
    pub mode: u32,
}

impl PathInfo {
    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Describe a stored record.
    pub fn from_record(record: &Record) -> Self {
        Self {
            name: crate::path_resolver::leaf(&record.name).to_string(),
            path: record.name.clone(),
            file_type: record.file_type(),
            size: record.size,
            mtime: record.mtime,
            mode: record.mode,
        }
    }

    /// Describe a directory that has no record of its own.
    pub fn synthesized_dir(path: &str, mtime: i64) -> Self {
        Self {
            name: crate::path_resolver::leaf(path).to_string(),
            path: path.to_string(),
            file_type: FileType::Directory,
            size: 0,
            mtime,
            mode: DEFAULT_DIR_MODE,
        }
    }
}

/// A single open option; combine them into an [`OpenMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenOption {
    /// Allow reading.
    Read,
    /// Allow writing at the cursor.
    Write,
    /// Allow writing; every write lands at the end.
    Append,
    /// Create the file if it does not exist.
    Create,
    /// Fail if the file already exists.
    Exclusive,
    /// Empty the file when opening.
    Truncate,
}

/// Set of [`OpenOption`]s, validated once when a handle is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenMode {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Writes go to end of file.
    pub append: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Fail if the file exists.
    pub exclusive: bool,
    /// Truncate file to zero length on open.
    pub truncate: bool,
}

impl OpenMode {
    /// Read-only access (`"r"`).
    pub const READ: Self = Self {
        read: true,
        write: false,
        append: false,
        create: false,
        exclusive: false,
        truncate: false,
    };

    /// Write access with create and truncate (`"w"`).
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        append: false,
        create: true,
        exclusive: false,
        truncate: true,
    };

    /// Read and write access to an existing file (`"r+"`).
    pub const READ_WRITE: Self = Self {
        read: true,
        write: true,
        append: false,
        create: false,
        exclusive: false,
        truncate: false,
    };

    /// Append mode, creating the file if needed (`"a"`).
    pub const APPEND: Self = Self {
        read: false,
        write: false,
        append: true,
        create: true,
        exclusive: false,
        truncate: false,
    };

    /// Exclusive creation (`"x"`).
    pub const CREATE_NEW: Self = Self {
        read: false,
        write: true,
        append: false,
        create: true,
        exclusive: true,
        truncate: false,
    };

    /// Build a mode from individual options.
    pub fn from_options(options: &[OpenOption]) -> Self {
        options
            .iter()
            .fold(Self::default(), |mode, option| mode.with(*option))
    }

    /// Return a copy with `option` added.
    pub const fn with(mut self, option: OpenOption) -> Self {
        match option {
            OpenOption::Read => self.read = true,
            OpenOption::Write => self.write = true,
            OpenOption::Append => self.append = true,
            OpenOption::Create => self.create = true,
            OpenOption::Exclusive => self.exclusive = true,
            OpenOption::Truncate => self.truncate = true,
        }
        self
    }

    /// Returns `true` if `option` is part of this mode.
    pub const fn contains(&self, option: OpenOption) -> bool {
        match option {
            OpenOption::Read => self.read,
            OpenOption::Write => self.write,
            OpenOption::Append => self.append,
            OpenOption::Create => self.create,
            OpenOption::Exclusive => self.exclusive,
            OpenOption::Truncate => self.truncate,
        }
    }

    /// Handle may read.
    #[inline]
    pub const fn readable(&self) -> bool {
        self.read
    }

    /// Handle may write (plain or append).
    #[inline]
    pub const fn writable(&self) -> bool {
        self.write || self.append
    }

    /// Reject contradictory or incomplete combinations.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidMode`] naming the offending combination
    pub fn validate(&self) -> Result<(), FsError> {
        let reason = if !self.read && !self.writable() {
            Some("no read, write or append access")
        } else if self.exclusive && !self.create {
            Some("exclusive requires create")
        } else if self.append && self.truncate {
            Some("append and truncate are contradictory")
        } else if self.truncate && !self.write {
            Some("truncate requires write")
        } else if self.create && !self.writable() {
            Some("create requires write or append")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(FsError::InvalidMode {
                mode: self.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.read, 'r'),
            (self.write, 'w'),
            (self.append, 'a'),
            (self.create, 'c'),
            (self.exclusive, 'x'),
            (self.truncate, 't'),
        ];
        for (set, c) in flags {
            if set {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for OpenMode {
    type Err = FsError;

    /// Parse a conventional mode string: one of `r`, `w`, `a`, `x`,
    /// optionally followed by `+` and/or `b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| FsError::InvalidMode {
            mode: s.to_string(),
            reason,
        };

        let mut chars = s.chars();
        let mut mode = match chars.next() {
            Some('r') => Self::READ,
            Some('w') => Self::WRITE,
            Some('a') => Self::APPEND,
            Some('x') => Self::CREATE_NEW,
            Some(_) => return Err(invalid("must start with r, w, a or x")),
            None => return Err(invalid("empty mode")),
        };

        let (mut plus, mut binary) = (false, false);
        for c in chars {
            match c {
                '+' if !plus => {
                    plus = true;
                    mode.read = true;
                    if !mode.append {
                        mode.write = true;
                    }
                }
                'b' if !binary => binary = true,
                't' => return Err(invalid("text mode is not supported")),
                '+' | 'b' => return Err(invalid("repeated flag")),
                _ => return Err(invalid("unknown flag")),
            }
        }

        mode.validate()?;
        Ok(mode)
    }
}

/// Metadata changes requested through `set_metadata`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetadataUpdate {
    /// New permission bits.
    pub mode: Option<u32>,
    /// New modification time, seconds since the epoch.
    pub mtime: Option<i64>,
}

impl MetadataUpdate {
    /// Names of the fields this update would change.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.mode.is_some() {
            fields.push("mode");
        }
        if self.mtime.is_some() {
            fields.push("mtime");
        }
        fields
    }
}

/// A `(skip, take)` window over a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Number of qualifying entries to skip.
    pub skip: usize,
    /// Maximum number of entries to yield after skipping.
    pub take: usize,
}

impl Page {
    /// Create a page window.
    pub const fn new(skip: usize, take: usize) -> Self {
        Self { skip, take }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_from_size_and_payload() {
        assert_eq!(
            Record::directory("/d", DEFAULT_DIR_MODE, 0).file_type(),
            FileType::Directory
        );
        assert_eq!(
            Record::file("/f", DEFAULT_FILE_MODE, 0, Vec::new()).file_type(),
            FileType::File
        );
        assert_eq!(
            Record::file("/f", DEFAULT_FILE_MODE, 0, b"abc".to_vec()).size,
            3
        );
        assert_eq!(
            Record::symlink("/l", 0o777, 0, "/target").file_type(),
            FileType::Symlink
        );
    }

    #[test]
    fn empty_file_is_not_a_directory() {
        let record = Record::file("/empty", DEFAULT_FILE_MODE, 0, Vec::new());
        assert_eq!(record.size, 0);
        assert!(!record.is_dir());
    }

    #[test]
    fn open_mode_constants() {
        assert!(OpenMode::READ.readable());
        assert!(!OpenMode::READ.writable());

        assert!(OpenMode::WRITE.writable());
        assert!(OpenMode::WRITE.create);
        assert!(OpenMode::WRITE.truncate);

        assert!(OpenMode::APPEND.writable());
        assert!(!OpenMode::APPEND.truncate);

        assert!(OpenMode::CREATE_NEW.exclusive);
    }

    #[test]
    fn open_mode_from_options() {
        let mode = OpenMode::from_options(&[OpenOption::Read, OpenOption::Write]);
        assert_eq!(mode, OpenMode::READ_WRITE);
        assert!(mode.contains(OpenOption::Write));
        assert!(!mode.contains(OpenOption::Create));
    }

    #[test]
    fn open_mode_validation() {
        assert!(OpenMode::default().validate().is_err());
        assert!(
            OpenMode::from_options(&[OpenOption::Write, OpenOption::Exclusive])
                .validate()
                .is_err()
        );
        assert!(
            OpenMode::from_options(&[OpenOption::Append, OpenOption::Truncate])
                .validate()
                .is_err()
        );
        assert!(
            OpenMode::from_options(&[OpenOption::Read, OpenOption::Truncate])
                .validate()
                .is_err()
        );
        assert!(
            OpenMode::from_options(&[OpenOption::Read, OpenOption::Create])
                .validate()
                .is_err()
        );
        for mode in [
            OpenMode::READ,
            OpenMode::WRITE,
            OpenMode::READ_WRITE,
            OpenMode::APPEND,
            OpenMode::CREATE_NEW,
        ] {
            assert!(mode.validate().is_ok(), "{mode}");
        }
    }

    #[test]
    fn parse_mode_strings() {
        assert_eq!("r".parse::<OpenMode>().unwrap(), OpenMode::READ);
        assert_eq!("rb".parse::<OpenMode>().unwrap(), OpenMode::READ);
        assert_eq!("r+".parse::<OpenMode>().unwrap(), OpenMode::READ_WRITE);
        assert_eq!("wb".parse::<OpenMode>().unwrap(), OpenMode::WRITE);
        assert_eq!("x".parse::<OpenMode>().unwrap(), OpenMode::CREATE_NEW);

        let append_read: OpenMode = "a+".parse().unwrap();
        assert!(append_read.read && append_read.append && !append_read.write);

        let write_read: OpenMode = "w+b".parse().unwrap();
        assert!(write_read.read && write_read.write && write_read.truncate);
    }

    #[test]
    fn parse_rejects_bad_mode_strings() {
        for bad in ["", "q", "rt", "r++", "rbb", "wz"] {
            let result = bad.parse::<OpenMode>();
            assert!(
                matches!(result, Err(FsError::InvalidMode { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn metadata_update_fields() {
        assert!(MetadataUpdate::default().fields().is_empty());
        let update = MetadataUpdate {
            mtime: Some(5),
            ..MetadataUpdate::default()
        };
        assert_eq!(update.fields(), vec!["mtime"]);
    }

    #[test]
    fn file_type_labels() {
        assert_eq!(FileType::File.label(), "FILE");
        assert_eq!(FileType::Directory.label(), "DIR");
        assert_eq!(FileType::Symlink.label(), "SYM");
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<Record>();
        assert_send_sync::<PathInfo>();
        assert_send_sync::<OpenMode>();
        assert_send_sync::<Page>();
    }
}
