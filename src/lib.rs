//! # sqlarfs
//!
//! A hierarchical filesystem view over a flat **SQLite Archive** (`sqlar`)
//! table.
//!
//! An archive stores one row per name: `{name, mode, mtime, sz, data}`.
//! There is no directory table. This crate resolves paths, synthesizes
//! directories from name prefixes, and gives POSIX-like buffered file
//! handles on top of the rows.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use sqlarfs::{FsExt, OpenMode, SqlarFs};
//! use std::io::SeekFrom;
//!
//! let fs = SqlarFs::in_memory()?;
//! fs.make_directory("/a", false)?;
//!
//! let mut file = fs.open("/a/b.txt", OpenMode::WRITE)?;
//! file.write(b"hello")?;
//! file.close()?;
//!
//! assert_eq!(fs.list("/a")?, vec!["b.txt"]);
//!
//! let mut file = fs.open_str("/a/b.txt", "r+")?;
//! file.seek(SeekFrom::End(0))?;
//! file.write(b" world")?;
//! file.close()?;
//! assert_eq!(fs.read_bytes("/a/b.txt")?, b"hello world");
//! # Ok::<(), sqlarfs::FsError>(())
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`SqlarFs`] | Filesystem facade: info, listings, directories, handles |
//! | [`FileHandle`] | Buffered open file with `std::io` traits |
//! | [`RecordStore`] | Capability trait for the flat backing table |
//! | [`SqliteStore`] | `RecordStore` over an SQLite `sqlar` table |
//! | [`PathResolver`] | Normalizes, validates and roots caller paths |
//! | [`FsError`] | Error type with path and operation context |
//! | [`PathInfo`] | Derived description of one entry |
//! | [`OpenMode`] | Validated set of open options |
//!
//! ---
//!
//! ## Directories
//!
//! A path is a directory when its record is a directory marker (`sz = 0`,
//! `data IS NULL`), or when it has no record and some other name starts
//! with `path + "/"`. Explicit records always win. Implied directories
//! report mode `0o777` and the mtime of their newest descendant; the root is
//! always a directory stamped with the current time.
//!
//! ---
//!
//! ## Trait Seams
//!
//! ```text
//! FsRead + FsWrite + FsDir = FileSystem
//! ```
//!
//! [`FsExt`] adds whole-file helpers to any [`FileSystem`]; with the `serde`
//! feature, `FsExtJson` adds JSON helpers.
//!
//! ---
//!
//! ## Thread Safety
//!
//! [`SqlarFs`] and [`RecordStore`] implementations are `Send + Sync`.
//! Handles of the same path are not coordinated: the last flush wins.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialize/deserialize for data types, plus JSON helpers |

// Private modules
mod config;
mod connection;
mod directory;
mod error;
mod ext;
mod fs;
mod glob;
mod handle;
mod path_resolver;
mod store;
mod traits;
mod types;

// Public modules
pub mod archive;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - data types
pub use types::{
    DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, FileType, MetadataUpdate, OpenMode, OpenOption, Page,
    PathInfo, Record, SYMLINK_SIZE,
};

// Public re-exports - traits
pub use traits::{FileSystem, FsDir, FsRead, FsWrite};

// Public re-exports - store
pub use store::{RecordIter, RecordStore, SqliteStore, unix_now};

// Public re-exports - path resolution and matching
pub use glob::{GlobPattern, has_magic};
pub use path_resolver::{FORBIDDEN_CHARS, PathResolver};

// Public re-exports - filesystem
pub use config::FsConfig;
pub use connection::SharedStore;
pub use directory::{DirectorySynthesizer, ScanIter};
pub use fs::SqlarFs;
pub use handle::FileHandle;

// Public re-exports - infrastructure
pub use ext::FsExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
