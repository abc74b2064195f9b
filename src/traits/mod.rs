//! # Filesystem Traits
//!
//! The seams consumers program against.
//!
//! ```text
//! FsRead + FsWrite + FsDir = FileSystem
//! ```
//!
//! [`FileSystem`] has a blanket implementation: implement the three
//! components and the composite comes for free. [`SqlarFs`](crate::SqlarFs)
//! is the implementation this crate ships.
//!
//! ```rust
//! use sqlarfs::{FileSystem, FsError, OpenMode};
//! use std::io::Write;
//!
//! fn save<F: FileSystem>(fs: &F, path: &str, data: &[u8]) -> Result<(), FsError> {
//!     let mut file = fs.open(path, OpenMode::WRITE)?;
//!     file.write_all(data)?;
//!     file.flush()?;
//!     Ok(())
//! }
//!
//! let fs = sqlarfs::SqlarFs::in_memory().unwrap();
//! save(&fs, "/out.bin", b"\x00\x01").unwrap();
//! assert_eq!(fs.get_info("/out.bin").unwrap().size, 2);
//! ```

mod fs_dir;
mod fs_read;
mod fs_write;

pub use fs_dir::FsDir;
pub use fs_read::FsRead;
pub use fs_write::FsWrite;

/// Complete filesystem: reading, writing and directory operations.
pub trait FileSystem: FsRead + FsWrite + FsDir {}

impl<T: FsRead + FsWrite + FsDir> FileSystem for T {}
