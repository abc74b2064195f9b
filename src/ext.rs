//! # Extension Traits
//!
//! Convenience methods for any [`FileSystem`].
//!
//! ## Overview
//!
//! [`FsExt`] provides whole-file helpers and existence checks that are not
//! part of the core traits. They are default methods with a blanket
//! implementation, so every `FileSystem` gets them for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`exists`](FsExt::exists) | Check if anything exists at a path |
//! | [`is_file`](FsExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Check if path is a directory |
//! | [`is_symlink`](FsExt::is_symlink) | Check if path is a symbolic link |
//! | [`read_bytes`](FsExt::read_bytes) | Read a whole file |
//! | [`read_string`](FsExt::read_string) | Read a whole UTF-8 file |
//! | [`write_bytes`](FsExt::write_bytes) | Replace a whole file |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `FsExtJson` adds `read_json` and
//! `write_json`.

use std::io::{Read, Write};

use crate::{FileSystem, FsError, OpenMode, PathInfo};

/// Extension methods for any filesystem.
///
/// # Example
///
/// ```rust
/// use sqlarfs::{FsExt, SqlarFs};
///
/// let fs = SqlarFs::in_memory().unwrap();
/// fs.write_bytes("/config.toml", b"answer = 42").unwrap();
/// assert!(fs.is_file("/config.toml").unwrap());
/// assert_eq!(fs.read_bytes("/config.toml").unwrap(), b"answer = 42");
/// ```
pub trait FsExt: FileSystem {
    /// Check if anything exists at `path`, including implied directories.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn exists(&self, path: &str) -> Result<bool, FsError> {
        Ok(info_if_present(self, path)?.is_some())
    }

    /// Check if the path points to a regular file.
    fn is_file(&self, path: &str) -> Result<bool, FsError> {
        Ok(info_if_present(self, path)?.is_some_and(|info| info.is_file()))
    }

    /// Check if the path points to a directory.
    fn is_dir(&self, path: &str) -> Result<bool, FsError> {
        Ok(info_if_present(self, path)?.is_some_and(|info| info.is_dir()))
    }

    /// Check if the path points to a symbolic link.
    fn is_symlink(&self, path: &str) -> Result<bool, FsError> {
        Ok(info_if_present(self, path)?.is_some_and(|info| info.is_symlink()))
    }

    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`FsWrite::open`](crate::FsWrite::open) in read mode.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let mut file = self.open(path, OpenMode::READ)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read the whole file at `path` as UTF-8.
    ///
    /// # Errors
    ///
    /// - [`FsError::Deserialization`] if the bytes are not valid UTF-8
    fn read_string(&self, path: &str) -> Result<String, FsError> {
        String::from_utf8(self.read_bytes(path)?)
            .map_err(|e| FsError::Deserialization(e.to_string()))
    }

    /// Create or replace the file at `path` with `data`.
    fn write_bytes(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let mut file = self.open(path, OpenMode::WRITE)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }
}

fn info_if_present<F: FileSystem + ?Sized>(
    fs: &F,
    path: &str,
) -> Result<Option<PathInfo>, FsError> {
    match fs.get_info(path) {
        Ok(info) => Ok(Some(info)),
        Err(FsError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

impl<B: FileSystem + ?Sized> FsExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON helpers over [`FsExt`].
    pub trait FsExtJson: FsExt {
        /// Read and deserialize the JSON file at `path`.
        fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FsError> {
            let data = self.read_bytes(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }

        /// Serialize `value` as pretty JSON into `path`.
        fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            self.write_bytes(path, &json)
        }
    }

    impl<B: FsExt + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Record, RecordStore, SqlarFs};

    fn fixture() -> SqlarFs {
        let fs = SqlarFs::in_memory().unwrap();
        fs.make_directory("/dir", false).unwrap();
        fs.write_bytes("/dir/file.txt", b"contents").unwrap();
        fs.store()
            .unwrap()
            .put(Record::symlink("/link", 0o777, 0, "/dir/file.txt"))
            .unwrap();
        fs
    }

    #[test]
    fn type_checks() {
        let fs = fixture();
        assert!(fs.is_file("/dir/file.txt").unwrap());
        assert!(!fs.is_file("/dir").unwrap());
        assert!(fs.is_dir("/dir").unwrap());
        assert!(fs.is_dir("/").unwrap());
        assert!(fs.is_symlink("/link").unwrap());
        assert!(!fs.is_file("/link").unwrap());
    }

    #[test]
    fn missing_paths_are_false_not_errors() {
        let fs = fixture();
        assert!(!fs.exists("/missing").unwrap());
        assert!(!fs.is_file("/missing").unwrap());
        assert!(!fs.is_dir("/missing").unwrap());
    }

    #[test]
    fn invalid_paths_still_error() {
        let fs = fixture();
        assert!(matches!(
            fs.exists("/bad:path"),
            Err(FsError::InvalidPath { .. })
        ));
    }

    #[test]
    fn whole_file_round_trip() {
        let fs = fixture();
        assert_eq!(fs.read_bytes("/dir/file.txt").unwrap(), b"contents");
        fs.write_bytes("/dir/file.txt", b"new").unwrap();
        assert_eq!(fs.read_string("/dir/file.txt").unwrap(), "new");
        assert_eq!(fs.open_handles(), 0);
    }

    #[test]
    fn read_bytes_keeps_error_kind() {
        let fs = fixture();
        assert!(matches!(
            fs.read_bytes("/missing"),
            Err(FsError::NotFound { .. })
        ));
        assert!(matches!(
            fs.write_bytes("/nodir/file", b""),
            Err(FsError::AncestorMissing { .. })
        ));
    }

    #[test]
    fn read_string_rejects_invalid_utf8() {
        let fs = fixture();
        fs.write_bytes("/bin", &[0xff, 0xfe]).unwrap();
        assert!(matches!(
            fs.read_string("/bin"),
            Err(FsError::Deserialization(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        use std::collections::BTreeMap;

        let fs = fixture();
        let mut value = BTreeMap::new();
        value.insert("answer".to_string(), 42);
        fs.write_json("/dir/data.json", &value).unwrap();
        let back: BTreeMap<String, i32> = fs.read_json("/dir/data.json").unwrap();
        assert_eq!(back, value);

        assert!(matches!(
            fs.read_json::<BTreeMap<String, i32>>("/dir/file.txt"),
            Err(FsError::Deserialization(_))
        ));
    }
}
