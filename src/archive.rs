//! # Archive Tool
//!
//! Archive, extract and list operations over a [`RecordStore`], plus the
//! listing line formatter used by the `sqlar` binary.
//!
//! Stored names follow the filesystem convention: absolute, forward-slash
//! separated. Local paths are normalized lexically before they are stored,
//! and leading `../` segments are dropped, so `../src/lib.rs` is stored as
//! `/src/lib.rs`. Extraction strips the leading `/` again and writes below
//! the destination directory.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use walkdir::WalkDir;

use crate::glob::has_magic;
use crate::{FsError, GlobPattern, PathInfo, PathResolver, Record, RecordStore};

/// Narrowest name column [`format_entry`] will produce.
pub const MIN_NAME_WIDTH: usize = 8;

/// Columns taken by everything except the name.
const FIXED_COLUMNS: usize = 54;

/// Store local files, directories and symlinks matching `patterns`.
///
/// Literal paths are walked recursively. Patterns containing `*`, `?` or
/// `[` are expanded against the local filesystem, with `**` crossing
/// directories; matching directories are stored without their contents.
/// Existing records with the same name are replaced. `on_entry` sees every
/// stored record.
///
/// Returns the number of records stored.
///
/// # Errors
///
/// - [`FsError::NotFound`] if a literal path does not exist
/// - [`FsError::Io`] if a local file cannot be read
pub fn archive<S, F>(store: &S, patterns: &[String], mut on_entry: F) -> Result<usize, FsError>
where
    S: RecordStore + ?Sized,
    F: FnMut(&PathInfo),
{
    let mut stored = 0;
    for pattern in patterns {
        for local in expand(pattern)? {
            let Some(name) = archive_name(&local) else {
                tracing::warn!(path = %local.display(), "skipping path that cannot be stored");
                continue;
            };
            let record = read_local(&local, name)?;
            on_entry(&PathInfo::from_record(&record));
            store.put(record)?;
            stored += 1;
        }
    }
    tracing::info!(stored, "archived entries");
    Ok(stored)
}

/// Recreate records matching `patterns` (all records when empty) below
/// `dest`.
///
/// Directories are created, symlinks re-created, empty files touched and
/// regular files written. Returns the number of records extracted.
///
/// # Errors
///
/// - [`FsError::InvalidPath`] for a stored name that escapes `dest`
/// - [`FsError::Io`] for local filesystem failures
pub fn extract<S, F>(
    store: &S,
    patterns: &[String],
    dest: &Path,
    mut on_entry: F,
) -> Result<usize, FsError>
where
    S: RecordStore + ?Sized,
    F: FnMut(&PathInfo),
{
    let resolver = PathResolver::default();
    let mut extracted = 0;
    for record in find(store, patterns)? {
        let record = record?;
        let name = resolver.resolve(&record.name)?;
        let target = dest.join(name.trim_start_matches('/'));
        on_entry(&PathInfo::from_record(&record));
        write_local(&record, &target)?;
        extracted += 1;
    }
    tracing::info!(extracted, dest = %dest.display(), "extracted entries");
    Ok(extracted)
}

/// Report records matching `patterns` (all records when empty).
///
/// Returns the number of records listed.
pub fn list<S, F>(store: &S, patterns: &[String], mut on_entry: F) -> Result<usize, FsError>
where
    S: RecordStore + ?Sized,
    F: FnMut(&PathInfo),
{
    let mut listed = 0;
    for record in find(store, patterns)? {
        on_entry(&PathInfo::from_record(&record?));
        listed += 1;
    }
    Ok(listed)
}

/// Records matching any of `patterns` (unanchored), in name order.
fn find<S>(
    store: &S,
    patterns: &[String],
) -> Result<impl Iterator<Item = Result<Record, FsError>>, FsError>
where
    S: RecordStore + ?Sized,
{
    let globs = patterns
        .iter()
        .map(|pattern| GlobPattern::new(pattern, false))
        .collect::<Result<Vec<_>, _>>()?;
    let records = store.list_prefix("")?;
    Ok(records.filter(move |item| match item {
        Ok(record) => globs.is_empty() || globs.iter().any(|glob| glob.matches(&record.name)),
        Err(_) => true,
    }))
}

/// Format one listing line for a terminal `width` columns wide.
///
/// ```rust
/// use sqlarfs::{FileType, PathInfo};
/// use sqlarfs::archive::format_entry;
///
/// let info = PathInfo {
///     name: "b.txt".into(),
///     path: "/a/b.txt".into(),
///     file_type: FileType::File,
///     size: 5,
///     mtime: 1_700_000_000,
///     mode: 0o644,
/// };
/// let line = format_entry(&info, 80);
/// assert!(line.starts_with("FILE  /a/b.txt"));
/// assert!(line.ends_with("                   5"));
/// ```
pub fn format_entry(info: &PathInfo, width: usize) -> String {
    let name_width = width.saturating_sub(FIXED_COLUMNS).max(MIN_NAME_WIDTH);
    format!(
        "{:<5} {:<name_width$} {:<5} {:<19} {:>20}",
        info.file_type.label(),
        shorten_middle(&info.path, name_width),
        info.mode,
        info.mtime,
        info.size,
    )
}

/// Shorten `text` to `width` characters by replacing its middle with `...`.
pub fn shorten_middle(text: &str, width: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mid = chars.len() / 2;
    let remove = chars.len() - keep;
    let left_end = mid.saturating_sub(remove / 2);
    let right_start = (mid + remove - remove / 2).min(chars.len());

    let mut out: String = chars[..left_end].iter().collect();
    out.push_str("...");
    out.extend(&chars[right_start..]);
    out
}

fn expand(pattern: &str) -> Result<Vec<PathBuf>, FsError> {
    if !has_magic(pattern) {
        let root = Path::new(pattern);
        if fs::symlink_metadata(root).is_err() {
            return Err(FsError::NotFound {
                path: pattern.to_string(),
            });
        }
        return walk(root, |_| true);
    }

    let glob = GlobPattern::path_aware(pattern.trim_start_matches("./"))?;
    let base: Vec<&str> = pattern
        .split('/')
        .take_while(|segment| !has_magic(segment))
        .collect();
    let base = match base.join("/") {
        joined if joined.is_empty() && pattern.starts_with('/') => String::from("/"),
        joined if joined.is_empty() => String::from("."),
        joined => joined,
    };
    if fs::symlink_metadata(&base).is_err() {
        tracing::warn!(pattern = %pattern, "no files match");
        return Ok(Vec::new());
    }
    let matches = walk(Path::new(&base), |path| {
        let text = path.to_string_lossy();
        glob.matches(text.strip_prefix("./").unwrap_or(&text))
    })?;
    if matches.is_empty() {
        tracing::warn!(pattern = %pattern, "no files match");
    }
    Ok(matches)
}

fn walk<P>(root: &Path, mut keep: P) -> Result<Vec<PathBuf>, FsError>
where
    P: FnMut(&Path) -> bool,
{
    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map_or_else(|| root.display().to_string(), |p| p.display().to_string());
            FsError::io("walk", path, e.into())
        })?;
        if keep(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}

/// Stored name for a local path, or `None` if the path cannot be stored.
fn archive_name(local: &Path) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    for component in local.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?.to_string()),
            Component::ParentDir => {
                segments.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if segments.is_empty() {
        return None;
    }
    PathResolver::default()
        .resolve(&segments.join("/"))
        .ok()
}

fn read_local(local: &Path, name: String) -> Result<Record, FsError> {
    let shown = || local.display().to_string();
    let meta = fs::symlink_metadata(local).map_err(|e| FsError::io("stat", shown(), e))?;
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs() as i64);
    let mode = local_mode(&meta);

    if meta.file_type().is_symlink() {
        let target = fs::read_link(local).map_err(|e| FsError::io("read_link", shown(), e))?;
        Ok(Record::symlink(name, mode, mtime, &target.to_string_lossy()))
    } else if meta.is_dir() {
        Ok(Record::directory(name, mode, mtime))
    } else {
        let data = fs::read(local).map_err(|e| FsError::io("read", shown(), e))?;
        Ok(Record::file(name, mode, mtime, data))
    }
}

#[cfg(unix)]
fn local_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn local_mode(meta: &fs::Metadata) -> u32 {
    if meta.is_dir() {
        crate::DEFAULT_DIR_MODE
    } else {
        crate::DEFAULT_FILE_MODE
    }
}

fn write_local(record: &Record, target: &Path) -> Result<(), FsError> {
    let shown = || target.display().to_string();
    let make_parent = || match target.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|e| FsError::io("create_dir", shown(), e))
        }
        None => Ok(()),
    };

    match record.file_type() {
        crate::FileType::Directory => {
            fs::create_dir_all(target).map_err(|e| FsError::io("create_dir", shown(), e))
        }
        crate::FileType::Symlink => {
            make_parent()?;
            let link = String::from_utf8_lossy(record.data.as_deref().unwrap_or_default());
            if fs::symlink_metadata(target).is_ok() {
                fs::remove_file(target).map_err(|e| FsError::io("remove", shown(), e))?;
            }
            make_symlink(link.as_ref(), target).map_err(|e| FsError::io("symlink", shown(), e))
        }
        crate::FileType::File => {
            make_parent()?;
            let data = record.data.as_deref().unwrap_or_default();
            if data.is_empty() {
                fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(target)
                    .map(drop)
                    .map_err(|e| FsError::io("touch", shown(), e))
            } else {
                fs::write(target, data).map_err(|e| FsError::io("write", shown(), e))
            }
        }
    }
}

#[cfg(unix)]
fn make_symlink(link: &str, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn make_symlink(_link: &str, _target: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "symlinks are only extracted on unix",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, FileType, SqliteStore};

    fn info(path: &str, file_type: FileType, size: i64) -> PathInfo {
        PathInfo {
            name: crate::path_resolver::leaf(path).to_string(),
            path: path.to_string(),
            file_type,
            size,
            mtime: 1_700_000_000,
            mode: 33188,
        }
    }

    fn names(store: &SqliteStore) -> Vec<String> {
        store
            .list_prefix("")
            .unwrap()
            .map(|r| r.unwrap().name)
            .collect()
    }

    #[test]
    fn shorten_middle_keeps_width() {
        assert_eq!(shorten_middle("short", 10), "short");
        let shortened = shorten_middle("abcdefghijklmnopqrstuvwxyz", 10);
        assert_eq!(shortened.chars().count(), 10);
        assert!(shortened.starts_with("abc"));
        assert!(shortened.ends_with("xyz"));
        assert!(shortened.contains("..."));
    }

    #[test]
    fn format_entry_columns() {
        let line = format_entry(&info("/dir", FileType::Directory, 0), 80);
        assert!(line.starts_with("DIR   /dir "));
        // 5 + 1 + 26 + 1 + 5 + 1 + 19 + 1 + 20
        assert_eq!(line.chars().count(), 79);

        let long = format!("/{}", "n".repeat(100));
        let line = format_entry(&info(&long, FileType::Symlink, -1), 80);
        assert!(line.starts_with("SYM   /nnn"));
        assert!(line.contains("..."));
        assert_eq!(line.chars().count(), 79);
    }

    #[test]
    fn format_entry_narrow_terminal() {
        let line = format_entry(&info("/some/long/name", FileType::File, 3), 10);
        assert!(line.contains("/s...ame"));
    }

    #[test]
    fn archive_name_normalizes() {
        assert_eq!(archive_name(Path::new("../../src/lib.rs")).unwrap(), "/src/lib.rs");
        assert_eq!(archive_name(Path::new("./a/./b")).unwrap(), "/a/b");
        assert_eq!(archive_name(Path::new("/abs/file")).unwrap(), "/abs/file");
        assert!(archive_name(Path::new("..")).is_none());
        assert!(archive_name(Path::new("odd:name")).is_none());
    }

    #[test]
    fn archive_walks_directories_and_replaces() {
        let work = tempfile::tempdir().unwrap();
        let root = work.path().join("tree");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), b"alpha").unwrap();
        fs::write(root.join("sub/empty"), b"").unwrap();

        let store = SqliteStore::in_memory().unwrap();
        let pattern = vec![root.to_string_lossy().into_owned()];
        let mut seen = Vec::new();
        let stored = archive(&store, &pattern, |info| seen.push(info.file_type)).unwrap();
        assert_eq!(stored, 4);
        assert_eq!(seen[0], FileType::Directory);

        let base = archive_name(&root).unwrap();
        let file = store.get(&format!("{base}/a.txt")).unwrap().unwrap();
        assert_eq!(file.data.as_deref(), Some(&b"alpha"[..]));
        let empty = store.get(&format!("{base}/sub/empty")).unwrap().unwrap();
        assert_eq!(empty.file_type(), FileType::File);

        fs::write(root.join("a.txt"), b"beta").unwrap();
        archive(&store, &pattern, |_| {}).unwrap();
        assert_eq!(names(&store).len(), 4);
        let file = store.get(&format!("{base}/a.txt")).unwrap().unwrap();
        assert_eq!(file.data.as_deref(), Some(&b"beta"[..]));
    }

    #[test]
    fn archive_expands_globs() {
        let work = tempfile::tempdir().unwrap();
        let root = work.path().to_string_lossy().into_owned();
        fs::create_dir_all(work.path().join("d/e")).unwrap();
        fs::write(work.path().join("d/one.rs"), b"1").unwrap();
        fs::write(work.path().join("d/e/two.rs"), b"2").unwrap();
        fs::write(work.path().join("d/three.txt"), b"3").unwrap();

        let store = SqliteStore::in_memory().unwrap();
        let stored = archive(&store, &[format!("{root}/d/**/*.rs")], |_| {}).unwrap();
        assert_eq!(stored, 2);
        assert!(names(&store).iter().all(|n| n.ends_with(".rs")));

        let stored = archive(&store, &[format!("{root}/nomatch/*.rs")], |_| {}).unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn archive_missing_literal_is_not_found() {
        let store = SqliteStore::in_memory().unwrap();
        let missing = vec![String::from("/definitely/not/here")];
        assert!(matches!(
            archive(&store, &missing, |_| {}),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn list_filters_by_pattern() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Record::directory("/a", DEFAULT_DIR_MODE, 0)).unwrap();
        store.put(Record::file("/a/x.txt", DEFAULT_FILE_MODE, 0, b"x".to_vec())).unwrap();
        store.put(Record::file("/a/y.rs", DEFAULT_FILE_MODE, 0, b"y".to_vec())).unwrap();

        let mut all = Vec::new();
        assert_eq!(list(&store, &[], |info| all.push(info.path.clone())).unwrap(), 3);
        assert_eq!(all, vec!["/a", "/a/x.txt", "/a/y.rs"]);

        let mut txt = Vec::new();
        list(&store, &["*.txt".to_string(), "x.txt".to_string()], |info| {
            txt.push(info.path.clone())
        })
        .unwrap();
        assert_eq!(txt, vec!["/a/x.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn extract_recreates_every_kind() {
        let store = SqliteStore::in_memory().unwrap();
        store.put(Record::directory("/d", DEFAULT_DIR_MODE, 0)).unwrap();
        store.put(Record::file("/d/full", DEFAULT_FILE_MODE, 0, b"data".to_vec())).unwrap();
        store.put(Record::file("/d/empty", DEFAULT_FILE_MODE, 0, Vec::new())).unwrap();
        store.put(Record::symlink("/d/link", 0o777, 0, "full")).unwrap();
        store.put(Record::file("/deep/nested/f", DEFAULT_FILE_MODE, 0, b"n".to_vec())).unwrap();

        let dest = tempfile::tempdir().unwrap();
        let extracted = extract(&store, &[], dest.path(), |_| {}).unwrap();
        assert_eq!(extracted, 5);

        let d = dest.path().join("d");
        assert!(d.is_dir());
        assert_eq!(fs::read(d.join("full")).unwrap(), b"data");
        assert_eq!(fs::read(d.join("empty")).unwrap(), b"");
        assert_eq!(fs::read_link(d.join("link")).unwrap(), Path::new("full"));
        assert_eq!(fs::read(dest.path().join("deep/nested/f")).unwrap(), b"n");

        // re-extracting over existing symlinks succeeds
        extract(&store, &["link".to_string()], dest.path(), |_| {}).unwrap();
    }

    #[test]
    fn extract_rejects_escaping_names() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .put(Record::file("/../escape", DEFAULT_FILE_MODE, 0, b"x".to_vec()))
            .unwrap();
        let dest = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract(&store, &[], dest.path(), |_| {}),
            Err(FsError::InvalidPath { .. })
        ));
    }
}
