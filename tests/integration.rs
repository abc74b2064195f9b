//! Integration tests for the filesystem facade.
//!
//! These tests verify that:
//! 1. The documented filesystem properties hold end-to-end
//! 2. The facade works over any `RecordStore`, not only SQLite
//! 3. Generic code written against `FileSystem` works with `SqlarFs`
//! 4. Errors carry useful context

use sqlarfs::*;
use std::collections::BTreeMap;
use std::io::{Read, SeekFrom, Write};
use std::sync::RwLock;

// =============================================================================
// Minimal In-Memory Record Store
// =============================================================================

/// A `BTreeMap`-backed store. Proves the facade only needs the trait.
#[derive(Default)]
struct MapStore {
    records: RwLock<BTreeMap<String, Record>>,
}

impl RecordStore for MapStore {
    fn get(&self, name: &str) -> Result<Option<Record>, FsError> {
        Ok(self.records.read().unwrap().get(name).cloned())
    }

    fn put(&self, record: Record) -> Result<(), FsError> {
        self.records
            .write()
            .unwrap()
            .insert(record.name.clone(), record);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool, FsError> {
        Ok(self.records.write().unwrap().remove(name).is_some())
    }

    fn list_prefix(&self, prefix: &str) -> Result<RecordIter, FsError> {
        let matching: Vec<_> = self
            .records
            .read()
            .unwrap()
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .map(|(_, record)| Ok(record.clone()))
            .collect();
        Ok(RecordIter::from_vec(matching))
    }
}

fn sqlite_fs() -> SqlarFs {
    SqlarFs::in_memory().unwrap()
}

fn map_fs() -> SqlarFs<MapStore> {
    SqlarFs::from_store(MapStore::default(), FsConfig::default()).unwrap()
}

fn write_file<F: FileSystem>(fs: &F, path: &str, data: &[u8]) {
    let mut file = fs.open(path, OpenMode::WRITE).unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
}

fn read_file<F: FileSystem>(fs: &F, path: &str) -> Vec<u8> {
    let mut file = fs.open(path, OpenMode::READ).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

// =============================================================================
// Filesystem Properties
// =============================================================================

fn scenario<F: FileSystem>(fs: &F) {
    fs.make_directory("/a", false).unwrap();
    write_file(fs, "/a/b.txt", b"hello");
    assert_eq!(fs.list("/a").unwrap(), vec!["b.txt"]);
    assert_eq!(read_file(fs, "/a/b.txt"), b"hello");
    fs.remove("/a/b.txt").unwrap();
    assert!(fs.list("/a").unwrap().is_empty());
    fs.remove_directory("/a").unwrap();
    assert!(matches!(fs.get_info("/a"), Err(FsError::NotFound { .. })));
}

#[test]
fn scenario_on_sqlite_store() {
    scenario(&sqlite_fs());
}

#[test]
fn scenario_on_map_store() {
    scenario(&map_fs());
}

#[test]
fn write_close_read_round_trip() {
    let fs = sqlite_fs();
    let payload: Vec<u8> = (0..=255).collect();
    let mut file = fs.open("/bytes.bin", OpenMode::WRITE).unwrap();
    file.write(&payload).unwrap();
    file.close().unwrap();

    let mut file = fs.open("/bytes.bin", OpenMode::READ).unwrap();
    assert_eq!(file.read(None).unwrap(), payload);
}

#[test]
fn made_directory_is_listed_in_parent() {
    let fs = sqlite_fs();
    fs.make_directories("/x/y").unwrap();
    fs.make_directory("/x/y/z", false).unwrap();

    assert!(fs.get_info("/x/y/z").unwrap().is_dir());
    assert_eq!(fs.list("/x/y").unwrap(), vec!["z"]);
}

#[test]
fn remove_directory_with_child_then_without() {
    let fs = map_fs();
    fs.make_directory("/d", false).unwrap();
    write_file(&fs, "/d/child", b"c");

    assert!(matches!(
        fs.remove_directory("/d"),
        Err(FsError::NotEmpty { .. })
    ));
    fs.remove("/d/child").unwrap();
    fs.remove_directory("/d").unwrap();
}

#[test]
fn exclusive_create_semantics() {
    let fs = sqlite_fs();
    let file = fs.open("/new", OpenMode::CREATE_NEW).unwrap();
    drop(file);

    let info = fs.get_info("/new").unwrap();
    assert!(info.is_file());
    assert_eq!(info.size, 0);
    assert!(matches!(
        fs.open("/new", OpenMode::CREATE_NEW),
        Err(FsError::AlreadyExists { .. })
    ));
}

#[test]
fn truncate_beyond_length_reads_zeros() {
    let fs = sqlite_fs();
    write_file(&fs, "/t", b"abc");

    let mut file = fs.open_str("/t", "r+").unwrap();
    file.truncate(8).unwrap();
    file.close().unwrap();

    assert_eq!(read_file(&fs, "/t"), b"abc\0\0\0\0\0");
}

#[test]
fn root_is_a_directory_on_empty_store() {
    assert!(sqlite_fs().get_info("/").unwrap().is_dir());
    assert!(map_fs().get_info("").unwrap().is_dir());
}

// =============================================================================
// Directory Synthesis
// =============================================================================

#[test]
fn implied_directories_from_raw_records() {
    let fs = sqlite_fs();
    let store = fs.store().unwrap();
    store
        .put(Record::file("/docs/guide/intro.md", 0o600, 100, b"# hi".to_vec()))
        .unwrap();
    store
        .put(Record::file("/docs/readme.md", 0o600, 200, b"".to_vec()))
        .unwrap();

    let docs = fs.get_info("/docs").unwrap();
    assert!(docs.is_dir());
    assert_eq!(docs.mode, DEFAULT_DIR_MODE);
    assert_eq!(docs.mtime, 200);

    let entries = fs.scandir("/docs", None).unwrap().collect_all().unwrap();
    let summary: Vec<_> = entries
        .iter()
        .map(|info| (info.name.as_str(), info.file_type))
        .collect();
    assert_eq!(
        summary,
        vec![("guide", FileType::Directory), ("readme.md", FileType::File)]
    );
}

#[test]
fn raw_exec_defaults_to_not_supported() {
    assert!(matches!(
        MapStore::default().exec("VACUUM"),
        Err(FsError::NotSupported { operation: "exec", .. })
    ));
    let fs = sqlite_fs();
    fs.store()
        .unwrap()
        .exec("INSERT INTO sqlar (name, mode, mtime, sz) VALUES ('/raw', 493, 0, 0)")
        .unwrap();
    assert!(fs.get_info("/raw").unwrap().is_dir());
}

#[test]
fn paged_listing() {
    let fs = map_fs();
    for i in 0..10 {
        write_file(&fs, &format!("/f{i}"), b"");
    }
    let page: Vec<String> = fs
        .scandir("/", Some(Page::new(3, 4)))
        .unwrap()
        .map(|info| info.unwrap().name)
        .collect();
    assert_eq!(page, vec!["f3", "f4", "f5", "f6"]);
}

#[test]
fn paths_are_normalized_before_use() {
    let fs = sqlite_fs();
    fs.make_directory("a", false).unwrap();
    write_file(&fs, "/a/./sub/../file", b"x");
    assert_eq!(fs.list("a/").unwrap(), vec!["file"]);
    assert!(matches!(
        fs.get_info("/../etc"),
        Err(FsError::InvalidPath { .. })
    ));
}

// =============================================================================
// Handles
// =============================================================================

#[test]
fn same_path_handles_are_independent() {
    let fs = sqlite_fs();
    write_file(&fs, "/shared", b"v1");

    let mut reader = fs.open("/shared", OpenMode::READ).unwrap();
    let mut first = fs.open_str("/shared", "r+").unwrap();
    let mut second = fs.open_str("/shared", "r+").unwrap();

    first.write(b"AA").unwrap();
    second.write(b"BB").unwrap();
    first.close().unwrap();
    second.close().unwrap();

    assert_eq!(reader.read(None).unwrap(), b"v1");
    assert_eq!(read_file(&fs, "/shared"), b"BB");
}

#[test]
fn append_mode_through_facade() {
    let fs = sqlite_fs();
    for chunk in [&b"one\n"[..], b"two\n"] {
        let mut log = fs.open("/log", OpenMode::APPEND).unwrap();
        log.write(chunk).unwrap();
        log.close().unwrap();
    }
    assert_eq!(fs.read_string("/log").unwrap(), "one\ntwo\n");
}

#[test]
fn handles_fail_after_filesystem_close() {
    let fs = sqlite_fs();
    let mut file = fs.open("/f", OpenMode::WRITE).unwrap();
    file.write(b"pending").unwrap();
    assert_eq!(fs.open_handles(), 1);

    fs.close();
    assert!(matches!(file.seek(SeekFrom::Start(0)), Err(FsError::FilesystemClosed)));
    assert!(matches!(file.close(), Err(FsError::FilesystemClosed)));
    assert_eq!(fs.open_handles(), 0);
}

// =============================================================================
// On-Disk Archives
// =============================================================================

#[test]
fn archive_written_by_tool_is_browsable() {
    let work = tempfile::tempdir().unwrap();
    let tree = work.path().join("site");
    std::fs::create_dir_all(tree.join("css")).unwrap();
    std::fs::write(tree.join("index.html"), b"<html>").unwrap();
    std::fs::write(tree.join("css/main.css"), b"body{}").unwrap();

    let archive_path = work.path().join("site.sqlar");
    let store = SqliteStore::open(&archive_path).unwrap();
    archive::archive(&store, &[tree.to_string_lossy().into_owned()], |_| {}).unwrap();
    drop(store);

    let fs = SqlarFs::new(&archive_path, FsConfig::default().read_only(true)).unwrap();
    let root = fs.resolve(&tree.to_string_lossy()).unwrap();
    assert_eq!(fs.list(&root).unwrap(), vec!["css", "index.html"]);
    assert_eq!(
        fs.read_bytes(&format!("{root}/css/main.css")).unwrap(),
        b"body{}"
    );
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn errors_name_the_path() {
    let fs = sqlite_fs();
    let err = fs.get_info("/missing/file").unwrap_err();
    assert!(err.to_string().contains("/missing/file"));

    let err = fs.open("/nodir/file", OpenMode::WRITE).unwrap_err();
    match err {
        FsError::AncestorMissing { path, ancestor } => {
            assert_eq!(path, "/nodir/file");
            assert_eq!(ancestor, "/nodir");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn errors_convert_to_io_kinds() {
    let fs = sqlite_fs();
    let mut file = fs.open("/ro", OpenMode::CREATE_NEW).unwrap();
    file.close().unwrap();
    let mut file = fs.open("/ro", OpenMode::READ).unwrap();
    let err = file.write_all(b"x").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    let back = FsError::from(err);
    assert!(matches!(back, FsError::PermissionDenied { .. }));
}
