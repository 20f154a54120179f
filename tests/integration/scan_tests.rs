use filecompact::collection::ScanOptions;
use filecompact::duplicates::{DuplicateFinder, FinderConfig};
use filecompact::scanner::{FileFingerprint, Fingerprinter, HashAlgorithm, HashError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    File::create(path).unwrap().write_all(content).unwrap();
}

fn options_for(dirs: &[&Path]) -> ScanOptions {
    ScanOptions {
        sources: dirs
            .iter()
            .map(|d| d.to_string_lossy().into_owned())
            .collect(),
        ..Default::default()
    }
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    assert!(collection.groups.is_empty());
    assert_eq!(collection.total_files, 0);
    assert_eq!(collection.total_size, 0);
    assert_eq!(collection.delete_count, 0);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"content a");
    write(&dir.path().join("b.txt"), b"content b");
    write(&dir.path().join("c.txt"), b"content c");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    assert!(collection.groups.is_empty());
    assert_eq!(collection.total_files, 3);
    assert_eq!(collection.total_size, 27);
}

#[test]
fn test_scan_nested_directories() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"nested duplicate");
    write(&dir.path().join("sub/b.txt"), b"nested duplicate");
    write(&dir.path().join("sub/deeper/c.txt"), b"nested duplicate");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    assert_eq!(collection.group_count(), 1);
    let group = collection.groups.values().next().unwrap();
    assert_eq!(group.len(), 3);
    assert_eq!(collection.delete_count, 2);
    assert_eq!(collection.delete_size, 2 * 16);
}

#[test]
fn test_scan_multiple_sources() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(&first.path().join("photo.jpg"), b"same picture bytes");
    write(&second.path().join("copy.jpg"), b"same picture bytes");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[first.path(), second.path()]))
        .unwrap();

    assert_eq!(collection.total_files, 2);
    assert_eq!(collection.group_count(), 1);
    assert_eq!(collection.options.sources.len(), 2);
}

#[test]
fn test_different_sizes_never_share_a_group() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"aaaa");
    write(&dir.path().join("b"), b"aaaa");
    write(&dir.path().join("c"), b"aaaaaaaa");
    write(&dir.path().join("d"), b"aaaaaaaa");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    assert_eq!(collection.group_count(), 2);
    for group in collection.groups.values() {
        assert!(group.files.iter().all(|f| f.size == group.size));
    }
}

#[test]
fn test_scan_is_repeatable() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        write(&dir.path().join(format!("x{i}.bin")), b"xxxxxxxx");
        write(&dir.path().join(format!("y{i}.bin")), b"yyyyyyyy");
    }

    let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(3));
    let first = finder.scan(&options_for(&[dir.path()])).unwrap();
    let second = finder.scan(&options_for(&[dir.path()])).unwrap();

    assert_eq!(first.groups, second.groups);
    assert_eq!(first.delete_count, second.delete_count);
    assert_eq!(first.delete_size, second.delete_size);
    assert_eq!(first.total_files, second.total_files);
}

/// Reports permission denied for one path, like an unreadable file would.
struct Unreadable(PathBuf);

impl FileFingerprint for Unreadable {
    fn fingerprint(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        full_read: bool,
    ) -> Result<String, HashError> {
        if path == self.0 {
            return Err(HashError::PermissionDenied(path.to_path_buf()));
        }
        Fingerprinter::new().fingerprint(path, algorithm, full_read)
    }
}

#[test]
fn test_unreadable_file_is_excluded() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"shared bytes");
    write(&dir.path().join("b.txt"), b"shared bytes");
    let locked = dir.path().join("c.txt");
    write(&locked, b"shared bytes");

    for strict in [false, true] {
        let config =
            FinderConfig::default().with_fingerprinter(Arc::new(Unreadable(locked.clone())));
        let options = ScanOptions {
            strict,
            ..options_for(&[dir.path()])
        };
        let collection = DuplicateFinder::new(config).scan(&options).unwrap();

        assert_eq!(collection.total_files, 3);
        assert_eq!(collection.group_count(), 1);
        let group = collection.groups.values().next().unwrap();
        assert_eq!(group.len(), 2);
        assert!(group.files.iter().all(|f| f.path != locked));
        assert_eq!(collection.delete_count, 1);
    }
}

#[test]
fn test_nested_sources_record_each_file_once() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("top.txt"), b"unique top");
    write(&dir.path().join("sub/only.txt"), b"the only copy");

    let sub = dir.path().join("sub");
    for sources in [[dir.path(), sub.as_path()], [sub.as_path(), dir.path()]] {
        let collection = DuplicateFinder::with_defaults()
            .scan(&options_for(&sources))
            .unwrap();

        assert_eq!(collection.total_files, 2);
        assert!(collection.groups.is_empty());
        assert_eq!(collection.delete_count, 0);
    }
}

#[test]
fn test_repeated_source_records_each_file_once() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("file.txt"), b"content");
    let dotted = dir.path().join(".");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path(), dotted.as_path()]))
        .unwrap();

    assert_eq!(collection.total_files, 1);
    assert!(collection.groups.is_empty());
}

#[cfg(unix)]
#[test]
fn test_hard_links_are_not_duplicates() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("a.txt");
    write(&original, b"linked content");
    fs::hard_link(&original, dir.path().join("b.txt")).unwrap();
    write(&dir.path().join("c.txt"), b"linked content");

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    assert_eq!(collection.total_files, 2);
    assert_eq!(collection.delete_count, 1);
    assert_eq!(collection.delete_size, 14);
    let group = collection.groups.values().next().unwrap();
    assert!(group.files.iter().all(|f| f.name != "b.txt"));
}

#[cfg(unix)]
#[test]
fn test_survivor_is_oldest_by_creation_time() {
    use filetime::{set_file_mtime, FileTime};
    use std::thread::sleep;
    use std::time::Duration;

    let dir = tempdir().unwrap();
    let names = ["zz_first_touched.txt", "a.txt", "m.txt"];
    for name in names {
        write(&dir.path().join(name), b"same");
    }
    // Touching a file's mtime bumps its inode change time, which is the
    // creation time on unix.
    for name in names {
        sleep(Duration::from_millis(20));
        set_file_mtime(dir.path().join(name), FileTime::from_unix_time(1, 0)).unwrap();
    }

    let collection = DuplicateFinder::with_defaults()
        .scan(&options_for(&[dir.path()]))
        .unwrap();

    let group = collection.groups.values().next().unwrap();
    let order: Vec<_> = group.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(order, names);
}
