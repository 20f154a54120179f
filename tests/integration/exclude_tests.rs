use filecompact::collection::ScanOptions;
use filecompact::duplicates::DuplicateFinder;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scan_with(dir: &Path, exclude: &[&str]) -> filecompact::collection::Collection {
    DuplicateFinder::with_defaults()
        .scan(&ScanOptions {
            sources: vec![dir.to_string_lossy().into_owned()],
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
            strict: false,
        })
        .unwrap()
}

#[test]
fn test_exclude_directory_subtree() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("src/a.txt"), b"dup");
    write(&dir.path().join("node_modules/pkg/a.txt"), b"dup");
    write(&dir.path().join("node_modules/pkg/b.txt"), b"dup");

    let collection = scan_with(dir.path(), &["node_modules"]);

    assert_eq!(collection.total_files, 1);
    assert!(collection.groups.is_empty());
}

#[test]
fn test_exclude_file_glob() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"dup");
    write(&dir.path().join("b.txt"), b"dup");
    write(&dir.path().join("c.tmp"), b"dup");

    let collection = scan_with(dir.path(), &["*.tmp"]);

    assert_eq!(collection.total_files, 2);
    let group = collection.groups.values().next().unwrap();
    assert!(group.files.iter().all(|f| !f.name.ends_with(".tmp")));
    assert_eq!(collection.options.exclude, vec!["*.tmp"]);
}

#[test]
fn test_exclude_absolute_path() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("keep/a.txt"), b"dup");
    write(&dir.path().join("keep/b.txt"), b"dup");
    write(&dir.path().join("skip/c.txt"), b"dup");

    let skip = dir.path().join("skip");
    let collection = scan_with(dir.path(), &[skip.to_str().unwrap()]);

    assert_eq!(collection.total_files, 2);
    assert_eq!(collection.delete_count, 1);
}

#[test]
fn test_no_exclude_sees_everything() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("x/a"), b"same");
    write(&dir.path().join("y/b"), b"same");

    let collection = scan_with(dir.path(), &[]);
    assert_eq!(collection.total_files, 2);
    assert_eq!(collection.group_count(), 1);
}
