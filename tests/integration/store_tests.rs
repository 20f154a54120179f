use filecompact::collection::store::StoreError;
use filecompact::collection::{Collection, ScanOptions};
use filecompact::duplicates::DuplicateFinder;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scanned_collection(dir: &Path, strict: bool) -> Collection {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("a.txt"), b"first group").unwrap();
    fs::write(dir.join("b.txt"), b"first group").unwrap();
    fs::create_dir(dir.join("nested")).unwrap();
    fs::write(dir.join("nested/c.txt"), b"first group").unwrap();
    fs::write(dir.join("d.dat"), b"second").unwrap();
    fs::write(dir.join("e.dat"), b"second").unwrap();
    fs::write(dir.join("unique.bin"), b"only one of me").unwrap();

    let options = ScanOptions {
        sources: vec![dir.to_string_lossy().into_owned()],
        exclude: vec!["*.log".to_string(), "cache/".to_string()],
        strict,
    };
    DuplicateFinder::with_defaults().scan(&options).unwrap()
}

#[test]
fn test_round_trip_of_scanned_collection() {
    let data = tempdir().unwrap();
    let state = tempdir().unwrap();
    let path = state.path().join("filecompact.state");

    for strict in [false, true] {
        let collection = scanned_collection(&data.path().join(strict.to_string()), strict);
        collection.save(&path).unwrap();
        let loaded = Collection::load(&path).unwrap();

        assert_eq!(loaded.options, collection.options);
        assert_eq!(loaded.total_files, collection.total_files);
        assert_eq!(loaded.total_size, collection.total_size);
        assert_eq!(loaded.delete_count, collection.delete_count);
        assert_eq!(loaded.delete_size, collection.delete_size);
        assert_eq!(loaded.elapsed, collection.elapsed);
        assert_eq!(loaded.groups, collection.groups);
        assert_eq!(loaded, collection);
    }
}

#[test]
fn test_round_trip_preserves_member_order() {
    let data = tempdir().unwrap();
    let state = tempdir().unwrap();
    let path = state.path().join("state");

    let collection = scanned_collection(&data.path().join("root"), false);
    collection.save(&path).unwrap();
    let loaded = Collection::load(&path).unwrap();

    for (key, group) in &collection.groups {
        let original: Vec<_> = group.files.iter().map(|f| &f.path).collect();
        let restored: Vec<_> = loaded.groups[key].files.iter().map(|f| &f.path).collect();
        assert_eq!(original, restored);
    }
}

#[test]
fn test_load_from_non_store_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-a-db");
    fs::write(&path, b"this is plain text, not sqlite").unwrap();

    assert!(Collection::load(&path).is_err());
}

#[test]
fn test_load_store_without_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state");
    drop(filecompact::collection::KvStore::open(&path).unwrap());

    let err = Collection::load(&path).unwrap_err();
    assert!(matches!(err, StoreError::BucketNotFound(_)));
}

#[test]
fn test_second_save_replaces_first() {
    let data = tempdir().unwrap();
    let state = tempdir().unwrap();
    let path = state.path().join("state");

    let first = scanned_collection(&data.path().join("one"), false);
    first.save(&path).unwrap();

    let empty_dir = data.path().join("empty");
    fs::create_dir(&empty_dir).unwrap();
    let second = DuplicateFinder::with_defaults()
        .scan(&ScanOptions {
            sources: vec![empty_dir.to_string_lossy().into_owned()],
            ..Default::default()
        })
        .unwrap();
    second.save(&path).unwrap();

    let loaded = Collection::load(&path).unwrap();
    assert!(loaded.groups.is_empty());
    assert_eq!(loaded.total_files, 0);
    assert_eq!(loaded.options.sources, second.options.sources);
}

#[cfg(target_os = "linux")]
#[test]
fn test_round_trip_with_non_utf8_file_name() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let data = tempdir().unwrap();
    let state = tempdir().unwrap();
    let path = state.path().join("state");
    let odd = data
        .path()
        .join(OsString::from_vec(b"bad\xff.txt".to_vec()));
    fs::write(&odd, b"identical").unwrap();
    fs::write(data.path().join("good.txt"), b"identical").unwrap();

    let collection = DuplicateFinder::with_defaults()
        .scan(&ScanOptions {
            sources: vec![data.path().to_string_lossy().into_owned()],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(collection.group_count(), 1);

    collection.save(&path).unwrap();
    let loaded = Collection::load(&path).unwrap();

    assert_eq!(loaded, collection);
    let group = loaded.groups.values().next().unwrap();
    assert!(group.files.iter().any(|f| f.path == odd));
}
