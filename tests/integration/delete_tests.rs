use filecompact::actions::{delete_duplicates, DeleteMode};
use filecompact::collection::{Collection, ScanOptions};
use filecompact::duplicates::DuplicateFinder;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn scan(dir: &Path) -> Collection {
    DuplicateFinder::with_defaults()
        .scan(&ScanOptions {
            sources: vec![dir.to_string_lossy().into_owned()],
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_delete_keeps_one_copy_per_group() {
    let dir = tempdir().unwrap();
    for i in 0..3 {
        fs::write(dir.path().join(format!("a{i}.txt")), b"group a content").unwrap();
    }
    for i in 0..2 {
        fs::write(dir.path().join(format!("b{i}.txt")), b"group b").unwrap();
    }
    fs::write(dir.path().join("unique.txt"), b"lonely").unwrap();

    let collection = scan(dir.path());
    let survivors: Vec<_> = collection
        .groups
        .values()
        .map(|g| g.survivor().unwrap().path.clone())
        .collect();

    let result = delete_duplicates(&collection, DeleteMode::Permanent);

    assert!(result.all_succeeded());
    assert_eq!(result.deleted, collection.delete_count);
    assert_eq!(result.deleted_size, collection.delete_size);
    assert_eq!(result.deleted, 3);
    for survivor in &survivors {
        assert!(survivor.exists());
    }
    assert!(dir.path().join("unique.txt").exists());

    let rescan = scan(dir.path());
    assert!(rescan.groups.is_empty());
    assert_eq!(rescan.total_files, 3);
}

#[test]
fn test_delete_records_failures_and_continues() {
    let dir = tempdir().unwrap();
    for i in 0..3 {
        fs::write(dir.path().join(format!("f{i}")), b"duplicate").unwrap();
    }

    let collection = scan(dir.path());
    let candidates: Vec<_> = collection
        .groups
        .values()
        .flat_map(|g| g.deletion_candidates().iter().map(|f| f.path.clone()))
        .collect();
    assert_eq!(candidates.len(), 2);

    // Remove one candidate behind the deleter's back.
    fs::remove_file(&candidates[0]).unwrap();

    let result = delete_duplicates(&collection, DeleteMode::Permanent);

    assert_eq!(result.deleted, 1);
    assert_eq!(result.deleted_size, 9);
    assert_eq!(result.failure_count(), 1);
    assert!(result.errors.contains_key(&candidates[0]));
    assert!(!candidates[1].exists());
}

#[test]
fn test_delete_from_loaded_collection() {
    let dir = tempdir().unwrap();
    let state = tempdir().unwrap();
    let state_file = state.path().join("filecompact.state");
    fs::write(dir.path().join("one"), b"payload").unwrap();
    fs::write(dir.path().join("two"), b"payload").unwrap();

    scan(dir.path()).save(&state_file).unwrap();
    let loaded = Collection::load(&state_file).unwrap();
    let result = delete_duplicates(&loaded, DeleteMode::Permanent);

    assert_eq!(result.deleted, 1);
    let remaining = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(remaining, 1);
}

#[test]
fn test_delete_with_nested_sources_keeps_only_copy() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let only = sub.join("only.txt");
    fs::write(&only, b"nowhere else").unwrap();

    let collection = DuplicateFinder::with_defaults()
        .scan(&ScanOptions {
            sources: vec![
                dir.path().to_string_lossy().into_owned(),
                sub.to_string_lossy().into_owned(),
            ],
            ..Default::default()
        })
        .unwrap();
    let result = delete_duplicates(&collection, DeleteMode::Permanent);

    assert_eq!(collection.delete_count, 0);
    assert_eq!(result.deleted, 0);
    assert!(only.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn test_delete_non_utf8_name_after_reload() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let dir = tempdir().unwrap();
    let state = tempdir().unwrap();
    let state_file = state.path().join("state");
    let odd = dir
        .path()
        .join(OsString::from_vec(b"zz_bad\xff.txt".to_vec()));
    fs::write(dir.path().join("good.txt"), b"same payload").unwrap();
    fs::write(&odd, b"same payload").unwrap();

    scan(dir.path()).save(&state_file).unwrap();
    let loaded = Collection::load(&state_file).unwrap();
    let result = delete_duplicates(&loaded, DeleteMode::Permanent);

    assert!(result.all_succeeded());
    assert_eq!(result.deleted, 1);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
