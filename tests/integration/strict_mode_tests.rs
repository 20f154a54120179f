use filecompact::collection::ScanOptions;
use filecompact::duplicates::{DuplicateFinder, FinderConfig};
use filecompact::scanner::{sample_offsets, HashAlgorithm, FULL_READ_THRESHOLD, WINDOW_SIZE};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const FILE_SIZE: usize = 2 * 1024 * 1024;

fn base_content() -> Vec<u8> {
    (0..FILE_SIZE).map(|i| (i * 7 % 256) as u8).collect()
}

/// An offset that no sampled window of a `FILE_SIZE` file covers.
fn unsampled_offset() -> usize {
    let offsets = sample_offsets(FILE_SIZE as u64);
    let offset = offsets[1] + WINDOW_SIZE + 100;
    assert!(offset < offsets[2]);
    offset as usize
}

fn scan(dir: &Path, strict: bool, config: FinderConfig) -> filecompact::collection::Collection {
    let options = ScanOptions {
        sources: vec![dir.to_string_lossy().into_owned()],
        exclude: Vec::new(),
        strict,
    };
    DuplicateFinder::new(config).scan(&options).unwrap()
}

fn fixture(dir: &Path) {
    let content = base_content();
    let mut variant = content.clone();
    variant[unsampled_offset()] ^= 0x5a;

    fs::write(dir.join("original.bin"), &content).unwrap();
    fs::write(dir.join("copy.bin"), &content).unwrap();
    fs::write(dir.join("variant.bin"), &variant).unwrap();
}

#[test]
fn test_fixture_is_above_sampling_threshold() {
    assert!(FILE_SIZE as u64 > FULL_READ_THRESHOLD);
}

#[test]
fn test_non_strict_accepts_sampled_collision() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let collection = scan(dir.path(), false, FinderConfig::default());

    assert_eq!(collection.group_count(), 1);
    let group = collection.groups.values().next().unwrap();
    assert_eq!(group.len(), 3);
    assert!(group.files.iter().all(|f| f.partial_fingerprint.is_some()));
}

#[test]
fn test_strict_rejects_sampled_collision() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let collection = scan(dir.path(), true, FinderConfig::default());

    assert_eq!(collection.group_count(), 1);
    let group = collection.groups.values().next().unwrap();
    let names: Vec<_> = group.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(group.len(), 2);
    assert!(names.contains(&"original.bin"));
    assert!(names.contains(&"copy.bin"));
    assert_eq!(collection.delete_count, 1);
    assert_eq!(collection.delete_size, FILE_SIZE as u64);
}

#[test]
fn test_strict_refines_non_strict() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    fs::write(dir.path().join("small1.txt"), b"small duplicate").unwrap();
    fs::write(dir.path().join("small2.txt"), b"small duplicate").unwrap();

    let loose = scan(dir.path(), false, FinderConfig::default());
    let strict = scan(dir.path(), true, FinderConfig::default());

    for group in strict.groups.values() {
        let contained = loose.groups.values().any(|candidate| {
            group
                .files
                .iter()
                .all(|f| candidate.files.iter().any(|c| c.path == f.path))
        });
        assert!(contained, "strict group {} has no non-strict superset", group.fingerprint);
    }
    assert!(strict.delete_count <= loose.delete_count);
}

#[test]
fn test_strict_with_sha256() {
    let dir = tempdir().unwrap();
    fixture(dir.path());

    let config = FinderConfig::default().with_full_algorithm(HashAlgorithm::Sha256);
    let collection = scan(dir.path(), true, config);

    let (key, group) = collection.groups.iter().next().unwrap();
    assert_eq!(key.len(), 64);
    assert_eq!(group.len(), 2);
}
