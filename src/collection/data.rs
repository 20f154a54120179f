//! Data structures for a scan result.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::duplicates::DuplicateGroup;

/// Options a collection was produced with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// Source roots that were walked.
    pub sources: Vec<String>,
    /// Exclude patterns applied while walking.
    pub exclude: Vec<String>,
    /// Whether full-content verification was enabled.
    pub strict: bool,
}

/// Result of a scan, or of loading a saved scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    /// Options the scan ran with.
    pub options: ScanOptions,
    /// Final-stage fingerprint to duplicate group.
    pub groups: BTreeMap<String, DuplicateGroup>,
    /// Number of files walked.
    pub total_files: u64,
    /// Total size of the files walked.
    pub total_size: u64,
    /// Number of files that would be deleted.
    pub delete_count: u64,
    /// Bytes reclaimed by deleting them.
    pub delete_size: u64,
    /// Time spent scanning.
    pub elapsed: Duration,
}

impl Collection {
    /// Build a collection from freshly grouped files.
    ///
    /// Every group is put in survivor order and the deletable totals are
    /// computed from the sorted groups.
    #[must_use]
    pub fn new(
        options: ScanOptions,
        groups: BTreeMap<String, DuplicateGroup>,
        total_files: u64,
        total_size: u64,
    ) -> Self {
        let mut collection = Self {
            options,
            groups,
            total_files,
            total_size,
            ..Default::default()
        };
        collection.sort_groups();
        collection.compute_deletable();
        collection
    }

    /// Sort the members of every group into survivor order.
    pub fn sort_groups(&mut self) {
        for group in self.groups.values_mut() {
            group.sort();
        }
    }

    /// Recompute `delete_count` and `delete_size` from the groups.
    pub fn compute_deletable(&mut self) {
        self.delete_count = self.groups.values().map(DuplicateGroup::deletable_count).sum();
        self.delete_size = self.groups.values().map(DuplicateGroup::deletable_size).sum();
    }

    /// Number of duplicate groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}
