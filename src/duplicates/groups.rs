//! Duplicate grouping and size-based file organization.
//!
//! # Overview
//!
//! This module provides the [`DuplicateGroup`] produced by the grouping
//! funnel, and the size grouping that is its first stage.
//!
//! ## Size Grouping (Stage 1)
//!
//! Files with different sizes cannot be byte-identical, so grouping by exact
//! size removes most files before any byte is read.
//!
//! # Example
//!
//! ```
//! use chrono::{DateTime, Utc};
//! use filecompact::scanner::FileRecord;
//! use filecompact::duplicates::group_by_size;
//! use std::path::PathBuf;
//!
//! let t = DateTime::<Utc>::UNIX_EPOCH;
//! let files = vec![
//!     FileRecord::new(PathBuf::from("/file1.txt"), 1024, t, t),
//!     FileRecord::new(PathBuf::from("/file2.txt"), 1024, t, t),
//!     FileRecord::new(PathBuf::from("/file3.txt"), 2048, t, t),
//! ];
//!
//! let (groups, stats) = group_by_size(files);
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.potential_duplicates, 2);
//! assert_eq!(groups.len(), 1);
//! ```

use std::collections::BTreeMap;

use crate::scanner::FileRecord;

use super::selector;

/// Confirmed duplicate group of files.
///
/// Every member has the same size and the same final-stage fingerprint.
/// Member order is only meaningful after [`DuplicateGroup::sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Fingerprint of the last enabled grouping stage
    pub fingerprint: String,
    /// File size in bytes (shared by all members)
    pub size: u64,
    /// Members; element 0 is the survivor once sorted
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group. The size is taken from the first member.
    ///
    /// # Arguments
    ///
    /// * `fingerprint` - Grouping key
    /// * `files` - Members, all of the same size
    #[must_use]
    pub fn new(fingerprint: String, files: Vec<FileRecord>) -> Self {
        let size = files.first().map_or(0, |f| f.size);
        debug_assert!(
            files.iter().all(|f| f.size == size),
            "duplicate group {} mixes file sizes",
            fingerprint
        );
        Self {
            fingerprint,
            size,
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Put the members in survivor order.
    pub fn sort(&mut self) {
        selector::sort_group(&mut self.files);
    }

    /// The member that is kept.
    #[must_use]
    pub fn survivor(&self) -> Option<&FileRecord> {
        self.files.first()
    }

    /// Members that would be deleted.
    #[must_use]
    pub fn deletion_candidates(&self) -> &[FileRecord] {
        self.files.get(1..).unwrap_or(&[])
    }

    /// Number of deletable members (N - 1).
    #[must_use]
    pub fn deletable_count(&self) -> u64 {
        self.files.len().saturating_sub(1) as u64
    }

    /// Space reclaimed by deleting every candidate ((N - 1) x size).
    #[must_use]
    pub fn deletable_size(&self) -> u64 {
        self.deletable_count() * self.size
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }
}

/// Statistics from size grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files processed
    pub total_size: u64,
    /// Files dropped because no other file has their size
    pub eliminated_unique: usize,
    /// Files that share their size with at least one other file
    pub potential_duplicates: usize,
    /// Number of size groups with 2+ files
    pub size_groups: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by size grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by exact size (Stage 1).
///
/// Returns only buckets with 2+ files, ordered by size. Directory records
/// never reach a bucket.
#[must_use]
pub fn group_by_size(files: Vec<FileRecord>) -> (BTreeMap<u64, Vec<FileRecord>>, GroupingStats) {
    let mut stats = GroupingStats {
        total_files: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        ..Default::default()
    };

    let mut by_size: BTreeMap<u64, Vec<FileRecord>> = BTreeMap::new();
    for file in files.into_iter().filter(|f| !f.is_dir) {
        by_size.entry(file.size).or_default().push(file);
    }

    by_size.retain(|_, files| {
        if files.len() > 1 {
            true
        } else {
            stats.eliminated_unique += files.len();
            false
        }
    });

    stats.size_groups = by_size.len();
    stats.potential_duplicates = by_size.values().map(Vec::len).sum();

    (by_size, stats)
}
