//! Hard link detection.
//!
//! Hard links are several directory entries for one inode. They are the same
//! file, so deleting one of them reclaims nothing. The walker keeps the first
//! link it meets and skips the others.
//!
//! - Unix: keyed by `(device, inode)`.
//! - Elsewhere: detection is disabled and every entry counts as distinct.

use std::collections::HashSet;
use std::fs::Metadata;

/// Remembers the inodes seen during one collection run.
///
/// Not thread-safe; the walker is single-threaded.
#[derive(Debug, Default)]
pub struct HardlinkTracker {
    seen: HashSet<InodeKey>,
}

impl HardlinkTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `metadata` names an inode that was already seen.
    ///
    /// The first occurrence is recorded and reported as `false`.
    pub fn is_hardlink(&mut self, metadata: &Metadata) -> bool {
        match InodeKey::from_metadata(metadata) {
            Some(key) => !self.seen.insert(key),
            None => false,
        }
    }

    /// Number of distinct inodes recorded.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Whether detection works on this platform.
    #[must_use]
    pub const fn is_supported() -> bool {
        cfg!(unix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(not(unix), allow(dead_code))]
struct InodeKey {
    dev: u64,
    ino: u64,
}

impl InodeKey {
    #[cfg(unix)]
    fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    // Windows exposes the file index only through an open handle.
    #[cfg(not(unix))]
    fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }
}
