//! File metadata provider.
//!
//! The grouping and selection code only ever sees [`FileRecord`]s. Everything
//! platform-specific about building one (notably which timestamp counts as the
//! creation time) lives behind [`MetadataProvider`].
//!
//! - Unix: the inode change time (`st_ctime`), which is what the platform
//!   exposes reliably across filesystems.
//! - Windows: the file creation time.
//! - Elsewhere: `Metadata::created`, falling back to the modification time.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use super::FileRecord;

/// Builds [`FileRecord`]s from filesystem metadata.
pub trait MetadataProvider: Send + Sync {
    /// Build a record for `path` from its already-fetched metadata.
    fn file_record(&self, path: &Path, metadata: &Metadata) -> FileRecord;
}

/// The provider for the platform this binary was compiled for.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformMetadata;

impl MetadataProvider for PlatformMetadata {
    fn file_record(&self, path: &Path, metadata: &Metadata) -> FileRecord {
        let modified = metadata
            .modified()
            .map(to_utc)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let created = creation_time(metadata).unwrap_or(modified);

        let mut record = FileRecord::new(path.to_path_buf(), metadata.len(), created, modified);
        record.is_dir = metadata.is_dir();
        record
    }
}

#[cfg(unix)]
fn creation_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;

    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    DateTime::<Utc>::from_timestamp(metadata.ctime(), nanos)
}

#[cfg(windows)]
fn creation_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata.created().ok().map(to_utc)
}

#[cfg(not(any(unix, windows)))]
fn creation_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata.created().ok().map(to_utc)
}

/// Convert a [`SystemTime`] into the UTC timestamp stored on records.
#[must_use]
pub fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
