//! Survivor selection within a duplicate group.
//!
//! Members are ordered by creation time (oldest first), then by path length
//! (shortest first), then by path bytes. The first member is kept and every
//! other member is a deletion candidate.

use std::cmp::Ordering;

use crate::scanner::FileRecord;

/// Total order used to pick the survivor of a group.
#[must_use]
pub fn compare_records(a: &FileRecord, b: &FileRecord) -> Ordering {
    a.created
        .cmp(&b.created)
        .then_with(|| path_len(a).cmp(&path_len(b)))
        .then_with(|| a.path.as_os_str().cmp(b.path.as_os_str()))
}

/// Sort group members into survivor order.
pub fn sort_group(files: &mut [FileRecord]) {
    files.sort_by(compare_records);
}

fn path_len(record: &FileRecord) -> usize {
    record.path.as_os_str().len()
}
