//! Human-readable reporting through the `log` facade.

use std::time::Duration;

use chrono::Local;

use crate::actions::DeletionResult;
use crate::collection::Collection;
use crate::duplicates::DuplicateGroup;

const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];

/// Format a byte count with binary units and two decimals.
///
/// # Examples
///
/// ```
/// use filecompact::output::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
#[must_use]
pub fn format_size(bytes: u64) -> String {
    for (i, unit) in UNITS.iter().enumerate().rev() {
        let base = 1u64 << ((i + 1) * 10);
        if bytes >= base {
            return format!("{:.2} {}", bytes as f64 / base as f64, unit);
        }
    }
    format!("{} B", bytes)
}

/// Format an elapsed time for display.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs < 1.0 {
        format!("{:.1}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        let whole = elapsed.as_secs();
        format!("{}m{}s", whole / 60, whole % 60)
    }
}

/// Lines describing one group: a header, then one line per member.
#[must_use]
pub fn group_lines(key: &str, group: &DuplicateGroup) -> Vec<String> {
    let mut lines = Vec::with_capacity(group.len() + 1);
    lines.push(format!("{} count={}", key, group.len()));
    for file in &group.files {
        lines.push(format!(
            "  - {} {}",
            file.created.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            file.path.display()
        ));
    }
    lines
}

/// One-line summary of a collection.
#[must_use]
pub fn summary_line(collection: &Collection) -> String {
    format!(
        "Collected {} files ({}) in {}: {} duplicate groups, {} deletable files ({})",
        collection.total_files,
        format_size(collection.total_size),
        format_elapsed(collection.elapsed),
        collection.group_count(),
        collection.delete_count,
        format_size(collection.delete_size)
    )
}

/// One-line summary of a deletion run.
#[must_use]
pub fn deletion_line(result: &DeletionResult) -> String {
    format!(
        "Deleted {} files, reclaimed {} in {}",
        result.deleted,
        format_size(result.deleted_size),
        format_elapsed(result.elapsed)
    )
}

/// Log every group in key order.
pub fn report_groups(collection: &Collection) {
    for (key, group) in &collection.groups {
        for line in group_lines(key, group) {
            log::info!("{}", line);
        }
    }
}

/// Log the collection summary.
pub fn report_summary(collection: &Collection) {
    log::info!("{}", summary_line(collection));
}

/// Log failed paths, then the deletion summary.
pub fn report_deletion(result: &DeletionResult) {
    if !result.all_succeeded() {
        log::info!("Some files could not be deleted:");
        for (path, error) in &result.errors {
            log::info!("  - {}: {}", path.display(), error);
        }
    }
    log::info!("{}", deletion_line(result));
}
