//! Deletion of duplicate files.
//!
//! # Overview
//!
//! Every group member except the survivor (element 0) is removed:
//! - Permanent deletion with `std::fs::remove_file` (default)
//! - Move to the platform trash with the `trash` crate (`--trash`)
//!
//! Each path is handled independently. A failure is recorded against its
//! path and the remaining paths are still processed.
//!
//! # Example
//!
//! ```no_run
//! use filecompact::actions::delete::{delete_duplicates, DeleteMode};
//! use filecompact::collection::Collection;
//! use std::path::Path;
//!
//! let collection = Collection::load(Path::new("filecompact.state")).unwrap();
//! let result = delete_duplicates(&collection, DeleteMode::Permanent);
//! println!("Deleted {} files", result.deleted);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::collection::Collection;

/// How a file is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove the file for good.
    #[default]
    Permanent,
    /// Move the file to the platform trash.
    Trash,
}

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Outcome of deleting every candidate of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionResult {
    /// Number of files removed.
    pub deleted: u64,
    /// Recorded size of the files removed.
    pub deleted_size: u64,
    /// Path to error text for every failed removal.
    pub errors: BTreeMap<PathBuf, String>,
    /// Time spent deleting.
    pub elapsed: Duration,
}

impl DeletionResult {
    /// Number of failed removals.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.errors.len()
    }

    /// Check if every removal succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Remove a single file.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `TrashFailed` if the trash backend rejects the file
/// - `Io` for any other failure
pub fn delete_file(path: &Path, mode: DeleteMode) -> Result<(), DeleteError> {
    match mode {
        DeleteMode::Permanent => {
            fs::remove_file(path).map_err(|e| DeleteError::from_io(path, e))?;
            log::debug!("Deleted {}", path.display());
        }
        DeleteMode::Trash => {
            if !path.exists() {
                return Err(DeleteError::NotFound(path.to_path_buf()));
            }
            trash::delete(path).map_err(|e| DeleteError::TrashFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            log::debug!("Moved to trash {}", path.display());
        }
    }
    Ok(())
}

/// Delete every non-survivor member of every group, in group key order.
///
/// Failures never stop the run; they are collected in
/// [`DeletionResult::errors`].
#[must_use]
pub fn delete_duplicates(collection: &Collection, mode: DeleteMode) -> DeletionResult {
    let start = Instant::now();
    let mut result = DeletionResult::default();

    for group in collection.groups.values() {
        for file in group.deletion_candidates() {
            match delete_file(&file.path, mode) {
                Ok(()) => {
                    result.deleted += 1;
                    result.deleted_size += file.size;
                }
                Err(e) => {
                    log::warn!("Failed to delete {}: {}", file.path.display(), e);
                    result.errors.insert(file.path.clone(), e.to_string());
                }
            }
        }
    }

    result.elapsed = start.elapsed();
    result
}
