//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Recursive directory walking with exclude patterns
//! - Platform-specific file metadata (creation time)
//! - Hard link detection, so links to one inode are never duplicates
//! - Content fingerprinting with a bounded sampling read policy
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`metadata`]: Per-platform file metadata provider
//! - [`hardlink`]: Seen-inode tracking
//! - [`hasher`]: Fingerprinting under a selectable digest algorithm
//!
//! # Example
//!
//! ```no_run
//! use filecompact::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let config = WalkerConfig {
//!     exclude: vec!["node_modules".to_string()],
//! };
//!
//! let walker = Walker::new(Path::new("."), config);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```

pub mod hardlink;
pub mod hasher;
pub mod metadata;
mod path_codec;
pub mod walker;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{
    sample_offsets, ContentDigest, FileFingerprint, Fingerprinter, HashAlgorithm, FULL_READ_THRESHOLD,
    SAMPLE_COUNT, WINDOW_SIZE,
};
pub use hardlink::HardlinkTracker;
pub use metadata::{MetadataProvider, PlatformMetadata};
pub use walker::{collect_files, Walker};

/// Metadata for a discovered file.
///
/// Created by the walker, annotated with a fingerprint while grouping,
/// and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// File name (last path component)
    pub name: String,
    /// Path to the file as discovered under its source root
    #[serde(with = "path_codec")]
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Whether this record is a directory (never true once grouped)
    pub is_dir: bool,
    /// Creation time as reported by the platform
    pub created: DateTime<Utc>,
    /// Last modification time
    pub modified: DateTime<Utc>,
    /// Sampled fingerprint from the partial stage
    #[serde(rename = "partial", default, skip_serializing_if = "Option::is_none")]
    pub partial_fingerprint: Option<String>,
    /// Full-content fingerprint from the strict stage
    #[serde(rename = "full", default, skip_serializing_if = "Option::is_none")]
    pub full_fingerprint: Option<String>,
}

impl FileRecord {
    /// Create a new FileRecord with no fingerprint attached.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    /// * `created` - Creation time
    /// * `modified` - Last modification time
    #[must_use]
    pub fn new(
        path: PathBuf,
        size: u64,
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    ) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            size,
            is_dir: false,
            created,
            modified,
            partial_fingerprint: None,
            full_fingerprint: None,
        }
    }

    /// Attach the sampled fingerprint.
    pub fn set_partial_fingerprint(&mut self, fingerprint: String) {
        self.partial_fingerprint = Some(fingerprint);
        self.full_fingerprint = None;
    }

    /// Attach the full-content fingerprint, replacing the sampled one.
    pub fn set_full_fingerprint(&mut self, fingerprint: String) {
        self.full_fingerprint = Some(fingerprint);
        self.partial_fingerprint = None;
    }

    /// The fingerprint from the latest stage that produced one.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.full_fingerprint
            .as_deref()
            .or(self.partial_fingerprint.as_deref())
    }
}

/// Configuration for directory walking.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Exclude patterns (gitignore-style, or absolute globs matched against the full path).
    /// A directory that matches is skipped together with its subtree.
    pub exclude: Vec<String>,
}

impl WalkerConfig {
    /// Create a new configuration from exclude patterns.
    #[must_use]
    pub fn new(exclude: Vec<String>) -> Self {
        Self { exclude }
    }
}

/// Errors that abort a directory walk.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The source root does not exist.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The source root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error other than permission denied occurred.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during fingerprinting.
///
/// Any of these means the file's fingerprint is unknown; the file is
/// excluded from grouping.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The digest came out empty.
    #[error("Empty fingerprint for {0}")]
    Empty(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while fingerprinting `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
