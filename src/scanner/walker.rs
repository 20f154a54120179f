//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for traversing a source root
//! and collecting [`FileRecord`]s for duplicate detection. Traversal is
//! single-threaded and sorted by file name, so two walks of an unchanged tree
//! yield records in the same order.
//!
//! # Error policy
//!
//! - Permission denied on a directory: the subtree is skipped.
//! - Permission denied on a file: the file is skipped.
//! - Any other I/O error: yielded as [`ScanError::Io`] and, through
//!   [`collect_files`], aborts the scan.
//!
//! # Exclude patterns
//!
//! Patterns use gitignore syntax relative to the source root (`node_modules`,
//! `*.tmp`, `/build`). An absolute pattern (`/home/u/*/build`) is a glob
//! anchored at the filesystem root and matched against the absolute path.
//! A matching directory is pruned with its whole subtree.
//!
//! # Overlapping roots and hard links
//!
//! [`collect_files`] drops a source root that resolves to, or lies inside,
//! another root, and shares one [`HardlinkTracker`] across all roots. A file
//! therefore yields at most one record per run.
//!
//! # Example
//!
//! ```no_run
//! use filecompact::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::borrow::BorrowMut;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::{DirEntry, WalkDir};

use super::hardlink::HardlinkTracker;
use super::metadata::{MetadataProvider, PlatformMetadata};
use super::{FileRecord, ScanError, WalkerConfig};
use crate::progress::ProgressCallback;

/// Compiled exclude patterns for one source root.
#[derive(Debug, Default)]
struct ExcludeMatcher {
    /// Patterns relative to the source root
    relative: Option<Gitignore>,
    /// Absolute patterns, one matcher per filesystem root
    absolute: Vec<Gitignore>,
    /// Absolute form of the source root
    absolute_root: Option<PathBuf>,
}

/// Directory walker for file discovery under one source root.
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Metadata provider used to build records
    provider: Arc<dyn MetadataProvider>,
    /// Optional progress callback
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            provider: Arc::new(PlatformMetadata),
            progress_callback: None,
        }
    }

    /// Use a different metadata provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn MetadataProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Build the exclude matcher from configured patterns.
    fn build_matcher(&self) -> ExcludeMatcher {
        let mut relative = GitignoreBuilder::new(&self.root);
        let mut absolute: BTreeMap<PathBuf, GitignoreBuilder> = BTreeMap::new();

        for pattern in &self.config.exclude {
            let path = Path::new(pattern);
            let result = if path.is_absolute() {
                let fs_root = path.ancestors().last().unwrap_or(path).to_path_buf();
                let line = anchored_line(path, &fs_root);
                absolute
                    .entry(fs_root.clone())
                    .or_insert_with(|| GitignoreBuilder::new(&fs_root))
                    .add_line(None, &line)
                    .map(|_| ())
            } else {
                relative.add_line(None, pattern).map(|_| ())
            };
            if let Err(e) = result {
                log::warn!("Invalid exclude pattern '{}': {}", pattern, e);
            }
        }

        let absolute: Vec<Gitignore> = absolute
            .into_values()
            .filter_map(|builder| build_gitignore(&builder))
            .collect();
        let absolute_root = if absolute.is_empty() {
            None
        } else {
            std::path::absolute(&self.root).ok()
        };

        ExcludeMatcher {
            relative: build_gitignore(&relative),
            absolute,
            absolute_root,
        }
    }

    /// Check if a path is excluded by the configured patterns.
    fn is_excluded(&self, path: &Path, is_dir: bool, matcher: &ExcludeMatcher) -> bool {
        let relative_path = path.strip_prefix(&self.root).unwrap_or(path);

        if let Some(ref absolute_root) = matcher.absolute_root {
            let full = absolute_root.join(relative_path);
            let hit = matcher.absolute.iter().any(|gi| {
                full.starts_with(gi.path())
                    && gi.matched_path_or_any_parents(&full, is_dir).is_ignore()
            });
            if hit {
                return true;
            }
        }

        let Some(ref gi) = matcher.relative else {
            return false;
        };

        // Gitignore matching expects paths relative to the root with forward slashes.
        let path_str = relative_path.to_string_lossy();
        let normalized_path = if cfg!(windows) {
            path_str.replace('\\', "/")
        } else {
            path_str.into_owned()
        };

        gi.matched(normalized_path, is_dir).is_ignore()
    }

    /// Walk the directory tree, yielding file records.
    ///
    /// Permission-denied entries are skipped silently (logged at warn);
    /// every other error is yielded as a [`ScanError`]. Only the first of
    /// several hard links to one inode is yielded.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileRecord, ScanError>> + '_ {
        self.walk_inner(HardlinkTracker::new())
    }

    /// Walk the directory tree, sharing a hard link tracker with other walks.
    pub fn walk_with<'a>(
        &'a self,
        tracker: &'a mut HardlinkTracker,
    ) -> impl Iterator<Item = Result<FileRecord, ScanError>> + 'a {
        self.walk_inner(tracker)
    }

    fn walk_inner<'a, T>(
        &'a self,
        mut tracker: T,
    ) -> impl Iterator<Item = Result<FileRecord, ScanError>> + 'a
    where
        T: BorrowMut<HardlinkTracker> + 'a,
    {
        let matcher = self.build_matcher();
        let mut seen = 0usize;

        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let excluded = self.is_excluded(entry.path(), entry.file_type().is_dir(), &matcher);
                if excluded {
                    log::debug!("Excluding: {}", entry.path().display());
                }
                !excluded
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    let links = <T as BorrowMut<HardlinkTracker>>::borrow_mut(&mut tracker);
                    let record = self.process_entry(&entry, links)?;
                    if let (Ok(file), Some(callback)) = (&record, &self.progress_callback) {
                        seen += 1;
                        callback.on_progress(seen, file.path.to_string_lossy().as_ref());
                    }
                    Some(record)
                }
                Err(e) => self.handle_walk_error(e),
            })
    }

    /// Turn a regular-file entry into a record.
    fn process_entry(
        &self,
        entry: &DirEntry,
        tracker: &mut HardlinkTracker,
    ) -> Option<Result<FileRecord, ScanError>> {
        // Directories are traversed, not recorded; symlinks are not followed.
        if !entry.file_type().is_file() {
            if entry.file_type().is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
            }
            return None;
        }

        match entry.metadata() {
            Ok(metadata) => {
                if tracker.is_hardlink(&metadata) {
                    log::debug!("Skipping hard link: {}", entry.path().display());
                    return None;
                }
                Some(Ok(self.provider.file_record(entry.path(), &metadata)))
            }
            Err(e) => self.handle_walk_error(e),
        }
    }

    /// Swallow permission-denied, surface everything else.
    fn handle_walk_error(&self, error: walkdir::Error) -> Option<Result<FileRecord, ScanError>> {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if error
            .io_error()
            .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
        {
            log::warn!("Permission denied, skipping: {}", path.display());
            return None;
        }

        log::error!("Walker error for {}: {}", path.display(), error);
        let source = error
            .into_io_error()
            .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
        Some(Err(ScanError::Io { path, source }))
    }
}

/// Turn an absolute pattern into a gitignore line anchored at `fs_root`.
fn anchored_line(pattern: &Path, fs_root: &Path) -> String {
    let rest = pattern
        .strip_prefix(fs_root)
        .unwrap_or(pattern)
        .to_string_lossy()
        .into_owned();
    let rest = if cfg!(windows) {
        rest.replace('\\', "/")
    } else {
        rest
    };
    format!("/{}", rest)
}

fn build_gitignore(builder: &GitignoreBuilder) -> Option<Gitignore> {
    match builder.build() {
        Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Failed to build exclude patterns: {}", e);
            None
        }
    }
}

/// Check the source roots and drop every root another root already covers.
///
/// A root is dropped when it resolves to the same directory as an earlier
/// root, or lies inside any other root. The order of the rest is kept.
///
/// # Errors
///
/// - [`ScanError::NotFound`] if a source root does not exist
/// - [`ScanError::NotADirectory`] if a source root is a file
/// - [`ScanError::Io`] if a root cannot be resolved
pub fn distinct_roots(sources: &[String]) -> Result<Vec<PathBuf>, ScanError> {
    let mut resolved = Vec::with_capacity(sources.len());
    for source in sources {
        let root = Path::new(source);
        if !root.exists() {
            return Err(ScanError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }
        let canonical = root.canonicalize().map_err(|source| ScanError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        resolved.push((root.to_path_buf(), canonical));
    }

    let mut roots = Vec::with_capacity(resolved.len());
    for (i, (root, canonical)) in resolved.iter().enumerate() {
        let covered = resolved.iter().enumerate().any(|(j, (_, other))| {
            j != i && canonical.starts_with(other) && (canonical != other || j < i)
        });
        if covered {
            log::warn!("Skipping {}: covered by another source", root.display());
        } else {
            roots.push(root.clone());
        }
    }
    Ok(roots)
}

/// Walk every source root and collect the flat list of file records.
///
/// Stops at the first error that is not permission denied. Overlapping
/// roots are walked once and no path is recorded twice.
///
/// # Errors
///
/// - [`ScanError::NotFound`] if a source root does not exist
/// - [`ScanError::NotADirectory`] if a source root is a file
/// - [`ScanError::Io`] for any other traversal failure
pub fn collect_files(
    sources: &[String],
    config: &WalkerConfig,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
) -> Result<Vec<FileRecord>, ScanError> {
    let mut files = Vec::new();
    let mut tracker = HardlinkTracker::new();
    let mut paths = HashSet::new();

    for root in distinct_roots(sources)? {
        log::debug!(" - {}", root.display());

        let mut walker = Walker::new(&root, config.clone());
        if let Some(ref callback) = progress_callback {
            walker = walker.with_progress_callback(callback.clone());
        }

        for record in walker.walk_with(&mut tracker) {
            let record = record?;
            if paths.insert(record.path.clone()) {
                files.push(record);
            } else {
                log::debug!("Skipping repeated path: {}", record.path.display());
            }
        }
    }

    log::debug!("Collected {} files", files.len());
    Ok(files)
}
