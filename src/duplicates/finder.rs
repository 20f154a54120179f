//! Duplicate finder implementation with a staged fingerprinting funnel.
//!
//! # Overview
//!
//! This module orchestrates the duplicate detection pipeline:
//! 1. **Stage 1 - Size grouping**: Group files by size (see [`crate::duplicates::groups`] module)
//! 2. **Stage 2 - Partial fingerprint**: Sampled digest of same-size files
//! 3. **Stage 3 - Full fingerprint**: Whole-content digest of partial matches (strict mode only)
//!
//! # Example
//!
//! ```no_run
//! use filecompact::collection::ScanOptions;
//! use filecompact::duplicates::{DuplicateFinder, FinderConfig};
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(4));
//! let options = ScanOptions {
//!     sources: vec![".".to_string()],
//!     exclude: Vec::new(),
//!     strict: true,
//! };
//!
//! let collection = finder.scan(&options).unwrap();
//! println!("{} duplicate groups", collection.group_count());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use crate::collection::{Collection, ScanOptions};
use crate::progress::ProgressCallback;
use crate::scanner::{
    collect_files, FileFingerprint, FileRecord, Fingerprinter, HashAlgorithm, HashError, ScanError,
    WalkerConfig,
};

use super::groups::{group_by_size, DuplicateGroup};

/// Initial capacity of the grouper's scratch map.
const SCRATCH_CAPACITY: usize = 64;

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Number of I/O threads for fingerprinting (1 = sequential).
    pub io_threads: usize,
    /// Digest used by the partial stage.
    pub partial_algorithm: HashAlgorithm,
    /// Digest used by the full stage.
    pub full_algorithm: HashAlgorithm,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
    /// Fingerprint source for both stages.
    pub fingerprinter: Arc<dyn FileFingerprint>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("io_threads", &self.io_threads)
            .field("partial_algorithm", &self.partial_algorithm)
            .field("full_algorithm", &self.full_algorithm)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish_non_exhaustive()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            io_threads: 1,
            partial_algorithm: HashAlgorithm::Xxh64,
            full_algorithm: HashAlgorithm::Blake3,
            progress_callback: None,
            fingerprinter: Arc::new(Fingerprinter::new()),
        }
    }
}

impl FinderConfig {
    /// Set the number of fingerprinting threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the partial stage algorithm.
    #[must_use]
    pub fn with_partial_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.partial_algorithm = algorithm;
        self
    }

    /// Set the full stage algorithm.
    #[must_use]
    pub fn with_full_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.full_algorithm = algorithm;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Replace the fingerprint source.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn FileFingerprint>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }
}

/// A fingerprinting stage of the funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Sampled digest
    Partial,
    /// Whole-content digest
    Full,
}

impl Stage {
    /// Phase name reported to progress callbacks.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Partial => "partial",
            Self::Full => "full",
        }
    }

    fn attach(self, file: &mut FileRecord, fingerprint: String) {
        match self {
            Self::Partial => file.set_partial_fingerprint(fingerprint),
            Self::Full => file.set_full_fingerprint(fingerprint),
        }
    }
}

/// Statistics from one fingerprinting stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageStats {
    /// Files that entered the stage
    pub input_files: usize,
    /// Files that received a fingerprint
    pub hashed_files: usize,
    /// Files whose fingerprint is unknown
    pub failed_files: usize,
    /// Fingerprinted files left alone in their bucket
    pub eliminated: usize,
    /// Buckets with 2+ files
    pub groups: usize,
}

/// Splits same-size buckets by fingerprint.
///
/// One scratch map is reused for every bucket; it is drained after each
/// pass so no state leaks from one bucket into the next.
pub struct Grouper {
    fingerprinter: Arc<dyn FileFingerprint>,
    partial_algorithm: HashAlgorithm,
    full_algorithm: HashAlgorithm,
    pool: Option<rayon::ThreadPool>,
    scratch: HashMap<String, Vec<FileRecord>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
    processed: AtomicUsize,
}

impl Grouper {
    /// Create a grouper. A thread pool is built only when `io_threads > 1`.
    #[must_use]
    pub fn new(config: &FinderConfig) -> Self {
        let pool = if config.io_threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.io_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    log::warn!("Failed to build fingerprint thread pool, hashing sequentially: {e}");
                    None
                }
            }
        } else {
            None
        };

        Self {
            fingerprinter: Arc::clone(&config.fingerprinter),
            partial_algorithm: config.partial_algorithm,
            full_algorithm: config.full_algorithm,
            pool,
            scratch: HashMap::with_capacity(SCRATCH_CAPACITY),
            progress_callback: config.progress_callback.clone(),
            processed: AtomicUsize::new(0),
        }
    }

    /// Run stages 2 and 3 over the size buckets.
    ///
    /// Returns the surviving groups ordered by size, then fingerprint.
    pub fn run(
        &mut self,
        size_groups: BTreeMap<u64, Vec<FileRecord>>,
        strict: bool,
    ) -> Vec<DuplicateGroup> {
        let buckets: Vec<Vec<FileRecord>> = size_groups.into_values().collect();
        let (partial, stats) = self.run_stage(buckets, Stage::Partial);
        log_stage_stats(Stage::Partial, &stats);

        let survivors = if strict {
            let buckets = partial.into_iter().map(|(_, files)| files).collect();
            let (full, stats) = self.run_stage(buckets, Stage::Full);
            log_stage_stats(Stage::Full, &stats);
            full
        } else {
            partial
        };

        survivors
            .into_iter()
            .map(|(fingerprint, files)| DuplicateGroup::new(fingerprint, files))
            .collect()
    }

    fn run_stage(
        &mut self,
        buckets: Vec<Vec<FileRecord>>,
        stage: Stage,
    ) -> (Vec<(String, Vec<FileRecord>)>, StageStats) {
        let mut stats = StageStats::default();
        let total = buckets.iter().map(Vec::len).sum();

        self.processed.store(0, Ordering::Relaxed);
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(stage.name(), total);
        }

        let mut survivors = Vec::new();
        for bucket in buckets {
            survivors.extend(self.split(bucket, stage, &mut stats));
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(stage.name());
        }

        (survivors, stats)
    }

    /// Split one bucket by the stage's fingerprint.
    ///
    /// Files with an unknown fingerprint are dropped. Buckets with fewer
    /// than two files are dropped. The rest are returned sorted by key.
    pub fn split(
        &mut self,
        files: Vec<FileRecord>,
        stage: Stage,
        stats: &mut StageStats,
    ) -> Vec<(String, Vec<FileRecord>)> {
        stats.input_files += files.len();

        for (mut file, result) in self.fingerprint_all(files, stage) {
            match result {
                Ok(fingerprint) if !fingerprint.is_empty() => {
                    stats.hashed_files += 1;
                    stage.attach(&mut file, fingerprint.clone());
                    self.scratch.entry(fingerprint).or_default().push(file);
                }
                Ok(_) => {
                    stats.failed_files += 1;
                    log::warn!("Empty fingerprint for {}", file.path.display());
                }
                Err(e) => {
                    stats.failed_files += 1;
                    log::warn!("Skipping {}: {}", file.path.display(), e);
                }
            }
        }

        let mut buckets = Vec::new();
        for (fingerprint, files) in self.scratch.drain() {
            if files.len() > 1 {
                buckets.push((fingerprint, files));
            } else {
                stats.eliminated += files.len();
            }
        }
        buckets.sort_by(|a, b| a.0.cmp(&b.0));
        stats.groups += buckets.len();

        buckets
    }

    /// Fingerprint every file, preserving input order.
    fn fingerprint_all(
        &self,
        files: Vec<FileRecord>,
        stage: Stage,
    ) -> Vec<(FileRecord, Result<String, HashError>)> {
        match self.pool {
            Some(ref pool) => pool.install(|| {
                files
                    .into_par_iter()
                    .map(|file| self.fingerprint_one(file, stage))
                    .collect()
            }),
            None => files
                .into_iter()
                .map(|file| self.fingerprint_one(file, stage))
                .collect(),
        }
    }

    fn fingerprint_one(
        &self,
        file: FileRecord,
        stage: Stage,
    ) -> (FileRecord, Result<String, HashError>) {
        let algorithm = match stage {
            Stage::Partial => self.partial_algorithm,
            Stage::Full => self.full_algorithm,
        };
        let result = self
            .fingerprinter
            .fingerprint(&file.path, algorithm, stage == Stage::Full);

        if let Some(ref callback) = self.progress_callback {
            let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
            callback.on_progress(current, file.path.to_string_lossy().as_ref());
        }

        (file, result)
    }
}

fn log_stage_stats(stage: Stage, stats: &StageStats) {
    log::debug!(
        "Stage {}: {} input, {} hashed, {} failed, {} eliminated, {} groups",
        stage.name(),
        stats.input_files,
        stats.hashed_files,
        stats.failed_files,
        stats.eliminated,
        stats.groups
    );
}

/// Merge groups into a map keyed by fingerprint.
///
/// A key that is already taken (same digest from a different size bucket)
/// is stored as `"{fingerprint}:{size}"` so groups never mix sizes.
#[must_use]
pub fn merge_groups(groups: Vec<DuplicateGroup>) -> BTreeMap<String, DuplicateGroup> {
    let mut merged = BTreeMap::new();

    for mut group in groups {
        if merged.contains_key(&group.fingerprint) {
            let key = format!("{}:{}", group.fingerprint, group.size);
            log::warn!(
                "Fingerprint {} shared across sizes, storing {} byte group as {}",
                group.fingerprint,
                group.size,
                key
            );
            group.fingerprint = key;
        }
        merged.insert(group.fingerprint.clone(), group);
    }

    merged
}

/// Errors that can occur during duplicate finding.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Walking a source root failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Duplicate finder that runs the complete funnel and produces a [`Collection`].
///
/// # Example
///
/// ```no_run
/// use filecompact::collection::ScanOptions;
/// use filecompact::duplicates::DuplicateFinder;
///
/// let finder = DuplicateFinder::with_defaults();
/// let options = ScanOptions {
///     sources: vec!["/some/path".to_string()],
///     ..Default::default()
/// };
///
/// match finder.scan(&options) {
///     Ok(collection) => println!("Can reclaim {} bytes", collection.delete_size),
///     Err(e) => eprintln!("Scan failed: {}", e),
/// }
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Walk every source root and group the files found.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Scan`] if a source root is missing, is not a
    /// directory, or traversal hits an I/O error other than permission denied.
    pub fn scan(&self, options: &ScanOptions) -> Result<Collection, FinderError> {
        let start = Instant::now();
        log::info!("Collecting files from:");

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
        }
        let walked = collect_files(
            &options.sources,
            &WalkerConfig::new(options.exclude.clone()),
            self.config.progress_callback.clone(),
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }

        Ok(self.build_collection(options.clone(), walked?, start))
    }

    /// Group an already collected list of files.
    ///
    /// Useful for testing or when files come from another source.
    #[must_use]
    pub fn find_duplicates_from_files(
        &self,
        options: ScanOptions,
        files: Vec<FileRecord>,
    ) -> Collection {
        self.build_collection(options, files, Instant::now())
    }

    fn build_collection(
        &self,
        options: ScanOptions,
        files: Vec<FileRecord>,
        start: Instant,
    ) -> Collection {
        let (size_groups, size_stats) = group_by_size(files);
        log::debug!(
            "Stage size: {} files, {} eliminated ({:.1}%), {} groups",
            size_stats.total_files,
            size_stats.eliminated_unique,
            size_stats.elimination_rate(),
            size_stats.size_groups
        );

        let mut grouper = Grouper::new(&self.config);
        let groups = merge_groups(grouper.run(size_groups, options.strict));

        let mut collection = Collection::new(
            options,
            groups,
            size_stats.total_files as u64,
            size_stats.total_size,
        );
        collection.elapsed = start.elapsed();
        collection
    }
}
