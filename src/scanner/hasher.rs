//! Content fingerprinting with a bounded sampling read policy.
//!
//! # Overview
//!
//! [`Fingerprinter`] computes a hex digest of a file's bytes. The amount of
//! I/O is bounded for large files:
//!
//! - With `full_read`, or when the file is at most [`FULL_READ_THRESHOLD`]
//!   bytes (160 KiB), the whole content is digested.
//! - Otherwise [`SAMPLE_COUNT`] windows of [`WINDOW_SIZE`] bytes, starting at
//!   offsets `i * size / 10`, are fed into one running digest.
//!
//! The digest algorithm is a capability ([`ContentDigest`]) chosen per stage
//! through [`HashAlgorithm`]: a fast non-cryptographic digest (xxHash64) for
//! the sampled stage, a cryptographic one (BLAKE3 or SHA-256) for full-content
//! verification.

use std::fs::File;
use std::hash::Hasher as _;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use twox_hash::XxHash64;

use super::HashError;

/// Size of one sampled window (32 KiB).
pub const WINDOW_SIZE: u64 = 32 * 1024;

/// Number of windows sampled from a large file.
pub const SAMPLE_COUNT: u64 = 10;

/// Files up to this size are always digested in full (160 KiB).
pub const FULL_READ_THRESHOLD: u64 = 5 * WINDOW_SIZE;

/// A streaming digest.
pub trait ContentDigest: Send {
    /// Feed more bytes into the digest.
    fn update(&mut self, data: &[u8]);

    /// Consume the digest and return it as lowercase hex.
    fn finish_hex(self: Box<Self>) -> String;
}

struct Xxh64Digest(XxHash64);

impl ContentDigest for Xxh64Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        format!("{:016x}", self.0.finish())
    }
}

struct Blake3Digest(blake3::Hasher);

impl ContentDigest for Blake3Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

struct Sha256Digest(sha2::Sha256);

impl ContentDigest for Sha256Digest {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finish_hex(self: Box<Self>) -> String {
        format!("{:x}", self.0.finalize())
    }
}

/// Digest algorithms available to the fingerprinting stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// xxHash64: fast, non-cryptographic
    Xxh64,
    /// BLAKE3: cryptographic
    #[default]
    Blake3,
    /// SHA-256: cryptographic
    Sha256,
}

impl HashAlgorithm {
    /// Start a fresh digest for this algorithm.
    #[must_use]
    pub fn digest(self) -> Box<dyn ContentDigest> {
        match self {
            Self::Xxh64 => Box::new(Xxh64Digest(XxHash64::with_seed(0))),
            Self::Blake3 => Box::new(Blake3Digest(blake3::Hasher::new())),
            Self::Sha256 => Box::new(Sha256Digest(sha2::Sha256::new())),
        }
    }

    /// Whether collisions are computationally infeasible to construct.
    #[must_use]
    pub fn is_cryptographic(self) -> bool {
        !matches!(self, Self::Xxh64)
    }

    /// Lowercase algorithm name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Xxh64 => "xxh64",
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Computes file fingerprints.
///
/// Each call opens the file, reads it according to the read policy and
/// drops the handle before returning, on success and on every error path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fingerprinter;

impl Fingerprinter {
    /// Create a new fingerprinter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint a file.
    ///
    /// # Arguments
    ///
    /// * `path` - File to read
    /// * `algorithm` - Digest to use
    /// * `full_read` - Digest the entire content regardless of size
    ///
    /// # Errors
    ///
    /// Any open, stat, seek or read failure returns a [`HashError`]. The
    /// caller must treat it as an unknown fingerprint, never as a match key.
    pub fn fingerprint(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        full_read: bool,
    ) -> Result<String, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        let mut digest = algorithm.digest();
        let mut buffer = vec![0u8; WINDOW_SIZE as usize];

        if full_read || size <= FULL_READ_THRESHOLD {
            feed(&mut file, digest.as_mut(), &mut buffer, u64::MAX)
                .map_err(|e| HashError::from_io(path, e))?;
        } else {
            for offset in sample_offsets(size) {
                file.seek(SeekFrom::Start(offset))
                    .map_err(|e| HashError::from_io(path, e))?;
                feed(&mut file, digest.as_mut(), &mut buffer, WINDOW_SIZE)
                    .map_err(|e| HashError::from_io(path, e))?;
            }
        }

        let hex = digest.finish_hex();
        if hex.is_empty() {
            return Err(HashError::Empty(path.to_path_buf()));
        }
        Ok(hex)
    }

    /// Sampled fingerprint (bounded read).
    pub fn partial(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
        self.fingerprint(path, algorithm, false)
    }

    /// Full-content fingerprint.
    pub fn full(&self, path: &Path, algorithm: HashAlgorithm) -> Result<String, HashError> {
        self.fingerprint(path, algorithm, true)
    }
}

/// Source of file fingerprints used by the grouping stages.
///
/// [`Fingerprinter`] reads the file system; other implementations can stand
/// in for it to inject failures.
pub trait FileFingerprint: Send + Sync {
    /// Fingerprint `path`, reading it in full when `full_read` is set.
    ///
    /// # Errors
    ///
    /// Any failure means the fingerprint is unknown.
    fn fingerprint(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        full_read: bool,
    ) -> Result<String, HashError>;
}

impl FileFingerprint for Fingerprinter {
    fn fingerprint(
        &self,
        path: &Path,
        algorithm: HashAlgorithm,
        full_read: bool,
    ) -> Result<String, HashError> {
        Fingerprinter::fingerprint(self, path, algorithm, full_read)
    }
}

/// Start offsets of the sampled windows for a file of `size` bytes.
#[must_use]
pub fn sample_offsets(size: u64) -> Vec<u64> {
    (0..SAMPLE_COUNT)
        .map(|i| (u128::from(size) * u128::from(i) / u128::from(SAMPLE_COUNT)) as u64)
        .collect()
}

/// Read up to `limit` bytes from `reader` into `digest`.
///
/// A window that runs into end of file is digested as far as it goes.
fn feed<R: Read>(
    reader: &mut R,
    digest: &mut dyn ContentDigest,
    buffer: &mut [u8],
    limit: u64,
) -> std::io::Result<()> {
    let mut remaining = limit;
    while remaining > 0 {
        let want = buffer.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let n = match reader.read(&mut buffer[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digest.update(&buffer[..n]);
        remaining -= n as u64;
    }
    Ok(())
}
