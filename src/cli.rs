//! Command-line interface definitions for filecompact.
//!
//! This module defines all CLI arguments using the clap derive API. Most
//! options can also be set in the configuration file or through
//! `FILECOMPACT_*` environment variables; flags given here win.
//!
//! # Example
//!
//! ```bash
//! # Scan two directories and save the result
//! filecompact -s ~/Pictures -s /mnt/backup/Pictures
//!
//! # Verify candidates with a full-content digest, skipping caches
//! filecompact --strict -e node_modules -e '*.tmp' ~/src
//!
//! # Delete the duplicates found by an earlier run
//! filecompact --load filecompact.state --delete
//! ```

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::scanner::HashAlgorithm;

/// Find duplicate files and reclaim the space they take.
///
/// Files are grouped by size, then by a sampled content digest, and with
/// `--strict` by a digest of the whole content. In every group the oldest
/// file is kept.
#[derive(Debug, Parser)]
#[command(name = "filecompact")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan (added to --source)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// Delete duplicates after scanning or loading
    #[arg(long)]
    pub delete: bool,

    /// Load a saved collection instead of scanning
    #[arg(long, value_name = "PATH")]
    pub load: Option<PathBuf>,

    /// Where to save the collection (empty to disable) [default: filecompact.state]
    #[arg(long, value_name = "PATH")]
    pub save: Option<String>,

    /// Source directory (can be specified multiple times)
    #[arg(short = 's', long = "source", value_name = "DIR")]
    pub sources: Vec<String>,

    /// Exclude pattern (can be specified multiple times)
    ///
    /// Gitignore-style globs; an absolute pattern is matched against the full path.
    #[arg(short = 'e', long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub debug: bool,

    /// Verify candidates with a digest of the whole content
    #[arg(short = 'S', long)]
    pub strict: bool,

    /// Move deleted files to the trash instead of removing them
    #[arg(long)]
    pub trash: bool,

    /// Number of threads used for fingerprinting [default: 1]
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,

    /// Digest used by strict mode [default: blake3]
    #[arg(long, value_enum, value_name = "ALGO")]
    pub full_hash: Option<FullHashArg>,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Digest choices for the strict stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FullHashArg {
    /// BLAKE3
    #[default]
    Blake3,
    /// SHA-256
    Sha256,
}

impl From<FullHashArg> for HashAlgorithm {
    fn from(arg: FullHashArg) -> Self {
        match arg {
            FullHashArg::Blake3 => HashAlgorithm::Blake3,
            FullHashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

impl std::fmt::Display for FullHashArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FullHashArg::Blake3 => write!(f, "blake3"),
            FullHashArg::Sha256 => write!(f, "sha256"),
        }
    }
}
