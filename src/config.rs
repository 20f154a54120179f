//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. A TOML file: `--config <PATH>`, else `filecompact.toml` in the working
//!    directory, else `filecompact.toml` in the platform config directory
//! 3. `FILECOMPACT_*` environment variables (e.g. `FILECOMPACT_IO_THREADS=4`)
//! 4. Command-line flags ([`Config::apply_cli`])

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::{Cli, FullHashArg};

/// Name of the configuration file looked up in the default locations.
pub const CONFIG_FILE_NAME: &str = "filecompact.toml";

/// Default location of the saved collection.
pub const DEFAULT_SAVE_FILE: &str = "filecompact.state";

/// Prefix of the environment variables read into the configuration.
pub const ENV_PREFIX: &str = "FILECOMPACT_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source directories to scan.
    pub sources: Vec<String>,
    /// Exclude patterns.
    pub exclude: Vec<String>,
    /// Verify candidates with a full-content digest.
    pub strict: bool,
    /// Where the collection is saved; empty disables saving.
    pub save: String,
    /// Number of fingerprinting threads.
    pub io_threads: usize,
    /// Digest used by strict mode.
    pub full_hash: FullHashArg,
    /// Move deleted files to the trash.
    pub trash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            exclude: Vec::new(),
            strict: false,
            save: DEFAULT_SAVE_FILE.to_string(),
            io_threads: 1,
            full_hash: FullHashArg::Blake3,
            trash: false,
        }
    }
}

impl Config {
    /// Build the layered figment (defaults, file, environment).
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is given but does not exist.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Some(path) = Self::config_file(explicit)? {
            log::debug!("Reading configuration from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load the configuration from defaults, file and environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer holds
    /// a value of the wrong type.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::figment(explicit)?
            .extract()
            .context("Invalid configuration")
    }

    /// Apply command-line flags on top of this configuration.
    ///
    /// Sources given on the command line replace configured ones; exclude
    /// patterns are added to them. With no source at all, `.` is scanned.
    #[must_use]
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        let cli_sources: Vec<String> = cli.sources.iter().chain(&cli.paths).cloned().collect();
        if !cli_sources.is_empty() {
            self.sources = cli_sources;
        }
        if self.sources.is_empty() {
            self.sources.push(".".to_string());
        }

        self.exclude.extend(cli.exclude.iter().cloned());
        self.strict |= cli.strict;
        self.trash |= cli.trash;

        if let Some(ref save) = cli.save {
            self.save = save.clone();
        }
        if let Some(threads) = cli.io_threads {
            self.io_threads = usize::from(threads);
        }
        if let Some(full_hash) = cli.full_hash {
            self.full_hash = full_hash;
        }
        self.io_threads = self.io_threads.max(1);
        self
    }

    /// Save path, or `None` when saving is disabled.
    #[must_use]
    pub fn save_path(&self) -> Option<&Path> {
        if self.save.is_empty() {
            None
        } else {
            Some(Path::new(&self.save))
        }
    }

    fn config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if !path.is_file() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Ok(Some(local));
        }

        Ok(Self::platform_config_path().filter(|p| p.is_file()))
    }

    /// Platform-specific configuration file path.
    #[must_use]
    pub fn platform_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "filecompact").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
