//! Application entry logic shared by the binary and the integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{delete_duplicates, DeleteMode};
use crate::cli::Cli;
use crate::collection::{Collection, ScanOptions};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::logging::init_logging;
use crate::output::{report_deletion, report_groups, report_summary};
use crate::progress::Progress;

/// Run the application for parsed command-line arguments.
///
/// Scans (or loads), reports, saves, and deletes when asked to.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a source root cannot be
/// walked, or the collection cannot be loaded or saved.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.debug, cli.quiet);

    let config = Config::load(cli.config.as_deref())?.apply_cli(&cli);
    log::debug!("Configuration: {:?}", config);

    let collection = match cli.load {
        Some(ref path) => {
            log::info!("Loading collection from {}", path.display());
            Collection::load(path)
                .with_context(|| format!("Failed to load collection from {}", path.display()))?
        }
        None => scan(&config, cli.quiet || cli.debug)?,
    };

    if !cli.delete {
        report_groups(&collection);
    }
    report_summary(&collection);

    let saved = if cli.load.is_none() {
        save(&collection, config.save_path())?
    } else {
        None
    };

    if !collection.has_duplicates() {
        log::info!("No duplicates found");
        return Ok(ExitCode::NoDuplicates);
    }

    if !cli.delete {
        return Ok(ExitCode::Success);
    }

    let mode = if config.trash {
        DeleteMode::Trash
    } else {
        DeleteMode::Permanent
    };
    log::info!("Deleting duplicates...");
    let result = delete_duplicates(&collection, mode);
    report_deletion(&result);

    // The saved state lists files that no longer exist.
    if let Some(state) = cli.load.or(saved) {
        remove_state_file(&state);
    }

    if result.all_succeeded() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::PartialSuccess)
    }
}

fn scan(config: &Config, hide_progress: bool) -> Result<Collection> {
    let options = ScanOptions {
        sources: config.sources.clone(),
        exclude: config.exclude.clone(),
        strict: config.strict,
    };

    let finder_config = FinderConfig::default()
        .with_io_threads(config.io_threads)
        .with_full_algorithm(config.full_hash.into())
        .with_progress_callback(Arc::new(Progress::new(hide_progress)));

    log::info!("Collecting...");
    DuplicateFinder::new(finder_config)
        .scan(&options)
        .context("Failed to collect files")
}

fn save(collection: &Collection, path: Option<&Path>) -> Result<Option<PathBuf>> {
    let Some(path) = path else {
        return Ok(None);
    };

    collection
        .save(path)
        .with_context(|| format!("Failed to save collection to {}", path.display()))?;
    log::info!("Saved collection to {}", path.display());
    Ok(Some(path.to_path_buf()))
}

fn remove_state_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => log::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
    }
}
