//! Persisting a [`Collection`] to a bucketed store.
//!
//! Layout: bucket `collect` holds the scalar keys, and the nested bucket
//! `collect/files` maps each group key to the JSON array of its members in
//! survivor order.

use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::duplicates::DuplicateGroup;
use crate::scanner::FileRecord;

use super::data::{Collection, ScanOptions};
use super::kv::{nested, KvStore, KvTx};

/// Top-level bucket.
pub const COLLECT_BUCKET: &str = "collect";
/// Bucket nested under [`COLLECT_BUCKET`] holding the groups.
pub const FILES_BUCKET: &str = "files";

const KEY_SOURCES: &str = "sources";
const KEY_EXCLUDE: &str = "exclude";
const KEY_STRICT: &str = "strict";
const KEY_TOTAL_FILES: &str = "total_files";
const KEY_TOTAL_SIZE: &str = "total_size";
const KEY_DELETE_COUNT: &str = "delete_count";
const KEY_DELETE_SIZE: &str = "delete_size";
const KEY_ELAPSED: &str = "elapsed";

/// Errors from saving or loading a collection.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The store file could not be opened.
    #[error("Failed to open store {path}: {source}")]
    Open {
        /// Path of the store file
        path: std::path::PathBuf,
        /// The underlying SQLite error
        #[source]
        source: rusqlite::Error,
    },

    /// A SQLite operation failed.
    #[error("Store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A required bucket is missing.
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// A stored value could not be decoded.
    #[error("Invalid value for key {key}: {message}")]
    Decode {
        /// Key holding the bad value
        key: String,
        /// What was wrong with it
        message: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Collection {
    /// Write this collection to `path`, creating the store if needed.
    ///
    /// Everything is written in one transaction. Groups from an earlier
    /// save to the same file are replaced, not merged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be opened or any write fails.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let result = KvStore::open(path)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|mut store| store.update(|tx| self.write_to(tx)));

        if let Err(ref e) = result {
            log::error!("Failed to save collection to {}: {}", path.display(), e);
        }
        result
    }

    fn write_to(&self, tx: &KvTx<'_>) -> Result<(), StoreError> {
        tx.create_bucket(COLLECT_BUCKET)?;

        let put = |key: &str, value: &[u8]| tx.put(COLLECT_BUCKET, key.as_bytes(), value);
        put(KEY_SOURCES, &serde_json::to_vec(&self.options.sources)?)?;
        put(KEY_EXCLUDE, &serde_json::to_vec(&self.options.exclude)?)?;
        put(KEY_STRICT, self.options.strict.to_string().as_bytes())?;
        put(KEY_TOTAL_FILES, self.total_files.to_string().as_bytes())?;
        put(KEY_TOTAL_SIZE, self.total_size.to_string().as_bytes())?;
        put(KEY_DELETE_COUNT, self.delete_count.to_string().as_bytes())?;
        put(KEY_DELETE_SIZE, self.delete_size.to_string().as_bytes())?;
        put(KEY_ELAPSED, format_duration(self.elapsed).as_bytes())?;

        let files_bucket = nested(COLLECT_BUCKET, FILES_BUCKET);
        tx.delete_bucket(&files_bucket)?;
        tx.create_bucket(&files_bucket)?;
        for (key, group) in &self.groups {
            tx.put(&files_bucket, key.as_bytes(), &serde_json::to_vec(&group.files)?)?;
        }

        log::debug!("Wrote {} groups", self.groups.len());
        Ok(())
    }

    /// Read a collection previously written by [`Collection::save`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::Open`] if the file cannot be opened
    /// - [`StoreError::BucketNotFound`] if it holds no saved collection
    /// - [`StoreError::Decode`] or [`StoreError::Json`] for malformed values
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let result = KvStore::open_read_only(path)
            .map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|store| store.view(read_from));

        if let Err(ref e) = result {
            log::error!("Failed to load collection from {}: {}", path.display(), e);
        }
        result
    }
}

fn read_from(tx: &KvTx<'_>) -> Result<Collection, StoreError> {
    if !tx.bucket_exists(COLLECT_BUCKET)? {
        return Err(StoreError::BucketNotFound(COLLECT_BUCKET.to_string()));
    }

    let options = ScanOptions {
        sources: read_json(tx, KEY_SOURCES)?.unwrap_or_default(),
        exclude: read_json(tx, KEY_EXCLUDE)?.unwrap_or_default(),
        strict: read_scalar(tx, KEY_STRICT)?.unwrap_or_default(),
    };

    let elapsed = match read_text(tx, KEY_ELAPSED)? {
        Some(text) => parse_duration(&text).map_err(|message| StoreError::Decode {
            key: KEY_ELAPSED.to_string(),
            message,
        })?,
        None => Duration::ZERO,
    };

    let mut groups = BTreeMap::new();
    let files_bucket = nested(COLLECT_BUCKET, FILES_BUCKET);
    tx.for_each(&files_bucket, |key, value| -> Result<(), StoreError> {
        let fingerprint = String::from_utf8(key.to_vec()).map_err(|e| StoreError::Decode {
            key: String::from_utf8_lossy(key).into_owned(),
            message: e.to_string(),
        })?;
        let files: Vec<FileRecord> = serde_json::from_slice(value)?;
        groups.insert(fingerprint.clone(), DuplicateGroup::new(fingerprint, files));
        Ok(())
    })?;

    Ok(Collection {
        options,
        groups,
        total_files: read_scalar(tx, KEY_TOTAL_FILES)?.unwrap_or_default(),
        total_size: read_scalar(tx, KEY_TOTAL_SIZE)?.unwrap_or_default(),
        delete_count: read_scalar(tx, KEY_DELETE_COUNT)?.unwrap_or_default(),
        delete_size: read_scalar(tx, KEY_DELETE_SIZE)?.unwrap_or_default(),
        elapsed,
    })
}

fn read_text(tx: &KvTx<'_>, key: &str) -> Result<Option<String>, StoreError> {
    match tx.get(COLLECT_BUCKET, key.as_bytes())? {
        Some(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StoreError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn read_scalar<T>(tx: &KvTx<'_>, key: &str) -> Result<Option<T>, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    read_text(tx, key)?
        .map(|text| {
            text.parse::<T>().map_err(|e| StoreError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn read_json<T: DeserializeOwned>(tx: &KvTx<'_>, key: &str) -> Result<Option<T>, StoreError> {
    match tx.get(COLLECT_BUCKET, key.as_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Encode a duration as `"<secs>.<nanos>s"` with nine fractional digits.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    format!("{}.{:09}s", duration.as_secs(), duration.subsec_nanos())
}

/// Decode a duration written by [`format_duration`].
///
/// A fraction shorter than nine digits is accepted and padded.
///
/// # Errors
///
/// Returns a description of the problem if `text` is not of that form.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let body = text
        .strip_suffix('s')
        .ok_or_else(|| format!("missing 's' suffix in {text:?}"))?;
    let (secs, frac) = body.split_once('.').unwrap_or((body, ""));

    let secs: u64 = secs
        .parse()
        .map_err(|e| format!("bad seconds in {text:?}: {e}"))?;

    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("bad fraction in {text:?}"));
    }
    let nanos = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}")
            .parse::<u32>()
            .map_err(|e| format!("bad fraction in {text:?}: {e}"))?
    };

    Ok(Duration::new(secs, nanos))
}
