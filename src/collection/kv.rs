//! Bucketed key-value store on top of SQLite.
//!
//! Buckets are named by path (`parent/child`). Every write goes through
//! [`KvStore::update`], which runs inside one SQLite transaction: either all
//! of it lands or none of it does.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv_bucket (name TEXT PRIMARY KEY NOT NULL);
CREATE TABLE IF NOT EXISTS kv_entry (
    bucket TEXT NOT NULL REFERENCES kv_bucket(name) ON DELETE CASCADE,
    key    BLOB NOT NULL,
    value  BLOB NOT NULL,
    PRIMARY KEY (bucket, key)
);";

/// Name of bucket `child` nested inside `parent`.
#[must_use]
pub fn nested(parent: &str, child: &str) -> String {
    format!("{parent}/{child}")
}

/// A SQLite file exposed as buckets of key to bytes.
pub struct KvStore {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").field("path", &self.path).finish()
    }
}

impl KvStore {
    /// Open or create a store for reading and writing.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Opened store {}", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing store without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        log::debug!("Opened store {} read-only", path.display());
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction commits only if `f` returns `Ok`; otherwise it is
    /// rolled back when dropped.
    pub fn update<T, E, F>(&mut self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&KvTx<'_>) -> std::result::Result<T, E>,
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.transaction()?;
        let value = f(&KvTx { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Run `f` with read access.
    pub fn view<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&KvTx<'_>) -> std::result::Result<T, E>,
    {
        f(&KvTx { conn: &self.conn })
    }
}

/// Bucket operations available inside [`KvStore::update`] and [`KvStore::view`].
pub struct KvTx<'a> {
    conn: &'a Connection,
}

impl KvTx<'_> {
    fn has_schema(&self) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_bucket'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Whether bucket `name` exists.
    pub fn bucket_exists(&self, name: &str) -> Result<bool> {
        if !self.has_schema()? {
            return Ok(false);
        }
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM kv_bucket WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Create bucket `name` if it does not exist.
    pub fn create_bucket(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO kv_bucket (name) VALUES (?1)",
            params![name],
        )?;
        Ok(())
    }

    /// Delete bucket `name`, its entries and every bucket nested inside it.
    pub fn delete_bucket(&self, name: &str) -> Result<()> {
        let prefix = format!("{name}/");
        self.conn.execute(
            "DELETE FROM kv_entry WHERE bucket = ?1 OR substr(bucket, 1, ?3) = ?2",
            params![name, prefix, prefix.len() as i64],
        )?;
        self.conn.execute(
            "DELETE FROM kv_bucket WHERE name = ?1 OR substr(name, 1, ?3) = ?2",
            params![name, prefix, prefix.len() as i64],
        )?;
        Ok(())
    }

    /// Insert or replace `key` in `bucket`.
    pub fn put(&self, bucket: &str, key: &[u8], value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_entry (bucket, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(bucket, key) DO UPDATE SET value = excluded.value",
            params![bucket, key, value],
        )?;
        Ok(())
    }

    /// Value of `key` in `bucket`, if present.
    pub fn get(&self, bucket: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT value FROM kv_entry WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| row.get(0),
            )
            .optional()
    }

    /// Visit every entry of `bucket` in key order.
    pub fn for_each<E, F>(&self, bucket: &str, mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> std::result::Result<(), E>,
        E: From<rusqlite::Error>,
    {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM kv_entry WHERE bucket = ?1 ORDER BY key")?;
        let mut rows = stmt.query(params![bucket])?;
        while let Some(row) = rows.next()? {
            let key: Vec<u8> = row.get(0)?;
            let value: Vec<u8> = row.get(1)?;
            f(&key, &value)?;
        }
        Ok(())
    }
}
