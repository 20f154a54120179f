//! Scan results and their persistence.
//!
//! - [`data`]: the [`Collection`] produced by a scan
//! - [`kv`]: SQLite exposed as a bucketed key-value store
//! - [`store`]: saving and loading a [`Collection`]

pub mod data;
pub mod kv;
pub mod store;

pub use data::{Collection, ScanOptions};
pub use kv::KvStore;
pub use store::{format_duration, parse_duration, StoreError};
