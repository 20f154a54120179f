//! File actions module.
//!
//! # Deletion
//!
//! The delete module removes every non-survivor member of each duplicate
//! group:
//! - Permanent deletion (default)
//! - Move to system trash (`DeleteMode::Trash`)
//!
//! ```no_run
//! use filecompact::actions::delete::{delete_file, DeleteMode};
//! use std::path::PathBuf;
//!
//! let path = PathBuf::from("/path/to/duplicate.txt");
//! let result = delete_file(&path, DeleteMode::Trash);
//! ```

pub mod delete;

pub use delete::{delete_duplicates, delete_file, DeleteError, DeleteMode, DeletionResult};
