//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based file grouping (Stage 1)
//! - Partial fingerprint comparison (Stage 2)
//! - Full fingerprint comparison in strict mode (Stage 3)
//! - Survivor selection inside each duplicate group

pub mod finder;
pub mod groups;
pub mod selector;

pub use finder::{
    merge_groups, DuplicateFinder, FinderConfig, FinderError, Grouper, Stage, StageStats,
};
pub use groups::{group_by_size, DuplicateGroup, GroupingStats};
pub use selector::{compare_records, sort_group};
