//! Output for scan and deletion results.
//!
//! Results are reported as log lines at info level, so `--quiet` silences
//! them together with the rest of the informational output.

pub mod report;

pub use report::{
    format_elapsed, format_size, report_deletion, report_groups, report_summary,
};
