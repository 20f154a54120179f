//! filecompact - duplicate file finder
//!
//! Finds duplicate files under one or more directory trees with a staged
//! fingerprinting funnel (size, sampled digest, optional full digest), keeps
//! the oldest copy of each, and can delete the rest.

pub mod actions;
pub mod app;
pub mod cli;
pub mod collection;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

pub use app::run_app;
