//! Things Logbook - sync the Things 3 logbook into Markdown daily notes
//!
//! This crate provides the core functionality for the `logbook` CLI tool.
//!
//! # Architecture
//!
//! - [`things`] - Read-only access to the Things database: paginated fetch and merge
//! - [`render`] - Markdown rendering of merged tasks, grouped by day
//! - [`notes`] - Daily note files and section splicing
//! - [`sync`] - Sync passes, the watch loop, and status
//! - [`config`] - Settings file and path resolution
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod notes;
pub mod render;
pub mod sync;
pub mod things;

pub use error::{Error, Result};
