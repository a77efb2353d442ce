//! Output module for run summaries and reports
//!
//! This module handles:
//! - Printing the run report and manifest statistics
//! - Writing the markdown run summary

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::{load_statistics, print_run_report, print_statistics};

use thiserror::Error;

/// Errors that can occur while producing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] crate::manifest::ManifestError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
