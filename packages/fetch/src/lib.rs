#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Data acquisition for the health access pipeline.
//!
//! Downloads administrative boundaries (zipped archives) and health
//! facility collections (GeoJSON API), and loads facility CSVs
//! with coordinate columns. All HTTP goes through [`retry`] for
//! exponential-backoff retry on transient failures.

pub mod boundaries;
pub mod csv_loader;
pub mod facilities;
pub mod retry;

use thiserror::Error;

/// Errors raised during data acquisition.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed after all retries.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a permanent error status.
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Response status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Zip archive extraction failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required CSV column was absent.
    #[error("CSV is missing required column '{column}'; found: {found:?}")]
    MissingColumn {
        /// The expected column name.
        column: String,
        /// Header columns actually present.
        found: Vec<String>,
    },

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
