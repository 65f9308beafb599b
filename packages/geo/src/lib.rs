#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CRS registry and reprojection utilities.
//!
//! Every other package goes through this crate for coordinate reference
//! system handling: EPSG lookup against the `crs-definitions` database and
//! coordinate transforms via `proj4rs` (pure Rust, no GDAL/PROJ system
//! dependency). Also hosts the [`progress::ProgressCallback`] trait shared
//! by long-running batch passes.

pub mod crs;
pub mod progress;
pub mod project;

pub use crs::Crs;
pub use project::Reprojector;

use thiserror::Error;

/// Errors raised by CRS lookup and coordinate transforms.
#[derive(Debug, Error)]
pub enum CrsError {
    /// EPSG code not present in the `crs-definitions` database.
    #[error("EPSG:{0} is not in the CRS definitions database")]
    UnknownEpsg(u16),

    /// A projection definition exists but could not be parsed by proj4rs.
    #[error("Invalid projection definition for EPSG:{epsg}: {message}")]
    InvalidProjection {
        /// The offending EPSG code.
        epsg: u16,
        /// Underlying proj4rs failure.
        message: String,
    },

    /// A coordinate transform failed (degenerate or out-of-domain input).
    #[error("Transform from EPSG:{source_epsg} to EPSG:{target} failed: {message}")]
    Transform {
        /// Source EPSG code.
        source_epsg: u16,
        /// Target EPSG code.
        target: u16,
        /// Underlying proj4rs failure.
        message: String,
    },

    /// An operation required a CRS but the layer had none.
    #[error("Layer has no CRS assigned and the operation requires one")]
    MissingCrs,
}
