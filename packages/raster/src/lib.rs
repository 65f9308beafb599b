#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory raster grid and zonal statistics.
//!
//! A [`RasterGrid`] is a 2-D array of cell values plus an affine transform
//! and CRS, loaded from an ESRI ASCII grid via [`io::read_ascii_grid`] or
//! constructed directly. [`zonal::zonal_statistics`]
//! aggregates cell values per polygon (population sums per administrative
//! zone), tolerating per-record geometry failures without aborting the
//! batch.

pub mod grid;
pub mod io;
pub mod zonal;

pub use grid::{GridTransform, RasterGrid};
pub use io::read_ascii_grid;
pub use zonal::{CellInclusion, ZonalFailure, ZonalOptions, ZonalStatistics, zonal_statistics};

use thiserror::Error;

/// Errors raised by raster construction and zonal extraction.
///
/// Per-polygon geometry failures are *not* errors; they are collected in
/// [`ZonalStatistics::failures`] while the batch continues. This enum
/// covers systemic failures that abort the whole pass.
#[derive(Debug, Error)]
pub enum RasterError {
    /// CRS lookup or transform failed for the whole layer.
    #[error("CRS error: {0}")]
    Crs(#[from] health_access_geo::CrsError),

    /// Zone reprojection onto the raster CRS failed.
    #[error("Vector error: {0}")]
    Vector(#[from] health_access_vector::VectorError),

    /// The raster grid has zero rows or columns.
    #[error("Raster grid is empty")]
    EmptyGrid,

    /// The affine transform is non-invertible or non-finite.
    #[error("Invalid raster transform: {message}")]
    InvalidTransform {
        /// Description of what is wrong with the transform.
        message: String,
    },

    /// A raster file could not be parsed.
    #[error("Failed to parse raster: {message}")]
    Parse {
        /// Description of the malformed header or body.
        message: String,
    },

    /// A raster file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
