#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Healthcare accessibility analysis.
//!
//! Generates a regular sample grid over a boundary's bounding box,
//! computes nearest-facility distances via an R-tree index, and classifies
//! each grid point against configurable distance thresholds.

pub mod analyzer;
pub mod grid;
pub mod index;

pub use analyzer::{analyze, calculate_distances, classify_accessibility, threshold_column};
pub use grid::create_sample_grid;
pub use index::FacilityIndex;

use thiserror::Error;

/// Column name for the nearest facility's index.
pub const COL_NEAREST_IDX: &str = "nearest_facility_idx";
/// Column name for the nearest-facility distance in meters.
pub const COL_DISTANCE_M: &str = "distance_to_facility_m";
/// Column name for the nearest-facility distance in kilometers.
pub const COL_DISTANCE_KM: &str = "distance_to_facility_km";

/// Errors raised during accessibility analysis.
#[derive(Debug, Error)]
pub enum AccessibilityError {
    /// Facilities and the sample grid are in different CRSs. Distances
    /// would be silently meaningless, so this fails fast instead.
    #[error("CRS mismatch: {left} vs {right}; reproject before analysis")]
    CrsMismatch {
        /// Facility layer CRS ("unset" when absent).
        left: String,
        /// Sample grid CRS ("unset" when absent).
        right: String,
    },

    /// An aggregate was requested over zero records.
    #[error("Empty dataset: {context}")]
    EmptyDataset {
        /// Which input was empty.
        context: &'static str,
    },

    /// Sample grid dimension of zero.
    #[error("Grid size must be at least 1")]
    InvalidGridSize,

    /// A required column is missing from the input layer.
    #[error("Missing column: {name}")]
    MissingColumn {
        /// The absent column name.
        name: String,
    },
}

impl AccessibilityError {
    pub(crate) fn crs_mismatch(
        left: Option<health_access_geo::Crs>,
        right: Option<health_access_geo::Crs>,
    ) -> Self {
        let describe = |crs: Option<health_access_geo::Crs>| {
            crs.map_or_else(|| "unset".to_string(), |c| c.to_string())
        };
        Self::CrsMismatch {
            left: describe(left),
            right: describe(right),
        }
    }
}
