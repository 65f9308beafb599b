#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Vector layer processing.
//!
//! Loads, filters, reprojects, and clips [`FeatureSet`] layers
//! (administrative boundaries, health facilities). Clipping requires the
//! caller to have already harmonized CRSs; it fails rather than silently
//! reprojecting, so CRS handling stays visible at the call site.

pub mod io;
pub mod processor;

pub use health_access_vector_models::{AttributeValue, Feature, FeatureSet};

use thiserror::Error;

/// Errors raised while processing vector layers.
#[derive(Debug, Error)]
pub enum VectorError {
    /// CRS lookup or coordinate transform failed.
    #[error("CRS error: {0}")]
    Crs(#[from] health_access_geo::CrsError),

    /// An operation required both layers to share a CRS.
    #[error("CRS mismatch: {left} vs {right}; reproject before this operation")]
    CrsMismatch {
        /// CRS of the layer being operated on ("unset" when absent).
        left: String,
        /// CRS of the other layer ("unset" when absent).
        right: String,
    },

    /// A geometry was invalid or unusable for the requested operation.
    #[error("Geometry error: {message}")]
    Geometry {
        /// Description of what went wrong.
        message: String,
    },

    /// GeoJSON parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VectorError {
    /// Builds a [`VectorError::CrsMismatch`] from two optional CRSs.
    #[must_use]
    pub fn crs_mismatch(
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
