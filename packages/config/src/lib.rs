#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration.
//!
//! Loaded from a TOML file; every field has a default so a missing file
//! or a sparse one still yields a runnable configuration. Defaults target
//! Kenya (UTM zone 37S, thresholds 5/10/15/20 km).

use std::path::Path;

use health_access_geo::Crs;
use health_access_raster::CellInclusion;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Country name used in logs and artifact labels.
    pub country: String,
    /// ISO 3166-1 alpha-3 code matched against the boundary layer.
    pub country_code: String,
    /// ISO 3166-1 alpha-2 code used by the facility API.
    pub iso_code_3166: String,
    /// Directory for downloaded input data.
    pub data_dir: String,
    /// Directory for pipeline artifacts.
    pub output_dir: String,
    /// Target planar CRS (EPSG) for all distance computation.
    pub crs_planar: u16,
    /// Geographic CRS (EPSG) assumed for unreferenced inputs.
    pub crs_geographic: u16,
    /// Which data sources to download.
    pub download: DownloadConfig,
    /// Vector cleaning behavior.
    pub processing: ProcessingConfig,
    /// Accessibility analysis parameters.
    pub analysis: AnalysisConfig,
}

/// Which data acquisition steps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Download administrative boundaries.
    pub boundaries: bool,
    /// Download health facilities.
    pub facilities: bool,
    /// Whether a population raster is expected (downloaded manually).
    pub population: bool,
}

/// Vector layer cleaning options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Drop features with null/empty geometry after loading.
    pub remove_empty_geometry: bool,
    /// Restrict facilities to the types in `facility_types`.
    pub filter_by_type: bool,
    /// Facility `amenity` values kept when `filter_by_type` is on.
    pub facility_types: Vec<String>,
}

/// Accessibility analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Distance thresholds in kilometers.
    pub accessibility_threshold_km: Vec<f64>,
    /// Sample grid dimension (produces `grid_size`^2 points).
    pub grid_size: usize,
    /// Zonal statistics cell inclusion policy.
    pub cell_inclusion: CellInclusion,
    /// Overrides the population raster's nodata sentinel when set.
    pub nodata_override: Option<f64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            country: "Kenya".to_string(),
            country_code: "KEN".to_string(),
            iso_code_3166: "KE".to_string(),
            data_dir: "Kenya".to_string(),
            output_dir: "Kenya/Output".to_string(),
            crs_planar: 32737, // UTM 37S
            crs_geographic: 4326,
            download: DownloadConfig::default(),
            processing: ProcessingConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            boundaries: true,
            facilities: true,
            // Population rasters require a manual download.
            population: false,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            remove_empty_geometry: true,
            filter_by_type: false,
            facility_types: Vec::new(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            accessibility_threshold_km: vec![5.0, 10.0, 15.0, 20.0],
            grid_size: 20,
            cell_inclusion: CellInclusion::default(),
            nodata_override: Some(-200.0),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Config file {} not found; using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// The planar analysis CRS.
    #[must_use]
    pub const fn planar_crs(&self) -> Crs {
        Crs::epsg(self.crs_planar)
    }

    /// The geographic CRS assumed for unreferenced inputs.
    #[must_use]
    pub const fn geographic_crs(&self) -> Crs {
        Crs::epsg(self.crs_geographic)
    }
}

/// Renders a configuration as TOML, defaults included.
///
/// # Errors
///
/// Returns `toml::ser::Error` when serialization fails.
pub fn to_toml_string(config: &AppConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
