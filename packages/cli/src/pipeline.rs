//! Full pipeline orchestrator for the health access toolchain.
//!
//! Chains fetch -> boundary processing -> facility processing -> zonal
//! population -> accessibility -> summary statistics. Each stage writes
//! its artifact before the next one starts, so a failed run leaves every
//! completed stage on disk.

use std::path::{Path, PathBuf};
use std::time::Instant;

use health_access_accessibility::{analyze, create_sample_grid};
use health_access_analytics::{calculate_stats, save_stats};
use health_access_cli_utils::{IndicatifProgress, MultiProgress};
use health_access_config::AppConfig;
use health_access_fetch::csv_loader::{self, CoordinateColumns};
use health_access_fetch::{boundaries, facilities};
use health_access_raster::zonal::ZonalOptions;
use health_access_raster::{read_ascii_grid, zonal_statistics};
use health_access_vector::{AttributeValue, FeatureSet, io, processor};

/// Boundary layer column carrying the ISO 3166-1 alpha-3 country code.
const COUNTRY_CODE_COLUMN: &str = "ADM0_A3";

/// Facility column carrying the facility type.
const FACILITY_TYPE_COLUMN: &str = "amenity";

/// Options from the command line that override or extend the config.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Overrides the configured output directory.
    pub output_dir: Option<PathBuf>,
    /// Skips all downloads; inputs must already be on disk.
    pub skip_download: bool,
    /// Loads facilities from a local CSV instead of the facility API.
    pub facilities_csv: Option<PathBuf>,
    /// Population raster (ESRI ASCII grid) for the zonal stage.
    pub population: Option<PathBuf>,
}

/// Paths of the fetched (or pre-existing) input datasets.
pub struct InputPaths {
    pub boundaries: PathBuf,
    pub facilities: PathBuf,
}

/// Downloads the configured input datasets into the data directory.
///
/// Datasets disabled in the config (or supplied via `facilities_csv`)
/// are not downloaded; their paths still point into the data directory
/// so a manually placed file is picked up.
///
/// # Errors
///
/// Returns an error when a download or extraction fails.
#[allow(clippy::future_not_send)]
pub async fn fetch_inputs(
    config: &AppConfig,
    facilities_csv: Option<&Path>,
) -> Result<InputPaths, Box<dyn std::error::Error>> {
    let data_dir = Path::new(&config.data_dir);
    let client = reqwest::Client::new();

    let boundaries_path = if config.download.boundaries {
        boundaries::download_boundaries(&client, data_dir).await?
    } else {
        data_dir.join("admin_boundaries.geojson")
    };

    let facilities_path = if facilities_csv.is_none() && config.download.facilities {
        facilities::download_facilities(&client, data_dir, &config.iso_code_3166).await?
    } else {
        data_dir.join("facilities.geojson")
    };

    Ok(InputPaths {
        boundaries: boundaries_path,
        facilities: facilities_path,
    })
}

/// Runs the full pipeline.
///
/// The `multi` parameter is the shared [`MultiProgress`] that is also
/// registered with the log bridge, so all `log::info!` output is
/// automatically suspended while progress bars redraw.
///
/// # Errors
///
/// Returns an error when a stage fails. Artifacts of stages that already
/// completed remain in the output directory.
#[allow(clippy::too_many_lines, clippy::future_not_send)]
pub async fn run(
    multi: &MultiProgress,
    config: &AppConfig,
    options: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline_start = Instant::now();

    let output_dir = options
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_dir));
    std::fs::create_dir_all(&output_dir)?;

    let population_path = resolve_population_path(config, options);

    let total_steps =
        4 + u64::from(!options.skip_download) + u64::from(population_path.is_some());
    let mut current_step = 0u64;

    let stage_bar = IndicatifProgress::steps_bar(
        multi,
        &format!("{} accessibility pipeline", config.country),
        total_steps,
    );

    // --- Fetch ---
    let paths = if options.skip_download {
        log::info!("Skipping downloads; using existing files in {}", config.data_dir);
        let data_dir = Path::new(&config.data_dir);
        InputPaths {
            boundaries: data_dir.join("admin_boundaries.geojson"),
            facilities: data_dir.join("facilities.geojson"),
        }
    } else {
        current_step += 1;
        stage_bar.set_message(format!("[{current_step}/{total_steps}] Fetching inputs"));
        let paths = fetch_inputs(config, options.facilities_csv.as_deref()).await?;
        stage_bar.inc(1);
        paths
    };

    // --- Boundaries ---
    current_step += 1;
    stage_bar.set_message(format!(
        "[{current_step}/{total_steps}] Processing boundaries"
    ));

    let raw = io::read_geojson(&paths.boundaries)?;
    let country_value = AttributeValue::from(config.country_code.as_str());
    let country = processor::filter_by_attribute(&raw, COUNTRY_CODE_COLUMN, &country_value);
    if country.is_empty() {
        return Err(format!(
            "no boundary features match {COUNTRY_CODE_COLUMN} = {}",
            config.country_code
        )
        .into());
    }
    log::info!(
        "{} of {} boundary features belong to {}",
        country.len(),
        raw.len(),
        config.country
    );

    let country = if config.processing.remove_empty_geometry {
        processor::remove_empty_geometry(&country)
    } else {
        country
    };
    let boundary_set = processor::reproject(&country, config.planar_crs())?;
    io::write_geojson(&boundary_set, &output_dir.join("boundaries.geojson"))?;
    stage_bar.inc(1);

    // --- Facilities ---
    current_step += 1;
    stage_bar.set_message(format!(
        "[{current_step}/{total_steps}] Processing facilities"
    ));

    let raw = if let Some(csv_path) = &options.facilities_csv {
        csv_loader::load_facility_csv(csv_path, &CoordinateColumns::default())?
    } else {
        io::read_geojson(&paths.facilities)?
    };

    let raw = if config.processing.filter_by_type {
        filter_facility_types(&raw, &config.processing.facility_types)
    } else {
        raw
    };

    let raw = if config.processing.remove_empty_geometry {
        processor::remove_empty_geometry(&raw)
    } else {
        raw
    };

    let projected = processor::reproject(&raw, config.planar_crs())?;
    let facility_set = processor::clip_to_bounds(&projected, &boundary_set)?;
    if facility_set.is_empty() {
        log::warn!("No facilities remain after clipping to the boundary");
    } else {
        log::info!(
            "{} of {} facilities fall within the boundary",
            facility_set.len(),
            projected.len()
        );
    }
    io::write_geojson(&facility_set, &output_dir.join("facilities_processed.geojson"))?;
    stage_bar.inc(1);

    // --- Zonal population ---
    if let Some(pop_path) = population_path {
        current_step += 1;
        stage_bar.set_message(format!(
            "[{current_step}/{total_steps}] Zonal population statistics"
        ));

        let raster = read_ascii_grid(&pop_path, config.geographic_crs())?;
        let zonal_options = ZonalOptions {
            inclusion: config.analysis.cell_inclusion,
            nodata_override: config.analysis.nodata_override,
        };

        let zone_bar = IndicatifProgress::records_bar(multi, "Zones");
        let result = zonal_statistics(&boundary_set, &raster, &zonal_options, &zone_bar);
        zone_bar.finish_and_clear();
        let result = result?;

        if !result.failures.is_empty() {
            log::warn!(
                "{} zone(s) could not be aggregated and received default statistics",
                result.failures.len()
            );
        }
        io::write_geojson(&result.zones, &output_dir.join("population_zones.geojson"))?;
        stage_bar.inc(1);
    } else {
        log::info!("No population raster found; skipping zonal statistics");
    }

    // --- Accessibility ---
    current_step += 1;
    stage_bar.set_message(format!(
        "[{current_step}/{total_steps}] Accessibility analysis"
    ));

    let grid = create_sample_grid(&boundary_set, config.analysis.grid_size)?;
    let accessibility = analyze(
        &facility_set,
        &grid,
        &config.analysis.accessibility_threshold_km,
    )?;
    io::write_geojson(&accessibility, &output_dir.join("accessibility_grid.geojson"))?;
    stage_bar.inc(1);

    // --- Summary statistics ---
    current_step += 1;
    stage_bar.set_message(format!(
        "[{current_step}/{total_steps}] Summary statistics"
    ));

    let stats = calculate_stats(
        &facility_set,
        &accessibility,
        &config.analysis.accessibility_threshold_km,
    )?;
    save_stats(&stats, &output_dir.join("statistics.json"))?;
    log::info!(
        "{} facilities; mean distance to nearest facility {:.2} km",
        stats.total_facilities,
        stats.distance_statistics.mean_km
    );
    stage_bar.inc(1);

    let elapsed = pipeline_start.elapsed();
    stage_bar.finish(format!(
        "Pipeline complete in {:.1}s; artifacts in {}",
        elapsed.as_secs_f64(),
        output_dir.display()
    ));

    Ok(())
}

/// Resolves the population raster path: CLI flag first, then the
/// conventional location in the data directory when the config expects
/// a population raster.
fn resolve_population_path(config: &AppConfig, options: &RunOptions) -> Option<PathBuf> {
    if let Some(path) = &options.population {
        return Some(path.clone());
    }
    if !config.download.population {
        return None;
    }
    let candidate = Path::new(&config.data_dir).join("population.asc");
    if candidate.exists() {
        Some(candidate)
    } else {
        log::warn!(
            "Population raster expected at {} but not found",
            candidate.display()
        );
        None
    }
}

/// Keeps facilities whose type column matches any of the configured
/// types, preserving record order.
fn filter_facility_types(set: &FeatureSet, types: &[String]) -> FeatureSet {
    let mut out = FeatureSet::new(set.crs());
    for feature in set {
        let keep = feature
            .attribute(FACILITY_TYPE_COLUMN)
            .and_then(AttributeValue::as_str)
            .is_some_and(|value| types.iter().any(|t| t == value));
        if keep {
            out.push(feature.clone());
        }
    }
    log::info!(
        "{} of {} facilities match the configured facility types",
        out.len(),
        set.len()
    );
    out
}
