//! Per-polygon aggregate statistics over a raster grid.
//!
//! The heart of the population stage: for each administrative zone
//! polygon, sum/mean/count the population raster cells it covers. One bad
//! geometry must not abort the batch or skew other zones, so per-record
//! failures are collected with their index and the record defaults to a
//! population of zero.

use std::sync::Arc;

use geo::{BoundingRect, Contains, Geometry, Intersects, MultiPolygon, Point};
use health_access_geo::progress::ProgressCallback;
use health_access_vector::processor;
use health_access_vector_models::{AttributeValue, Feature, FeatureSet};
use serde::{Deserialize, Serialize};

use crate::{RasterError, RasterGrid};

/// Which raster cells count as belonging to a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellInclusion {
    /// A cell belongs to the polygon when its center point is inside.
    #[default]
    #[serde(rename = "center")]
    CenterInside,
    /// A cell belongs to the polygon when any part of its footprint
    /// touches it.
    #[serde(rename = "all-touched")]
    AllTouched,
}

/// Tuning knobs for a zonal statistics pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZonalOptions {
    /// Cell inclusion policy.
    pub inclusion: CellInclusion,
    /// Overrides the raster's own nodata sentinel when set.
    pub nodata_override: Option<f64>,
}

/// A zone whose statistics could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonalFailure {
    /// Index of the record in the input zone layer.
    pub index: usize,
    /// Why extraction failed for this record.
    pub reason: String,
}

/// Result of a zonal statistics pass.
#[derive(Debug, Clone)]
pub struct ZonalStatistics {
    /// The input zones, order preserved, with `population_sum`,
    /// `population_mean`, and `population_count` columns appended.
    pub zones: FeatureSet,
    /// Records that failed extraction and were defaulted to zero.
    pub failures: Vec<ZonalFailure>,
}

/// Computes sum/mean/count of raster cells per zone polygon.
///
/// Zones are reprojected onto the raster's CRS first when they differ —
/// deliberately unlike [`processor::clip_to_bounds`], which refuses
/// mismatched CRSs, because the raster's grid cannot move.
///
/// A polygon overlapping no valid cell yields sum 0, a null mean, and
/// count 0. A record-level failure (missing or non-polygonal geometry) is
/// logged with its index, recorded in [`ZonalStatistics::failures`], and
/// defaulted the same way; the batch always continues.
///
/// # Errors
///
/// Returns [`RasterError`] only for systemic failures: the zone layer has
/// no CRS, or reprojecting the whole layer onto the raster fails.
pub fn zonal_statistics(
    zones: &FeatureSet,
    raster: &RasterGrid,
    options: &ZonalOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ZonalStatistics, RasterError> {
    if zones.crs().is_none() {
        return Err(health_access_geo::CrsError::MissingCrs.into());
    }
    let aligned = if zones.crs() == Some(raster.crs()) {
        zones.clone()
    } else {
        log::info!(
            "Zone layer CRS differs from raster ({}); reprojecting zones",
            raster.crs()
        );
        processor::reproject(zones, raster.crs())?
    };

    log::info!(
        "Extracting zonal statistics for {} zones ({} policy)",
        aligned.len(),
        match options.inclusion {
            CellInclusion::CenterInside => "center",
            CellInclusion::AllTouched => "all-touched",
        }
    );
    progress.set_total(aligned.len() as u64);

    let mut features = Vec::with_capacity(aligned.len());
    let mut failures = Vec::new();

    for (index, feature) in aligned.iter().enumerate() {
        let (sum, mean, count) = match polygonal(feature.geometry.as_ref()) {
            Ok(polygon) => aggregate(&polygon, raster, options),
            Err(reason) => {
                log::warn!("Failed to process geometry {index}: {reason}");
                failures.push(ZonalFailure { index, reason });
                (0.0, None, 0)
            }
        };

        let mut out = feature.clone();
        out.set_attribute("population_sum", sum);
        out.set_attribute(
            "population_mean",
            mean.map_or(AttributeValue::Null, AttributeValue::Float),
        );
        out.set_attribute("population_count", i64::try_from(count).unwrap_or(i64::MAX));
        features.push(out);
        progress.inc(1);
    }

    progress.finish(format!("Zonal statistics for {} zones", features.len()));
    if !failures.is_empty() {
        log::warn!(
            "{} of {} zones failed extraction and defaulted to 0",
            failures.len(),
            aligned.len()
        );
    }
    log::info!("Zonal extraction complete");

    Ok(ZonalStatistics {
        zones: FeatureSet::from_features(aligned.crs(), features),
        failures,
    })
}

/// Coerces a record's geometry into a multipolygon, or explains why not.
fn polygonal(geometry: Option<&Geometry<f64>>) -> Result<MultiPolygon<f64>, String> {
    match geometry {
        Some(Geometry::Polygon(p)) => Ok(MultiPolygon(vec![p.clone()])),
        Some(Geometry::MultiPolygon(mp)) => Ok(mp.clone()),
        Some(Geometry::Rect(r)) => Ok(MultiPolygon(vec![r.to_polygon()])),
        Some(Geometry::Triangle(t)) => Ok(MultiPolygon(vec![t.to_polygon()])),
        Some(other) => Err(format!(
            "geometry is not polygonal ({})",
            geometry_kind(other)
        )),
        None => Err("geometry is missing".to_string()),
    }
}

const fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Sum/mean/count of the valid cells a polygon covers.
#[allow(clippy::cast_precision_loss)]
fn aggregate(
    polygon: &MultiPolygon<f64>,
    raster: &RasterGrid,
    options: &ZonalOptions,
) -> (f64, Option<f64>, u64) {
    let Some(window) = polygon
        .bounding_rect()
        .and_then(|rect| raster.window_for(&rect))
    else {
        return (0.0, None, 0);
    };

    let (row_range, col_range) = window;
    let mut sum = 0.0;
    let mut count: u64 = 0;

    for row in row_range {
        for col in col_range.clone() {
            let Some(value) = raster.value(row, col) else {
                continue;
            };
            if raster.is_nodata(value, options.nodata_override) {
                continue;
            }
            let included = match options.inclusion {
                CellInclusion::CenterInside => {
                    polygon.contains(&Point(raster.cell_center(row, col)))
                }
                CellInclusion::AllTouched => {
                    polygon.intersects(&raster.cell_rect(row, col).to_polygon())
                }
            };
            if included {
                sum += value;
                count += 1;
            }
        }
    }

    if count == 0 {
        (0.0, None, 0)
    } else {
        (sum, Some(sum / count as f64), count)
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, polygon};
    use health_access_geo::progress::null_progress;
    use health_access_geo::Crs;
    use ndarray::Array2;

    use crate::GridTransform;

    use super::*;

    /// 4x4 grid of constant value 2.5 covering (0,0)..(4,4), UTM CRS.
    fn constant_raster() -> RasterGrid {
        RasterGrid::new(
            Array2::from_elem((4, 4), 2.5),
            GridTransform::north_up(0.0, 4.0, 1.0),
            Crs::epsg(32737),
            Some(-200.0),
        )
        .unwrap()
    }

    fn zone(poly: geo::Polygon<f64>) -> FeatureSet {
        FeatureSet::from_features(
            Some(Crs::epsg(32737)),
            vec![Feature::new(Some(Geometry::Polygon(poly)))],
        )
    }

    fn full_extent() -> geo::Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
        ]
    }

    #[test]
    fn constant_raster_sums_to_value_times_cells() {
        let raster = constant_raster();
        let result = zonal_statistics(
            &zone(full_extent()),
            &raster,
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();

        assert!(result.failures.is_empty());
        let feature = &result.zones.features()[0];
        assert_eq!(
            feature.attribute("population_sum").and_then(AttributeValue::as_f64),
            Some(2.5 * 16.0)
        );
        assert_eq!(
            feature.attribute("population_mean").and_then(AttributeValue::as_f64),
            Some(2.5)
        );
        assert_eq!(
            feature.attribute("population_count").and_then(AttributeValue::as_i64),
            Some(16)
        );
    }

    #[test]
    fn zero_overlap_polygon_defaults_to_zero() {
        let raster = constant_raster();
        let far_away = polygon![
            (x: 100.0, y: 100.0),
            (x: 101.0, y: 100.0),
            (x: 101.0, y: 101.0),
            (x: 100.0, y: 101.0),
        ];
        let result = zonal_statistics(
            &zone(far_away),
            &raster,
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();

        assert!(result.failures.is_empty());
        let feature = &result.zones.features()[0];
        assert_eq!(
            feature.attribute("population_sum").and_then(AttributeValue::as_f64),
            Some(0.0)
        );
        assert!(feature.attribute("population_mean").unwrap().is_null());
        assert_eq!(
            feature.attribute("population_count").and_then(AttributeValue::as_i64),
            Some(0)
        );
    }

    #[test]
    fn nodata_cells_are_excluded() {
        let mut data = Array2::from_elem((4, 4), 3.0);
        data[[0, 0]] = -200.0;
        data[[1, 1]] = f64::NAN;
        let raster = RasterGrid::new(
            data,
            GridTransform::north_up(0.0, 4.0, 1.0),
            Crs::epsg(32737),
            Some(-200.0),
        )
        .unwrap();

        let result = zonal_statistics(
            &zone(full_extent()),
            &raster,
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();

        let feature = &result.zones.features()[0];
        assert_eq!(
            feature.attribute("population_count").and_then(AttributeValue::as_i64),
            Some(14)
        );
        assert_eq!(
            feature.attribute("population_sum").and_then(AttributeValue::as_f64),
            Some(3.0 * 14.0)
        );
    }

    #[test]
    fn bad_geometry_is_collected_and_batch_continues() {
        let mut zones = zone(full_extent());
        zones.push(Feature::new(Some(Geometry::Point(geo::Point::new(
            1.0, 1.0,
        )))));
        zones.push(Feature::new(None));

        let result = zonal_statistics(
            &zones,
            &constant_raster(),
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();

        // Order preserved, one output row per input row.
        assert_eq!(result.zones.len(), 3);
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].index, 1);
        assert_eq!(result.failures[1].index, 2);
        // Failed records default to zero, valid record is untouched.
        for index in [1, 2] {
            assert_eq!(
                result.zones.features()[index]
                    .attribute("population_sum")
                    .and_then(AttributeValue::as_f64),
                Some(0.0)
            );
        }
        assert_eq!(
            result.zones.features()[0]
                .attribute("population_sum")
                .and_then(AttributeValue::as_f64),
            Some(2.5 * 16.0)
        );
    }

    #[test]
    fn all_touched_includes_edge_cells() {
        // A sliver along x in [0, 0.25]: no cell centers inside, but the
        // first column of cells is touched.
        let sliver = polygon![
            (x: 0.0, y: 0.0),
            (x: 0.25, y: 0.0),
            (x: 0.25, y: 4.0),
            (x: 0.0, y: 4.0),
        ];
        let raster = constant_raster();

        let center = zonal_statistics(
            &zone(sliver.clone()),
            &raster,
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();
        assert_eq!(
            center.zones.features()[0]
                .attribute("population_count")
                .and_then(AttributeValue::as_i64),
            Some(0)
        );

        let touched = zonal_statistics(
            &zone(sliver),
            &raster,
            &ZonalOptions {
                inclusion: CellInclusion::AllTouched,
                nodata_override: None,
            },
            &null_progress(),
        )
        .unwrap();
        assert_eq!(
            touched.zones.features()[0]
                .attribute("population_count")
                .and_then(AttributeValue::as_i64),
            Some(4)
        );
    }

    #[test]
    fn zones_are_reprojected_onto_raster_crs() {
        // Zones in WGS84 over Kenya, raster in UTM 37S covering the same
        // area: auto-reprojection must find the overlap.
        let wgs_zone = polygon![
            (x: 36.5, y: -1.5),
            (x: 37.0, y: -1.5),
            (x: 37.0, y: -1.0),
            (x: 36.5, y: -1.0),
        ];
        let zones = FeatureSet::from_features(
            Some(Crs::WGS84),
            vec![Feature::new(Some(Geometry::Polygon(wgs_zone)))],
        );

        // 10km cells spanning roughly the zone's projected extent.
        let raster = RasterGrid::new(
            Array2::from_elem((20, 20), 1.0),
            GridTransform::north_up(200_000.0, 9_900_000.0, 10_000.0),
            Crs::epsg(32737),
            None,
        )
        .unwrap();

        let result = zonal_statistics(
            &zones,
            &raster,
            &ZonalOptions::default(),
            &null_progress(),
        )
        .unwrap();

        assert_eq!(result.zones.crs(), Some(Crs::epsg(32737)));
        let count = result.zones.features()[0]
            .attribute("population_count")
            .and_then(AttributeValue::as_i64)
            .unwrap();
        assert!(count > 0, "expected overlapping cells, got {count}");
    }

    #[test]
    fn missing_layer_crs_is_systemic() {
        let mut zones = zone(full_extent());
        zones.set_crs(None);
        let result = zonal_statistics(
            &zones,
            &constant_raster(),
            &ZonalOptions::default(),
            &null_progress(),
        );
        assert!(matches!(result, Err(RasterError::Crs(_))));
    }
}
