#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Summary statistics over accessibility analysis results.
//!
//! Reduces a classified accessibility grid to scalar distribution
//! descriptors and per-threshold coverage, producing the statistics
//! record consumed by downstream reporting.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use health_access_accessibility::{COL_DISTANCE_KM, threshold_column};
use health_access_vector_models::{AttributeValue, FeatureSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while aggregating statistics.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// An aggregate statistic was requested over zero records.
    #[error("Empty dataset: {context}")]
    EmptyDataset {
        /// Which input was empty.
        context: &'static str,
    },

    /// A record lacks a column the aggregation needs.
    #[error("Missing column: {name}")]
    MissingColumn {
        /// The absent column name.
        name: String,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Distribution descriptors over `distance_to_facility_km`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceStatistics {
    /// Arithmetic mean distance.
    pub mean_km: f64,
    /// Median distance (midpoint average for even counts).
    pub median_km: f64,
    /// Sample standard deviation (N-1 denominator); `null` for a single
    /// record, where it is undefined.
    pub std_km: Option<f64>,
    /// Smallest distance.
    pub min_km: f64,
    /// Largest distance.
    pub max_km: f64,
}

/// Coverage of one accessibility threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCoverage {
    /// Number of grid points within the threshold.
    pub count: u64,
    /// Share of all grid points within the threshold, in percent.
    pub percentage: f64,
}

/// The complete statistics record for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of health facilities analyzed.
    pub total_facilities: u64,
    /// Distribution of nearest-facility distances.
    pub distance_statistics: DistanceStatistics,
    /// Coverage keyed by threshold label (e.g. `"5km"`).
    pub accessibility_by_threshold: BTreeMap<String, ThresholdCoverage>,
}

/// Threshold label used as a key in the statistics record, e.g. `"5km"`.
#[must_use]
pub fn threshold_key(threshold_km: f64) -> String {
    // Reuse the column naming so keys and columns always agree.
    threshold_column(threshold_km)
        .trim_start_matches("within_")
        .to_string()
}

/// Computes the summary statistics record.
///
/// # Errors
///
/// Returns [`AnalyticsError::EmptyDataset`] for an empty accessibility
/// set (an explicit failure instead of a divide-by-zero) and
/// [`AnalyticsError::MissingColumn`] when the distance column is absent.
pub fn calculate_stats(
    facilities: &FeatureSet,
    accessibility: &FeatureSet,
    thresholds_km: &[f64],
) -> Result<SummaryStatistics, AnalyticsError> {
    if accessibility.is_empty() {
        return Err(AnalyticsError::EmptyDataset {
            context: "accessibility grid has no records",
        });
    }

    log::info!("Calculating summary statistics");

    let mut distances = Vec::with_capacity(accessibility.len());
    for feature in accessibility {
        let value = feature
            .attribute(COL_DISTANCE_KM)
            .and_then(AttributeValue::as_f64)
            .ok_or_else(|| AnalyticsError::MissingColumn {
                name: COL_DISTANCE_KM.to_string(),
            })?;
        distances.push(value);
    }

    let total = accessibility.len() as u64;
    let mut accessibility_by_threshold = BTreeMap::new();
    for &threshold in thresholds_km {
        let column = threshold_column(threshold);
        let count = accessibility
            .iter()
            .filter(|f| {
                f.attribute(&column)
                    .and_then(AttributeValue::as_bool)
                    .unwrap_or(false)
            })
            .count() as u64;
        #[allow(clippy::cast_precision_loss)]
        let percentage = (count as f64 / total as f64) * 100.0;
        accessibility_by_threshold
            .insert(threshold_key(threshold), ThresholdCoverage { count, percentage });
    }

    let stats = SummaryStatistics {
        total_facilities: facilities.len() as u64,
        distance_statistics: describe(&distances),
        accessibility_by_threshold,
    };

    log::info!("Statistics calculated");
    Ok(stats)
}

/// Serializes the statistics record as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`AnalyticsError`] on serialization or I/O failure.
pub fn save_stats(stats: &SummaryStatistics, path: &Path) -> Result<(), AnalyticsError> {
    log::info!("Saving statistics to {}", path.display());
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, stats)?;
    Ok(())
}

/// Distribution descriptors over a non-empty slice.
#[allow(clippy::cast_precision_loss)]
fn describe(values: &[f64]) -> DistanceStatistics {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        f64::midpoint(sorted[mid - 1], sorted[mid])
    } else {
        sorted[mid]
    };

    let std = if values.len() > 1 {
        let ss = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        Some((ss / (n - 1.0)).sqrt())
    } else {
        None
    };

    DistanceStatistics {
        mean_km: mean,
        median_km: median,
        std_km: std,
        min_km: sorted[0],
        max_km: sorted[sorted.len() - 1],
    }
}

#[cfg(test)]
mod tests {
    use geo::{Geometry, Point};
    use health_access_vector_models::Feature;

    use super::*;

    fn grid_with_distances(distances: &[f64], thresholds: &[f64]) -> FeatureSet {
        let features = distances
            .iter()
            .map(|&d| {
                let mut f = Feature::new(Some(Geometry::Point(Point::new(0.0, 0.0))));
                f.set_attribute(COL_DISTANCE_KM, d);
                for &t in thresholds {
                    f.set_attribute(&threshold_column(t), d <= t);
                }
                f
            })
            .collect();
        FeatureSet::from_features(None, features)
    }

    fn facilities(n: usize) -> FeatureSet {
        let features = (0..n)
            .map(|_| Feature::new(Some(Geometry::Point(Point::new(0.0, 0.0)))))
            .collect();
        FeatureSet::from_features(None, features)
    }

    #[test]
    fn empty_accessibility_set_fails_explicitly() {
        let result = calculate_stats(&facilities(1), &FeatureSet::new(None), &[5.0]);
        assert!(matches!(result, Err(AnalyticsError::EmptyDataset { .. })));
    }

    #[test]
    fn distribution_descriptors_match_hand_computation() {
        let grid = grid_with_distances(&[2.0, 4.0, 6.0, 8.0], &[]);
        let stats = calculate_stats(&facilities(3), &grid, &[]).unwrap();

        assert_eq!(stats.total_facilities, 3);
        let d = &stats.distance_statistics;
        assert!((d.mean_km - 5.0).abs() < 1e-12);
        assert!((d.median_km - 5.0).abs() < 1e-12);
        assert_eq!(d.min_km, 2.0);
        assert_eq!(d.max_km, 8.0);
        // Sample std of [2, 4, 6, 8]: sqrt(20/3).
        let expected = (20.0_f64 / 3.0).sqrt();
        assert!((d.std_km.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn single_record_std_is_null() {
        let grid = grid_with_distances(&[3.0], &[]);
        let stats = calculate_stats(&facilities(1), &grid, &[]).unwrap();
        assert!(stats.distance_statistics.std_km.is_none());
        assert_eq!(
            serde_json::to_value(&stats.distance_statistics).unwrap()["std_km"],
            serde_json::Value::Null
        );
    }

    #[test]
    fn threshold_coverage_counts_and_percentages() {
        let thresholds = [5.0, 10.0];
        let grid = grid_with_distances(&[1.0, 6.0, 20.0, 3.0], &thresholds);
        let stats = calculate_stats(&facilities(2), &grid, &thresholds).unwrap();

        let within_5 = &stats.accessibility_by_threshold["5km"];
        assert_eq!(within_5.count, 2);
        assert!((within_5.percentage - 50.0).abs() < 1e-12);

        let within_10 = &stats.accessibility_by_threshold["10km"];
        assert_eq!(within_10.count, 3);
        assert!((within_10.percentage - 75.0).abs() < 1e-12);
    }

    #[test]
    fn output_contract_key_shape() {
        let thresholds = [5.0];
        let grid = grid_with_distances(&[1.0, 2.0], &thresholds);
        let stats = calculate_stats(&facilities(1), &grid, &thresholds).unwrap();
        let json = serde_json::to_value(&stats).unwrap();

        assert!(json["total_facilities"].is_u64());
        assert!(json["distance_statistics"]["mean_km"].is_number());
        assert!(json["distance_statistics"]["median_km"].is_number());
        assert!(json["accessibility_by_threshold"]["5km"]["count"].is_u64());
        assert!(json["accessibility_by_threshold"]["5km"]["percentage"].is_number());
    }
}
