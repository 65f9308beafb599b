//! Distance computation and threshold classification.

use geo::Geometry;
use health_access_vector_models::{AttributeValue, FeatureSet};

use crate::index::{FacilityIndex, representative_point};
use crate::{AccessibilityError, COL_DISTANCE_KM, COL_DISTANCE_M, COL_NEAREST_IDX};

/// Column name for a threshold classification flag, e.g. `within_5km`.
///
/// Whole-kilometer thresholds format without a decimal point so column
/// names stay stable across integer and float configuration values.
#[must_use]
pub fn threshold_column(threshold_km: f64) -> String {
    if threshold_km.fract() == 0.0 && threshold_km.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = threshold_km as i64;
        format!("within_{whole}km")
    } else {
        format!("within_{threshold_km}km")
    }
}

/// Appends nearest-facility columns to every record of the sample grid.
///
/// Distances are Euclidean in the shared CRS, so both layers must be in
/// a planar (meter) CRS for `distance_to_facility_m` to mean meters.
///
/// # Errors
///
/// Returns [`AccessibilityError::CrsMismatch`] when the layers' CRSs
/// differ or either is unset, and [`AccessibilityError::EmptyDataset`]
/// when the facility layer has no usable geometry.
pub fn calculate_distances(
    facilities: &FeatureSet,
    grid: &FeatureSet,
) -> Result<FeatureSet, AccessibilityError> {
    if facilities.crs().is_none() || facilities.crs() != grid.crs() {
        return Err(AccessibilityError::crs_mismatch(
            facilities.crs(),
            grid.crs(),
        ));
    }

    log::info!("Calculating distances to nearest facilities");
    let index = FacilityIndex::build(facilities)?;

    let mut out = grid.clone();
    for feature in out.iter_mut() {
        let Some(point) = feature.geometry.as_ref().and_then(representative_point) else {
            feature.set_attribute(COL_NEAREST_IDX, AttributeValue::Null);
            feature.set_attribute(COL_DISTANCE_M, AttributeValue::Null);
            feature.set_attribute(COL_DISTANCE_KM, AttributeValue::Null);
            continue;
        };
        let (nearest_idx, distance_m) = index.nearest(point);
        feature.set_attribute(COL_NEAREST_IDX, i64::try_from(nearest_idx).unwrap_or(i64::MAX));
        feature.set_attribute(COL_DISTANCE_M, distance_m);
        feature.set_attribute(COL_DISTANCE_KM, distance_m / 1000.0);
    }

    log::info!("Distance calculation complete");
    Ok(out)
}

/// Adds one `within_<t>km` boolean column per threshold.
///
/// Thresholds are applied in ascending order and independently: a point
/// within 5 km is also within 10 km when both are configured.
///
/// # Errors
///
/// Returns [`AccessibilityError::MissingColumn`] when a record lacks the
/// distance column (run [`calculate_distances`] first).
pub fn classify_accessibility(
    grid: &FeatureSet,
    thresholds_km: &[f64],
) -> Result<FeatureSet, AccessibilityError> {
    let mut thresholds = thresholds_km.to_vec();
    thresholds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    log::info!("Classifying accessibility with thresholds: {thresholds:?}");

    let mut out = grid.clone();
    for feature in out.iter_mut() {
        let distance_km = match feature.attribute(COL_DISTANCE_KM) {
            Some(value) if value.is_null() => None,
            Some(value) => Some(value.as_f64().ok_or_else(|| {
                AccessibilityError::MissingColumn {
                    name: COL_DISTANCE_KM.to_string(),
                }
            })?),
            None => {
                return Err(AccessibilityError::MissingColumn {
                    name: COL_DISTANCE_KM.to_string(),
                });
            }
        };
        for &threshold in &thresholds {
            let column = threshold_column(threshold);
            match distance_km {
                Some(d) => feature.set_attribute(&column, d <= threshold),
                None => feature.set_attribute(&column, AttributeValue::Null),
            }
        }
    }
    Ok(out)
}

/// Full accessibility analysis: distances then classification.
///
/// # Errors
///
/// Propagates errors from [`calculate_distances`] and
/// [`classify_accessibility`].
pub fn analyze(
    facilities: &FeatureSet,
    grid: &FeatureSet,
    thresholds_km: &[f64],
) -> Result<FeatureSet, AccessibilityError> {
    let with_distances = calculate_distances(facilities, grid)?;
    classify_accessibility(&with_distances, thresholds_km)
}
