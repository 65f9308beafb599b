//! Feature set operations: reproject, filter, clean, clip.

use geo::{BooleanOps, CoordsIter, Geometry, Intersects, MultiPolygon, unary_union};
use health_access_geo::{Crs, Reprojector};
use health_access_vector_models::{AttributeValue, Feature, FeatureSet};

use crate::VectorError;

/// Reprojects every geometry of `set` into `target`, returning a new set.
///
/// A set with no CRS is assumed to be geographic WGS84 before
/// transforming, matching the convention of the upstream data sources.
///
/// # Errors
///
/// Returns [`VectorError::Crs`] if the target CRS is unknown or any
/// geometry fails to transform (degenerate input).
pub fn reproject(set: &FeatureSet, target: Crs) -> Result<FeatureSet, VectorError> {
    let source = set.crs().unwrap_or_else(|| {
        log::info!("Layer has no CRS; assuming {}", Crs::WGS84);
        Crs::WGS84
    });
    log::info!("Reprojecting {} features to {target}", set.len());

    let reprojector = Reprojector::new(source, target)?;
    let mut features = Vec::with_capacity(set.len());
    for feature in set {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|g| reprojector.transform_geometry(g))
            .transpose()?;
        features.push(Feature {
            geometry,
            attributes: feature.attributes.clone(),
        });
    }

    Ok(FeatureSet::from_features(Some(target), features))
}

/// Returns the subset of `set` whose `column` attribute equals `value`.
///
/// No matches yields an empty set, never an error.
#[must_use]
pub fn filter_by_attribute(set: &FeatureSet, column: &str, value: &AttributeValue) -> FeatureSet {
    let features: Vec<Feature> = set
        .iter()
        .filter(|f| f.attribute(column) == Some(value))
        .cloned()
        .collect();
    log::info!(
        "Filtered {} -> {} features on {column}",
        set.len(),
        features.len()
    );
    FeatureSet::from_features(set.crs(), features)
}

/// Drops features whose geometry is absent or has no coordinates.
#[must_use]
pub fn remove_empty_geometry(set: &FeatureSet) -> FeatureSet {
    let before = set.len();
    let features: Vec<Feature> = set
        .iter()
        .filter(|f| {
            f.geometry
                .as_ref()
                .is_some_and(|g| g.coords_count() > 0)
        })
        .cloned()
        .collect();
    log::info!(
        "Removed {} features with empty geometry",
        before - features.len()
    );
    FeatureSet::from_features(set.crs(), features)
}

/// Clips `set` to the union of the polygons in `boundary`.
///
/// Features fully outside the boundary are dropped; polygons and lines
/// straddling it are truncated to the intersection. Does *not*
/// auto-reproject: the caller must harmonize CRSs first.
///
/// # Errors
///
/// Returns [`VectorError::CrsMismatch`] if the two layers' CRSs differ
/// (or either is unset), and [`VectorError::Geometry`] if the boundary
/// contains no polygonal geometry to clip against.
pub fn clip_to_bounds(set: &FeatureSet, boundary: &FeatureSet) -> Result<FeatureSet, VectorError> {
    if set.crs().is_none() || set.crs() != boundary.crs() {
        return Err(VectorError::crs_mismatch(set.crs(), boundary.crs()));
    }

    let mask = boundary_union(boundary)?;
    log::info!("Clipping {} features to boundary", set.len());

    let mut features = Vec::new();
    for feature in set {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        let Some(clipped) = clip_geometry(geometry, &mask) else {
            continue;
        };
        features.push(Feature {
            geometry: Some(clipped),
            attributes: feature.attributes.clone(),
        });
    }

    log::info!("Retained {} features after clipping", features.len());
    Ok(FeatureSet::from_features(set.crs(), features))
}

/// Dissolves all polygonal geometry in `boundary` into one multipolygon.
///
/// # Errors
///
/// Returns [`VectorError::Geometry`] if no polygons are present.
pub fn boundary_union(boundary: &FeatureSet) -> Result<MultiPolygon<f64>, VectorError> {
    let polygons: Vec<MultiPolygon<f64>> = boundary
        .iter()
        .filter_map(|f| match &f.geometry {
            Some(Geometry::Polygon(p)) => Some(MultiPolygon(vec![p.clone()])),
            Some(Geometry::MultiPolygon(mp)) => Some(mp.clone()),
            _ => None,
        })
        .collect();

    if polygons.is_empty() {
        return Err(VectorError::Geometry {
            message: "boundary layer contains no polygonal geometry".to_string(),
        });
    }

    Ok(unary_union(polygons.iter()))
}

/// Intersects a single geometry with the boundary mask.
///
/// Returns `None` when the geometry falls entirely outside the mask.
fn clip_geometry(geometry: &Geometry<f64>, mask: &MultiPolygon<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => mask.intersects(p).then(|| geometry.clone()),
        Geometry::MultiPoint(mp) => {
            let kept: Vec<_> = mp.iter().filter(|p| mask.intersects(*p)).copied().collect();
            (!kept.is_empty()).then(|| Geometry::MultiPoint(kept.into()))
        }
        Geometry::Polygon(p) => {
            let cut = mask.intersection(p);
            (!cut.0.is_empty()).then(|| Geometry::MultiPolygon(cut))
        }
        Geometry::MultiPolygon(mp) => {
            let cut = mask.intersection(mp);
            (!cut.0.is_empty()).then(|| Geometry::MultiPolygon(cut))
        }
        Geometry::LineString(ls) => {
            let cut = mask.clip(&geo::MultiLineString(vec![ls.clone()]), false);
            (!cut.0.is_empty()).then(|| Geometry::MultiLineString(cut))
        }
        Geometry::MultiLineString(mls) => {
            let cut = mask.clip(mls, false);
            (!cut.0.is_empty()).then(|| Geometry::MultiLineString(cut))
        }
        // Remaining kinds are kept whole when they touch the mask.
        other => mask.intersects(other).then(|| other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use geo::{Point, polygon};
    use health_access_geo::Crs;

    use super::*;

    fn wgs84_points(coords: &[(f64, f64)]) -> FeatureSet {
        let features = coords
            .iter()
            .map(|&(x, y)| Feature::new(Some(Geometry::Point(Point::new(x, y)))))
            .collect();
        FeatureSet::from_features(Some(Crs::WGS84), features)
    }

    fn unit_boundary(crs: Option<Crs>) -> FeatureSet {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ];
        FeatureSet::from_features(crs, vec![Feature::new(Some(Geometry::Polygon(square)))])
    }

    #[test]
    fn reproject_assigns_default_crs_when_unset() {
        let mut set = wgs84_points(&[(36.8, -1.3)]);
        set.set_crs(None);
        let projected = reproject(&set, Crs::epsg(32737)).unwrap();
        assert_eq!(projected.crs(), Some(Crs::epsg(32737)));
        assert_eq!(projected.len(), 1);
    }

    #[test]
    fn reproject_preserves_cardinality_and_attributes() {
        let mut set = FeatureSet::new(Some(Crs::WGS84));
        set.push(
            Feature::new(Some(Geometry::Point(Point::new(36.8, -1.3))))
                .with_attribute("name", "clinic"),
        );
        set.push(Feature::new(None));

        let projected = reproject(&set, Crs::epsg(3857)).unwrap();
        assert_eq!(projected.len(), 2);
        assert_eq!(
            projected.features()[0]
                .attribute("name")
                .and_then(AttributeValue::as_str),
            Some("clinic")
        );
        assert!(projected.features()[1].geometry.is_none());
    }

    #[test]
    fn filter_by_attribute_returns_empty_on_no_match() {
        let mut set = wgs84_points(&[(0.0, 0.0)]);
        set.iter_mut()
            .for_each(|f| f.set_attribute("ADM0_A3", "KEN"));
        let filtered = filter_by_attribute(&set, "ADM0_A3", &AttributeValue::from("TZA"));
        assert!(filtered.is_empty());
    }

    #[test]
    fn filter_by_attribute_keeps_matches() {
        let mut set = wgs84_points(&[(0.0, 0.0), (1.0, 1.0)]);
        let mut iter = set.iter_mut();
        iter.next().unwrap().set_attribute("ADM0_A3", "KEN");
        iter.next().unwrap().set_attribute("ADM0_A3", "TZA");
        let filtered = filter_by_attribute(&set, "ADM0_A3", &AttributeValue::from("KEN"));
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn remove_empty_geometry_drops_null_and_empty() {
        let mut set = wgs84_points(&[(1.0, 1.0)]);
        set.push(Feature::new(None));
        set.push(Feature::new(Some(Geometry::MultiPoint(geo::MultiPoint(
            vec![],
        )))));
        let cleaned = remove_empty_geometry(&set);
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn clip_requires_matching_crs() {
        let set = wgs84_points(&[(5.0, 5.0)]);
        let boundary = unit_boundary(Some(Crs::epsg(32737)));
        let result = clip_to_bounds(&set, &boundary);
        assert!(matches!(result, Err(VectorError::CrsMismatch { .. })));
    }

    #[test]
    fn clip_drops_outside_points_and_keeps_inside() {
        let set = wgs84_points(&[(5.0, 5.0), (20.0, 20.0), (0.0, 0.0)]);
        let boundary = unit_boundary(Some(Crs::WGS84));
        let clipped = clip_to_bounds(&set, &boundary).unwrap();
        // Corner point sits on the boundary edge and is retained.
        assert_eq!(clipped.len(), 2);
    }

    #[test]
    fn clip_truncates_straddling_polygon() {
        let straddling = polygon![
            (x: 5.0, y: 5.0),
            (x: 15.0, y: 5.0),
            (x: 15.0, y: 8.0),
            (x: 5.0, y: 8.0),
        ];
        let set = FeatureSet::from_features(
            Some(Crs::WGS84),
            vec![Feature::new(Some(Geometry::Polygon(straddling)))],
        );
        let boundary = unit_boundary(Some(Crs::WGS84));
        let clipped = clip_to_bounds(&set, &boundary).unwrap();
        assert_eq!(clipped.len(), 1);

        use geo::Area;
        let Some(Geometry::MultiPolygon(mp)) = &clipped.features()[0].geometry else {
            panic!("expected multipolygon after clip");
        };
        // 5x3 strip inside the boundary remains of the original 10x3.
        assert!((mp.unsigned_area() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn clip_errors_on_nonpolygonal_boundary() {
        let set = wgs84_points(&[(5.0, 5.0)]);
        let boundary = wgs84_points(&[(0.0, 0.0)]);
        let result = clip_to_bounds(&set, &boundary);
        assert!(matches!(result, Err(VectorError::Geometry { .. })));
    }
}
