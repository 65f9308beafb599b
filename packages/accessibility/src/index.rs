//! R-tree index over facility locations.

use geo::{Centroid, Geometry, Point};
use health_access_vector_models::FeatureSet;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::AccessibilityError;

/// A facility's representative location stored in the R-tree with its
/// original record index.
#[derive(Debug, Clone)]
struct FacilityEntry {
    index: usize,
    position: [f64; 2],
}

impl RTreeObject for FacilityEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for FacilityEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx.mul_add(dx, dy * dy)
    }
}

/// Pre-built spatial index over a facility layer.
///
/// Point facilities index their own coordinates; other geometry types
/// fall back to their centroid. Build once per analysis run and query per
/// grid point.
pub struct FacilityIndex {
    tree: RTree<FacilityEntry>,
    len: usize,
}

impl FacilityIndex {
    /// Builds the index from a facility layer.
    ///
    /// # Errors
    ///
    /// Returns [`AccessibilityError::EmptyDataset`] when no facility has
    /// usable geometry.
    pub fn build(facilities: &FeatureSet) -> Result<Self, AccessibilityError> {
        let entries: Vec<FacilityEntry> = facilities
            .iter()
            .enumerate()
            .filter_map(|(index, feature)| {
                let point = feature.geometry.as_ref().and_then(representative_point)?;
                Some(FacilityEntry {
                    index,
                    position: [point.x(), point.y()],
                })
            })
            .collect();

        if entries.is_empty() {
            return Err(AccessibilityError::EmptyDataset {
                context: "facility layer has no usable geometry",
            });
        }

        let len = entries.len();
        log::info!("Indexed {len} facilities");
        Ok(Self {
            tree: RTree::bulk_load(entries),
            len,
        })
    }

    /// Nearest facility to `point`: `(record index, distance)` in the
    /// layer's CRS units.
    ///
    /// Equidistant facilities tie-break to the lowest record index. The
    /// choice is stable and deterministic but geographically arbitrary.
    #[must_use]
    pub fn nearest(&self, point: Point<f64>) -> (usize, f64) {
        let query = [point.x(), point.y()];
        let mut candidates = self.tree.nearest_neighbor_iter_with_distance_2(&query);

        // The index is never empty by construction.
        let (first, best_d2) = candidates
            .next()
            .expect("facility index contains at least one entry");

        let mut best_index = first.index;
        for (entry, d2) in candidates {
            if d2 > best_d2 {
                break;
            }
            best_index = best_index.min(entry.index);
        }

        (best_index, best_d2.sqrt())
    }

    /// Number of indexed facilities.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no facilities (never true after a
    /// successful [`FacilityIndex::build`]).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The coordinate a geometry is indexed and measured at.
pub(crate) fn representative_point(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    match geometry {
        Geometry::Point(p) => Some(*p),
        other => other.centroid(),
    }
}

#[cfg(test)]
mod tests {
    use geo::Geometry;
    use health_access_geo::Crs;
    use health_access_vector_models::Feature;

    use super::*;

    fn facilities(coords: &[(f64, f64)]) -> FeatureSet {
        let features = coords
            .iter()
            .map(|&(x, y)| Feature::new(Some(Geometry::Point(Point::new(x, y)))))
            .collect();
        FeatureSet::from_features(Some(Crs::epsg(32737)), features)
    }

    #[test]
    fn nearest_returns_zero_for_coincident_point() {
        let index = FacilityIndex::build(&facilities(&[(3.0, 4.0), (10.0, 10.0)])).unwrap();
        let (idx, distance) = index.nearest(Point::new(3.0, 4.0));
        assert_eq!(idx, 0);
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn nearest_distance_is_euclidean() {
        let index = FacilityIndex::build(&facilities(&[(3.0, 4.0)])).unwrap();
        let (idx, distance) = index.nearest(Point::new(0.0, 0.0));
        assert_eq!(idx, 0);
        assert!((distance - 5.0).abs() < 1e-12);
    }

    #[test]
    fn equidistant_tie_breaks_to_lowest_index() {
        // Facilities 1 and 2 both sit exactly 1 unit from the origin.
        let index =
            FacilityIndex::build(&facilities(&[(50.0, 50.0), (1.0, 0.0), (-1.0, 0.0)])).unwrap();
        let (idx, distance) = index.nearest(Point::new(0.0, 0.0));
        assert_eq!(idx, 1);
        assert!((distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn records_without_geometry_are_skipped_but_keep_indices() {
        let mut set = facilities(&[(0.0, 0.0)]);
        set.push(Feature::new(None));
        set.push(Feature::new(Some(Geometry::Point(Point::new(9.0, 9.0)))));
        let index = FacilityIndex::build(&set).unwrap();
        assert_eq!(index.len(), 2);
        let (idx, _) = index.nearest(Point::new(8.0, 8.0));
        assert_eq!(idx, 2);
    }

    #[test]
    fn empty_layer_is_rejected() {
        let empty = FeatureSet::new(Some(Crs::epsg(32737)));
        assert!(matches!(
            FacilityIndex::build(&empty),
            Err(AccessibilityError::EmptyDataset { .. })
        ));
    }
}
