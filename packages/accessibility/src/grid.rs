//! Regular sample grid generation.

use geo::{Geometry, Point};
use health_access_vector_models::{Feature, FeatureSet};

use crate::AccessibilityError;

/// Generates a `grid_size` x `grid_size` set of evenly spaced points over
/// the boundary's bounding box, inclusive of both ends of each axis.
///
/// Points cover the rectangular envelope, *not* the boundary polygon
/// itself, so oddly shaped boundaries will be sampled outside their true
/// area. Kept intentionally: downstream coverage percentages are defined
/// relative to this envelope grid.
///
/// Point order is x-major (all y values for the first x, then the next
/// x). The grid inherits the boundary's CRS.
///
/// # Errors
///
/// Returns [`AccessibilityError::InvalidGridSize`] for `grid_size == 0`
/// and [`AccessibilityError::EmptyDataset`] when the boundary has no
/// geometry to take a bounding box from.
pub fn create_sample_grid(
    boundary: &FeatureSet,
    grid_size: usize,
) -> Result<FeatureSet, AccessibilityError> {
    if grid_size == 0 {
        return Err(AccessibilityError::InvalidGridSize);
    }
    let bounds = boundary
        .total_bounds()
        .ok_or(AccessibilityError::EmptyDataset {
            context: "boundary layer has no geometry",
        })?;

    log::info!("Creating sample grid ({grid_size}x{grid_size})");

    let xs = linspace(bounds.min().x, bounds.max().x, grid_size);
    let ys = linspace(bounds.min().y, bounds.max().y, grid_size);

    let mut grid = FeatureSet::new(boundary.crs());
    for &x in &xs {
        for &y in &ys {
            grid.push(Feature::new(Some(Geometry::Point(Point::new(x, y)))));
        }
    }

    log::info!("Created {} grid points", grid.len());
    Ok(grid)
}

/// `n` evenly spaced values from `start` to `end` inclusive; a single
/// sample collapses to `start`.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    #[allow(clippy::cast_precision_loss)]
    let step = (end - start) / (n - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    (0..n).map(|i| (i as f64).mul_add(step, start)).collect()
}
