//! Coordinate transforms between EPSG coordinate reference systems.
//!
//! Built on `proj4rs` with projection definitions resolved from the
//! `crs-definitions` database, so transforms work for UTM zones, national
//! grids, and web mercator without a system PROJ install.

use geo::{Coord, Geometry, MapCoords};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::{Crs, CrsError};

/// A prepared transform from one CRS to another.
///
/// Parses both projection definitions once; reuse a single instance to
/// transform whole layers rather than rebuilding per coordinate.
pub struct Reprojector {
    source: Crs,
    target: Crs,
    source_proj: Proj,
    target_proj: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Reprojector {
    /// Prepares a transform from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError`] if either EPSG code is unknown or its
    /// projection definition fails to parse.
    pub fn new(source: Crs, target: Crs) -> Result<Self, CrsError> {
        let source_proj =
            Proj::from_proj_string(source.proj_string()?).map_err(|e| {
                CrsError::InvalidProjection {
                    epsg: source.code(),
                    message: format!("{e:?}"),
                }
            })?;
        let target_proj =
            Proj::from_proj_string(target.proj_string()?).map_err(|e| {
                CrsError::InvalidProjection {
                    epsg: target.code(),
                    message: format!("{e:?}"),
                }
            })?;

        Ok(Self {
            source,
            target,
            source_proj,
            target_proj,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
        })
    }

    /// Transforms a single coordinate pair.
    ///
    /// proj4rs works in radians for geographic CRSs; degree conversion is
    /// applied on both ends as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Transform`] on degenerate or out-of-domain
    /// input (e.g. non-finite coordinates).
    pub fn transform_xy(&self, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
        if self.source == self.target {
            return Ok((x, y));
        }

        let (x_in, y_in) = if self.source_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (x_in, y_in, 0.0);
        transform(&self.source_proj, &self.target_proj, &mut point).map_err(|e| {
            CrsError::Transform {
                source_epsg: self.source.code(),
                target: self.target.code(),
                message: format!("{e:?}"),
            }
        })?;

        if self.target_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Transforms every coordinate of a geometry, producing a new geometry.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::Transform`] if any coordinate fails to
    /// transform.
    pub fn transform_geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, CrsError> {
        geometry.try_map_coords(|coord| {
            let (x, y) = self.transform_xy(coord.x, coord.y)?;
            Ok(Coord { x, y })
        })
    }

    /// Source CRS of this transform.
    #[must_use]
    pub const fn source(&self) -> Crs {
        self.source
    }

    /// Target CRS of this transform.
    #[must_use]
    pub const fn target(&self) -> Crs {
        self.target
    }
}

/// One-shot transform of a single point between two CRSs.
///
/// Prefer [`Reprojector`] when transforming more than a handful of
/// coordinates.
///
/// # Errors
///
/// Returns [`CrsError`] on unknown EPSG codes or transform failure.
pub fn project_point(source: Crs, target: Crs, x: f64, y: f64) -> Result<(f64, f64), CrsError> {
    if source == target {
        return Ok((x, y));
    }
    Reprojector::new(source, target)?.transform_xy(x, y)
}
