//! Raster grid type: cell values, affine georeferencing, nodata.

use geo::{Coord, Rect};
use health_access_geo::Crs;
use ndarray::Array2;

use crate::RasterError;

/// Six-parameter affine transform mapping array indices to CRS
/// coordinates (GDAL convention):
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// For a north-up raster `pixel_height` is negative and both rotation
/// terms are zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    /// X coordinate of the top-left corner of cell (0, 0).
    pub origin_x: f64,
    /// Y coordinate of the top-left corner of cell (0, 0).
    pub origin_y: f64,
    /// Cell width in CRS units.
    pub pixel_width: f64,
    /// Cell height in CRS units (negative for north-up rasters).
    pub pixel_height: f64,
    /// Row rotation term (zero for axis-aligned rasters).
    pub row_rotation: f64,
    /// Column rotation term (zero for axis-aligned rasters).
    pub col_rotation: f64,
}

impl GridTransform {
    /// Axis-aligned north-up transform with square cells.
    #[must_use]
    pub const fn north_up(origin_x: f64, origin_y: f64, cell_size: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: cell_size,
            pixel_height: -cell_size,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Maps fractional (col, row) indices to CRS coordinates.
    #[must_use]
    pub fn apply(&self, col: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_x + col * self.pixel_width + row * self.row_rotation,
            y: self.origin_y + col * self.col_rotation + row * self.pixel_height,
        }
    }

    /// Maps CRS coordinates back to fractional (col, row) indices.
    ///
    /// Returns `None` when the transform is degenerate (zero determinant);
    /// [`RasterGrid::new`] rejects such transforms up front.
    #[must_use]
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width.mul_add(self.pixel_height, -(self.row_rotation * self.col_rotation));
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = dx.mul_add(self.pixel_height, -(self.row_rotation * dy)) / det;
        let row = self.pixel_width.mul_add(dy, -(self.col_rotation * dx)) / det;
        Some((col, row))
    }

    fn is_valid(&self) -> bool {
        let det = self.pixel_width.mul_add(self.pixel_height, -(self.row_rotation * self.col_rotation));
        det != 0.0
            && [
                self.origin_x,
                self.origin_y,
                self.pixel_width,
                self.pixel_height,
                self.row_rotation,
                self.col_rotation,
            ]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A 2-D grid of cell values over a regular grid with georeferencing.
///
/// Transform and CRS are fixed at construction; nodata cells (and NaN
/// cells) are excluded from every aggregate statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    data: Array2<f64>,
    transform: GridTransform,
    crs: Crs,
    nodata: Option<f64>,
}

impl RasterGrid {
    /// Wraps an array of cell values with its georeferencing.
    ///
    /// # Errors
    ///
    /// Returns [`RasterError::EmptyGrid`] for a zero-sized array and
    /// [`RasterError::InvalidTransform`] for a degenerate or non-finite
    /// transform.
    pub fn new(
        data: Array2<f64>,
        transform: GridTransform,
        crs: Crs,
        nodata: Option<f64>,
    ) -> Result<Self, RasterError> {
        if data.nrows() == 0 || data.ncols() == 0 {
            return Err(RasterError::EmptyGrid);
        }
        if !transform.is_valid() {
            return Err(RasterError::InvalidTransform {
                message: "transform is non-invertible or non-finite".to_string(),
            });
        }
        Ok(Self {
            data,
            transform,
            crs,
            nodata,
        })
    }

    /// Overrides the nodata sentinel (e.g. from configuration when the
    /// source file's header is wrong, a common defect in population
    /// rasters).
    #[must_use]
    pub const fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// The grid's CRS.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// The affine transform.
    #[must_use]
    pub const fn transform(&self) -> &GridTransform {
        &self.transform
    }

    /// The nodata sentinel, if any.
    #[must_use]
    pub const fn nodata(&self) -> Option<f64> {
        self.nodata
    }

    /// Cell value at (row, col), or `None` out of bounds.
    #[must_use]
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied()
    }

    /// Whether `value` is excluded from statistics under `nodata`.
    #[must_use]
    pub fn is_nodata(&self, value: f64, nodata: Option<f64>) -> bool {
        value.is_nan() || nodata.or(self.nodata).is_some_and(|nd| value == nd)
    }

    /// CRS coordinates of a cell's center.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_center(&self, row: usize, col: usize) -> Coord<f64> {
        self.transform.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// CRS-aligned bounding rectangle of a cell's footprint.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect<f64> {
        let a = self.transform.apply(col as f64, row as f64);
        let b = self.transform.apply(col as f64 + 1.0, row as f64 + 1.0);
        Rect::new(a, b)
    }

    /// Integer cell index containing the CRS coordinates, or `None`
    /// outside the grid.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn index_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.invert(x, y)?;
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    /// Inclusive row/column window covering `rect`, clamped to the grid.
    ///
    /// Returns `None` when the rectangle misses the grid entirely.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn window_for(&self, rect: &Rect<f64>) -> Option<(std::ops::RangeInclusive<usize>, std::ops::RangeInclusive<usize>)> {
        // All four corners: rotation terms can tilt the window.
        let corners = [
            (rect.min().x, rect.min().y),
            (rect.min().x, rect.max().y),
            (rect.max().x, rect.min().y),
            (rect.max().x, rect.max().y),
        ];
        let mut col_min = f64::INFINITY;
        let mut col_max = f64::NEG_INFINITY;
        let mut row_min = f64::INFINITY;
        let mut row_max = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (col, row) = self.transform.invert(x, y)?;
            col_min = col_min.min(col);
            col_max = col_max.max(col);
            row_min = row_min.min(row);
            row_max = row_max.max(row);
        }

        #[allow(clippy::cast_precision_loss)]
        let (last_row, last_col) = (self.rows() as f64 - 1.0, self.cols() as f64 - 1.0);
        if col_max < 0.0 || row_max < 0.0 || col_min > last_col + 1.0 || row_min > last_row + 1.0 {
            return None;
        }

        let row_lo = row_min.floor().max(0.0) as usize;
        let row_hi = (row_max.ceil().min(last_row)).max(0.0) as usize;
        let col_lo = col_min.floor().max(0.0) as usize;
        let col_hi = (col_max.ceil().min(last_col)).max(0.0) as usize;
        Some((row_lo..=row_hi, col_lo..=col_hi))
    }

    /// Full extent of the grid in CRS coordinates.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Rect<f64> {
        let a = self.transform.apply(0.0, 0.0);
        let b = self.transform.apply(self.cols() as f64, self.rows() as f64);
        Rect::new(a, b)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn small_grid() -> RasterGrid {
        // 2x3 grid, origin (0, 2), cell size 1, north-up.
        RasterGrid::new(
            array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            GridTransform::north_up(0.0, 2.0, 1.0),
            Crs::epsg(32737),
            Some(-200.0),
        )
        .unwrap()
    }

    #[test]
    fn rejects_empty_grid() {
        let result = RasterGrid::new(
            Array2::zeros((0, 4)),
            GridTransform::north_up(0.0, 0.0, 1.0),
            Crs::WGS84,
            None,
        );
        assert!(matches!(result, Err(RasterError::EmptyGrid)));
    }

    #[test]
    fn rejects_degenerate_transform() {
        let result = RasterGrid::new(
            array![[1.0]],
            GridTransform::north_up(0.0, 0.0, 0.0),
            Crs::WGS84,
            None,
        );
        assert!(matches!(result, Err(RasterError::InvalidTransform { .. })));
    }

    #[test]
    fn cell_center_is_offset_half_a_cell() {
        let grid = small_grid();
        let center = grid.cell_center(0, 0);
        assert_eq!(center, Coord { x: 0.5, y: 1.5 });
        let center = grid.cell_center(1, 2);
        assert_eq!(center, Coord { x: 2.5, y: 0.5 });
    }

    #[test]
    fn index_of_inverts_cell_center() {
        let grid = small_grid();
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                let c = grid.cell_center(row, col);
                assert_eq!(grid.index_of(c.x, c.y), Some((row, col)));
            }
        }
        assert_eq!(grid.index_of(-1.0, 1.0), None);
        assert_eq!(grid.index_of(0.5, 5.0), None);
    }

    #[test]
    fn nodata_and_nan_are_excluded() {
        let grid = small_grid();
        assert!(grid.is_nodata(-200.0, None));
        assert!(grid.is_nodata(f64::NAN, None));
        assert!(!grid.is_nodata(0.0, None));
        // Override wins over the stored sentinel.
        assert!(grid.is_nodata(-1.0, Some(-1.0)));
        assert!(!grid.is_nodata(-200.0, Some(-1.0)));
    }

    #[test]
    fn window_clamps_to_grid() {
        let grid = small_grid();
        let rect = Rect::new(Coord { x: -5.0, y: -5.0 }, Coord { x: 50.0, y: 50.0 });
        let (rows, cols) = grid.window_for(&rect).unwrap();
        assert_eq!(rows, 0..=1);
        assert_eq!(cols, 0..=2);
    }

    #[test]
    fn window_misses_grid() {
        let grid = small_grid();
        let rect = Rect::new(Coord { x: 100.0, y: 100.0 }, Coord { x: 110.0, y: 110.0 });
        assert!(grid.window_for(&rect).is_none());
    }
}
