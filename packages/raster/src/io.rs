//! ESRI ASCII grid (`.asc`) reader.
//!
//! The ASCII grid format is a plain-text header (`ncols`, `nrows`, lower-left
//! corner, `cellsize`, optional `NODATA_value`) followed by row-major cell
//! values, northernmost row first. Population rasters distributed as GeoTIFF
//! can be converted with `gdal_translate -of AAIGrid`.
//!
//! The format carries no CRS metadata, so the caller supplies the [`Crs`].

use std::fs::File;
use std::io::{BufRead as _, BufReader};
use std::path::Path;

use health_access_geo::Crs;
use ndarray::Array2;

use crate::grid::{GridTransform, RasterGrid};
use crate::RasterError;

struct AsciiHeader {
    ncols: usize,
    nrows: usize,
    xll: f64,
    yll: f64,
    /// Whether (xll, yll) is the center of the lower-left cell rather
    /// than its corner.
    cell_centered: bool,
    cell_size: f64,
    nodata: Option<f64>,
}

fn parse_error(message: impl Into<String>) -> RasterError {
    RasterError::Parse {
        message: message.into(),
    }
}

fn parse_field<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RasterError> {
    value
        .parse()
        .map_err(|_| parse_error(format!("invalid value for '{key}': '{value}'")))
}

/// Reads an ESRI ASCII grid, tagging it with the given CRS.
///
/// `NODATA_value` from the header becomes the grid's nodata sentinel; use
/// [`RasterGrid::with_nodata`] afterwards to override a wrong header.
///
/// # Errors
///
/// Returns [`RasterError::Io`] when the file cannot be read and
/// [`RasterError::Parse`] when the header is incomplete or the body does
/// not contain `nrows * ncols` numeric values.
pub fn read_ascii_grid(path: &Path, crs: Crs) -> Result<RasterGrid, RasterError> {
    let reader = BufReader::new(File::open(path)?);

    let mut ncols = None;
    let mut nrows = None;
    let mut xll = None;
    let mut yll = None;
    let mut cell_centered = false;
    let mut cell_size = None;
    let mut nodata = None;

    let mut values: Vec<f64> = Vec::new();
    let mut in_body = false;

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if !in_body {
            let mut parts = trimmed.split_whitespace();
            let key = parts.next().unwrap_or_default().to_ascii_lowercase();
            let is_header_key = matches!(
                key.as_str(),
                "ncols"
                    | "nrows"
                    | "xllcorner"
                    | "xllcenter"
                    | "yllcorner"
                    | "yllcenter"
                    | "cellsize"
                    | "nodata_value"
            );
            if is_header_key {
                let value = parts
                    .next()
                    .ok_or_else(|| parse_error(format!("header line '{key}' has no value")))?;
                match key.as_str() {
                    "ncols" => ncols = Some(parse_field(&key, value)?),
                    "nrows" => nrows = Some(parse_field(&key, value)?),
                    "xllcorner" => xll = Some(parse_field(&key, value)?),
                    "xllcenter" => {
                        xll = Some(parse_field(&key, value)?);
                        cell_centered = true;
                    }
                    "yllcorner" => yll = Some(parse_field(&key, value)?),
                    "yllcenter" => {
                        yll = Some(parse_field(&key, value)?);
                        cell_centered = true;
                    }
                    "cellsize" => cell_size = Some(parse_field(&key, value)?),
                    _ => nodata = Some(parse_field(&key, value)?),
                }
                continue;
            }
            in_body = true;
        }

        for token in trimmed.split_whitespace() {
            values.push(parse_field("cell value", token)?);
        }
    }

    let ncols: usize = ncols.ok_or_else(|| parse_error("missing 'ncols' header"))?;
    let nrows: usize = nrows.ok_or_else(|| parse_error("missing 'nrows' header"))?;
    let mut xll: f64 = xll.ok_or_else(|| parse_error("missing 'xllcorner' header"))?;
    let mut yll: f64 = yll.ok_or_else(|| parse_error("missing 'yllcorner' header"))?;
    let cell_size: f64 = cell_size.ok_or_else(|| parse_error("missing 'cellsize' header"))?;

    if cell_centered {
        xll -= cell_size / 2.0;
        yll -= cell_size / 2.0;
    }

    if values.len() != nrows * ncols {
        return Err(parse_error(format!(
            "expected {} cell values ({nrows} rows x {ncols} cols), found {}",
            nrows * ncols,
            values.len()
        )));
    }

    let data = Array2::from_shape_vec((nrows, ncols), values)
        .map_err(|e| parse_error(format!("cell values do not form a grid: {e}")))?;

    // The header anchors the lower-left corner; the transform wants the
    // upper-left one.
    #[allow(clippy::cast_precision_loss)]
    let origin_y = yll + nrows as f64 * cell_size;
    let transform = GridTransform::north_up(xll, origin_y, cell_size);

    RasterGrid::new(data, transform, crs, nodata)
}
