//! Facility loading from CSV files with coordinate columns.
//!
//! Accepts specialist or facility lists exported as CSV with latitude
//! and longitude columns. Rows with missing or unparseable coordinates
//! are skipped and counted, never fatal.

use std::path::Path;

use geo::{Geometry, Point};
use health_access_geo::Crs;
use health_access_vector_models::{Feature, FeatureSet};

use crate::FetchError;

/// Column names for the coordinate pair.
#[derive(Debug, Clone)]
pub struct CoordinateColumns {
    /// Latitude column header.
    pub latitude: String,
    /// Longitude column header.
    pub longitude: String,
}

impl Default for CoordinateColumns {
    fn default() -> Self {
        Self {
            latitude: "latitude".to_string(),
            longitude: "longitude".to_string(),
        }
    }
}

/// Loads a coordinate CSV into a WGS84 point [`FeatureSet`].
///
/// All non-coordinate columns become string attributes. Rows without a
/// valid coordinate pair are dropped with a warning tally.
///
/// # Errors
///
/// Returns [`FetchError::MissingColumn`] when a coordinate column is
/// absent from the header, and [`FetchError::Csv`]/[`FetchError::Io`]
/// on read failure.
pub fn load_facility_csv(path: &Path, columns: &CoordinateColumns) -> Result<FeatureSet, FetchError> {
    log::info!("Loading facility CSV from {}", path.display());
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    };
    let lat_idx = find(&columns.latitude).ok_or_else(|| FetchError::MissingColumn {
        column: columns.latitude.clone(),
        found: headers.iter().map(str::to_string).collect(),
    })?;
    let lon_idx = find(&columns.longitude).ok_or_else(|| FetchError::MissingColumn {
        column: columns.longitude.clone(),
        found: headers.iter().map(str::to_string).collect(),
    })?;

    let mut set = FeatureSet::new(Some(Crs::WGS84));
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let coords = record
            .get(lat_idx)
            .and_then(|lat| lat.trim().parse::<f64>().ok())
            .zip(record.get(lon_idx).and_then(|lon| lon.trim().parse::<f64>().ok()));
        let Some((lat, lon)) = coords else {
            skipped += 1;
            continue;
        };

        let mut feature = Feature::new(Some(Geometry::Point(Point::new(lon, lat))));
        for (idx, value) in record.iter().enumerate() {
            if idx == lat_idx || idx == lon_idx || value.is_empty() {
                continue;
            }
            if let Some(name) = headers.get(idx) {
                feature.set_attribute(name, value);
            }
        }
        set.push(feature);
    }

    if skipped > 0 {
        log::warn!("Skipped {skipped} CSV rows without valid coordinates");
    }
    log::info!("Loaded {} facility records from CSV", set.len());
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use health_access_vector_models::AttributeValue;

    use super::*;

    fn write_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_points_and_attributes() {
        let path = write_csv(
            "health_access_csv_basic.csv",
            "name,latitude,longitude,type\n\
             Aga Khan,-1.26,36.82,hospital\n\
             Kisumu Clinic,-0.09,34.76,clinic\n",
        );
        let set = load_facility_csv(&path, &CoordinateColumns::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(set.len(), 2);
        assert_eq!(set.crs(), Some(Crs::WGS84));
        let first = &set.features()[0];
        let Some(Geometry::Point(p)) = &first.geometry else {
            panic!("expected point");
        };
        assert_eq!((p.x(), p.y()), (36.82, -1.26));
        assert_eq!(
            first.attribute("type").and_then(AttributeValue::as_str),
            Some("hospital")
        );
    }

    #[test]
    fn skips_rows_with_bad_coordinates() {
        let path = write_csv(
            "health_access_csv_bad_rows.csv",
            "name,latitude,longitude\n\
             ok,-1.0,36.0\n\
             missing,,36.0\n\
             garbage,abc,def\n",
        );
        let set = load_facility_csv(&path, &CoordinateColumns::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn missing_coordinate_column_is_an_error() {
        let path = write_csv(
            "health_access_csv_no_lon.csv",
            "name,latitude\nplace,-1.0\n",
        );
        let result = load_facility_csv(&path, &CoordinateColumns::default());
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(FetchError::MissingColumn { .. })));
    }
}
