//! EPSG coordinate reference system identifiers.

use serde::{Deserialize, Serialize};

use crate::CrsError;

/// A coordinate reference system identified by its EPSG code.
///
/// Codes are validated lazily: constructing a [`Crs`] never fails, but
/// resolving its projection string via [`Crs::proj_string`] does when the
/// code is absent from the `crs-definitions` database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(u16);

impl Crs {
    /// Geographic WGS84 (longitude/latitude degrees).
    pub const WGS84: Self = Self(4326);

    /// Wraps an EPSG code.
    #[must_use]
    pub const fn epsg(code: u16) -> Self {
        Self(code)
    }

    /// The raw EPSG code.
    #[must_use]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Resolves the PROJ4 definition string for this CRS.
    ///
    /// # Errors
    ///
    /// Returns [`CrsError::UnknownEpsg`] if the code is not in the
    /// `crs-definitions` database.
    pub fn proj_string(self) -> Result<&'static str, CrsError> {
        crs_definitions::from_code(self.0)
            .map(|def| def.proj4)
            .ok_or(CrsError::UnknownEpsg(self.0))
    }

    /// Whether this CRS uses geographic (longitude/latitude) coordinates.
    ///
    /// Checked against the projection string; falls back to the 4xxx code
    /// range convention when the code is unknown.
    #[must_use]
    pub fn is_geographic(self) -> bool {
        self.proj_string().map_or_else(
            |_| self.0 == 4326 || (4000..5000).contains(&self.0),
            |proj| proj.contains("+proj=longlat"),
        )
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl From<u16> for Crs {
    fn from(code: u16) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wgs84_is_geographic() {
        assert!(Crs::WGS84.is_geographic());
    }

    #[test]
    fn utm_is_projected() {
        // UTM zone 37S, the planar CRS used for Kenya.
        assert!(!Crs::epsg(32737).is_geographic());
    }

    #[test]
    fn unknown_code_has_no_proj_string() {
        assert!(Crs::epsg(1).proj_string().is_err());
    }

    #[test]
    fn displays_as_epsg() {
        assert_eq!(Crs::epsg(3857).to_string(), "EPSG:3857");
    }
}
