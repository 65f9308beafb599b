#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial feature collection types.
//!
//! A [`FeatureSet`] is an ordered collection of records, each carrying an
//! optional geometry plus scalar attributes, with one CRS shared by the
//! whole set. The CRS is explicit, never implicit: it lives on the set,
//! and operations that change it (reprojection) produce a new set.

use std::collections::BTreeMap;

use geo::{BoundingRect, Geometry, Rect};
use health_access_geo::Crs;
use serde::{Deserialize, Serialize};

/// A scalar attribute value attached to a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Missing or undefined value.
    Null,
    /// Boolean flag (e.g. threshold classification columns).
    Bool(bool),
    /// Integer value (counts, indexes).
    Integer(i64),
    /// Floating point value (distances, populations).
    Float(f64),
    /// Text value (names, codes, facility types).
    String(String),
}

impl AttributeValue {
    /// Numeric view of the value; integers widen to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            #[allow(clippy::cast_precision_loss)]
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Integer view of the value.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Whether the value is [`AttributeValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

/// A single record: an optional geometry plus named scalar attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Geometry in the CRS of the owning [`FeatureSet`]. `None` for
    /// records whose geometry was absent in the source data.
    pub geometry: Option<Geometry<f64>>,
    /// Scalar attributes keyed by column name.
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Feature {
    /// Creates a feature with the given geometry and no attributes.
    #[must_use]
    pub const fn new(geometry: Option<Geometry<f64>>) -> Self {
        Self {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    /// Looks up an attribute by column name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Inserts or replaces an attribute.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.to_string(), value.into());
    }
}

/// An ordered collection of features sharing one CRS.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSet {
    crs: Option<Crs>,
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Creates an empty set with the given CRS.
    #[must_use]
    pub const fn new(crs: Option<Crs>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    /// Creates a set from existing features.
    #[must_use]
    pub const fn from_features(crs: Option<Crs>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    /// The CRS shared by every feature in the set, if assigned.
    #[must_use]
    pub const fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Assigns a CRS without transforming coordinates (used when the
    /// source data's CRS is known out of band, e.g. GeoJSON is WGS84).
    pub const fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// Number of features.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the set has no features.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Appends a feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Iterates features in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Mutable iteration in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Feature> {
        self.features.iter_mut()
    }

    /// Borrow the underlying features.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Consumes the set, yielding its features.
    #[must_use]
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Bounding box over all geometries (minx, miny, maxx, maxy), or
    /// `None` if no feature has a geometry.
    #[must_use]
    pub fn total_bounds(&self) -> Option<Rect<f64>> {
        let mut bounds: Option<Rect<f64>> = None;
        for feature in &self.features {
            let Some(rect) = feature.geometry.as_ref().and_then(BoundingRect::bounding_rect)
            else {
                continue;
            };
            bounds = Some(bounds.map_or(rect, |acc| {
                Rect::new(
                    geo::Coord {
                        x: acc.min().x.min(rect.min().x),
                        y: acc.min().y.min(rect.min().y),
                    },
                    geo::Coord {
                        x: acc.max().x.max(rect.max().x),
                        y: acc.max().y.max(rect.max().y),
                    },
                )
            }));
        }
        bounds
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use geo::{Point, point};

    use super::*;

    fn point_feature(x: f64, y: f64) -> Feature {
        Feature::new(Some(Geometry::Point(Point::new(x, y))))
    }

    #[test]
    fn total_bounds_spans_all_geometries() {
        let set = FeatureSet::from_features(
            Some(Crs::WGS84),
            vec![point_feature(1.0, 2.0), point_feature(-3.0, 7.0)],
        );
        let bounds = set.total_bounds().unwrap();
        assert_eq!(bounds.min().x, -3.0);
        assert_eq!(bounds.min().y, 2.0);
        assert_eq!(bounds.max().x, 1.0);
        assert_eq!(bounds.max().y, 7.0);
    }

    #[test]
    fn total_bounds_skips_missing_geometry() {
        let set = FeatureSet::from_features(
            None,
            vec![Feature::new(None), point_feature(5.0, 5.0)],
        );
        let bounds = set.total_bounds().unwrap();
        assert_eq!(bounds.min(), point! { x: 5.0, y: 5.0 }.0);
    }

    #[test]
    fn attribute_round_trip() {
        let feature = point_feature(0.0, 0.0)
            .with_attribute("name", "Nairobi West Clinic")
            .with_attribute("beds", 12_i64);
        assert_eq!(
            feature.attribute("name").and_then(AttributeValue::as_str),
            Some("Nairobi West Clinic")
        );
        assert_eq!(
            feature.attribute("beds").and_then(AttributeValue::as_f64),
            Some(12.0)
        );
        assert!(feature.attribute("missing").is_none());
    }

    #[test]
    fn integer_widens_but_bool_does_not() {
        assert_eq!(AttributeValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(AttributeValue::Bool(true).as_f64(), None);
    }
}
