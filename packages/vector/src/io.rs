//! GeoJSON reading and writing for [`FeatureSet`] layers.
//!
//! GeoJSON interchange is conventionally WGS84 (RFC 7946), so loaded sets
//! default to that CRS. Written files carry whatever CRS the set is in;
//! downstream artifacts (accessibility grid, population zones) are saved
//! in the planar analysis CRS on purpose, mirroring the rest of the
//! pipeline's outputs.

use std::fs;
use std::path::Path;

use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};
use health_access_geo::Crs;
use health_access_vector_models::{AttributeValue, Feature, FeatureSet};

use crate::VectorError;

/// Parses a GeoJSON `FeatureCollection` into a [`FeatureSet`] tagged
/// with `crs`. Nested array/object properties are stringified; the data
/// model is scalar-only.
///
/// # Errors
///
/// Returns [`VectorError::GeoJson`] on malformed GeoJSON.
pub fn from_geojson_str(input: &str, crs: Crs) -> Result<FeatureSet, VectorError> {
    let geojson: GeoJson = input.parse()?;
    let collection = FeatureCollection::try_from(geojson)?;

    let mut set = FeatureSet::new(Some(crs));
    for gj_feature in collection.features {
        let geometry = gj_feature
            .geometry
            .map(geo::Geometry::<f64>::try_from)
            .transpose()?;
        let mut feature = Feature::new(geometry);
        if let Some(properties) = gj_feature.properties {
            for (name, value) in properties {
                feature.set_attribute(&name, attribute_from_json(&value));
            }
        }
        set.push(feature);
    }
    Ok(set)
}

/// Loads a GeoJSON file, defaulting the CRS to WGS84.
///
/// # Errors
///
/// Returns [`VectorError`] on I/O or parse failure.
pub fn read_geojson(path: &Path) -> Result<FeatureSet, VectorError> {
    log::info!("Loading GeoJSON: {}", path.display());
    let text = fs::read_to_string(path)?;
    let set = from_geojson_str(&text, Crs::WGS84)?;
    log::info!("Loaded {} features", set.len());
    Ok(set)
}

/// Serializes a [`FeatureSet`] to a GeoJSON feature collection string.
///
/// # Errors
///
/// Returns [`VectorError::Json`] if serialization fails.
pub fn to_geojson_string(set: &FeatureSet) -> Result<String, VectorError> {
    let features: Vec<geojson::Feature> = set
        .iter()
        .map(|feature| {
            let geometry = feature
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g)));
            let mut properties = JsonObject::new();
            for (name, value) in &feature.attributes {
                properties.insert(name.clone(), attribute_to_json(value));
            }
            geojson::Feature {
                bbox: None,
                geometry,
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };
    Ok(serde_json::to_string(&collection)?)
}

/// Writes a [`FeatureSet`] to a GeoJSON file.
///
/// # Errors
///
/// Returns [`VectorError`] on serialization or I/O failure.
pub fn write_geojson(set: &FeatureSet, path: &Path) -> Result<(), VectorError> {
    log::info!("Writing {} features to {}", set.len(), path.display());
    fs::write(path, to_geojson_string(set)?)?;
    Ok(())
}

fn attribute_from_json(value: &JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(b) => AttributeValue::Bool(*b),
        JsonValue::Number(n) => n.as_i64().map_or_else(
            || AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            AttributeValue::Integer,
        ),
        JsonValue::String(s) => AttributeValue::String(s.clone()),
        // Flatten nested structures to their JSON text.
        other => AttributeValue::String(other.to_string()),
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(b) => JsonValue::Bool(*b),
        AttributeValue::Integer(i) => JsonValue::from(*i),
        // Non-finite floats (undefined means) serialize as null.
        AttributeValue::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(JsonValue::Null, JsonValue::Number),
        AttributeValue::String(s) => JsonValue::String(s.clone()),
    }
}
