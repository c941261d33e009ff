//! GeoJSON model and decoder.
//!
//! Only the two object types a layer file may hold at the top level are
//! accepted: `FeatureCollection` (used as-is) and `Feature` (wrapped into a
//! one-element collection). Geometries are fully typed so that decoded
//! shapefiles and parsed GeoJSON share one representation. `bbox` and any
//! foreign members (such as `crs`) on features and collections are kept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// UTF-8 byte order mark, tolerated at the start of uploaded files.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// A coordinate tuple: `[x, y]` or `[x, y, z]`.
pub type Position = Vec<f64>;

/// Feature properties (a JSON object).
pub type Properties = Map<String, Value>;

// =============================================================================
// Geometry
// =============================================================================

/// GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// Get the GeoJSON type name of this geometry.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }
}

// =============================================================================
// Feature / FeatureCollection
// =============================================================================

/// Type tag serialized as `"type": "Feature"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureTag {
    #[default]
    Feature,
}

/// Type tag serialized as `"type": "FeatureCollection"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureCollectionTag {
    #[default]
    FeatureCollection,
}

/// A geometry plus its key-value properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub tag: FeatureTag,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// `null` geometries are legal and come from shapefile null shapes
    #[serde(default)]
    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: Option<Properties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    /// Members outside the core schema (`crs`, vendor keys), kept verbatim
    #[serde(flatten)]
    pub foreign_members: Properties,
}

impl Feature {
    /// Create a feature from a geometry and properties.
    pub fn new(geometry: Option<Geometry>, properties: Properties) -> Self {
        Self {
            tag: FeatureTag::Feature,
            id: None,
            geometry,
            properties: Some(properties),
            bbox: None,
            foreign_members: Properties::new(),
        }
    }

    /// Get mutable access to the properties, creating the object if it was null.
    pub fn properties_mut(&mut self) -> &mut Properties {
        self.properties.get_or_insert_with(Map::new)
    }

    /// Look up a property value.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.as_ref().and_then(|p| p.get(key))
    }
}

/// An ordered set of features, the one canonical overlay shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub tag: FeatureCollectionTag,

    pub features: Vec<Feature>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(flatten)]
    pub foreign_members: Properties,
}

impl FeatureCollection {
    /// Create a collection from features, keeping their order.
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            tag: FeatureCollectionTag::FeatureCollection,
            features,
            bbox: None,
            foreign_members: Properties::new(),
        }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl From<Feature> for FeatureCollection {
    fn from(feature: Feature) -> Self {
        FeatureCollection::new(vec![feature])
    }
}

// =============================================================================
// GeoJson
// =============================================================================

/// A top-level GeoJSON object accepted as layer content.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoJson {
    Feature(Feature),
    FeatureCollection(FeatureCollection),
}

impl GeoJson {
    /// Normalize into a collection; a bare feature becomes a one-element collection.
    pub fn into_collection(self) -> FeatureCollection {
        match self {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => feature.into(),
        }
    }

    /// Number of features this object contributes.
    pub fn feature_count(&self) -> usize {
        match self {
            GeoJson::FeatureCollection(collection) => collection.len(),
            GeoJson::Feature(_) => 1,
        }
    }
}

/// Concatenate several GeoJSON objects into a single collection.
///
/// Features keep their order: objects in sequence, features within each
/// object in their original order.
pub fn merge_collections(parts: Vec<GeoJson>) -> FeatureCollection {
    let total = parts.iter().map(GeoJson::feature_count).sum();
    let mut features = Vec::with_capacity(total);

    for part in parts {
        match part {
            GeoJson::FeatureCollection(collection) => features.extend(collection.features),
            GeoJson::Feature(feature) => features.push(feature),
        }
    }

    FeatureCollection::new(features)
}

// =============================================================================
// Decoding
// =============================================================================

/// Parse raw bytes as a GeoJSON Feature or FeatureCollection.
///
/// # Errors
/// * `DecodeError::Json` - content is not valid JSON
/// * `DecodeError::MissingTypeTag` - the value has no string `type` member
/// * `DecodeError::UnexpectedType` - the type is not Feature or FeatureCollection
/// * `DecodeError::Structure` - the type is right but members are malformed
pub fn parse_geojson(bytes: &[u8]) -> Result<GeoJson, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Json(e.to_string()))?;

    let type_tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingTypeTag)?;

    match type_tag {
        "FeatureCollection" => serde_json::from_value(value)
            .map(GeoJson::FeatureCollection)
            .map_err(|e| DecodeError::Structure {
                kind: "FeatureCollection",
                message: e.to_string(),
            }),
        "Feature" => serde_json::from_value(value)
            .map(GeoJson::Feature)
            .map_err(|e| DecodeError::Structure {
                kind: "Feature",
                message: e.to_string(),
            }),
        other => Err(DecodeError::UnexpectedType(other.to_string())),
    }
}

/// Decode raw bytes into a normalized feature collection.
pub fn decode_geojson(bytes: &[u8]) -> Result<FeatureCollection, DecodeError> {
    parse_geojson(bytes).map(GeoJson::into_collection)
}

// =============================================================================
// Tests
// =============================================================================
