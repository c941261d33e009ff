use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;

// =============================================================================
// LayerId
// =============================================================================

/// Opaque layer identifier as issued by the backend.
///
/// The backend may use integer primary keys or string ids; both are kept in
/// their original JSON representation so they round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayerId {
    Number(i64),
    Text(String),
}

impl LayerId {
    /// Get the id as it should appear in a URL path segment.
    pub fn as_path_segment(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Number(n) => write!(f, "{}", n),
            LayerId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for LayerId {
    fn from(value: i64) -> Self {
        LayerId::Number(value)
    }
}

impl From<i32> for LayerId {
    fn from(value: i32) -> Self {
        LayerId::Number(value.into())
    }
}

impl From<&str> for LayerId {
    fn from(value: &str) -> Self {
        LayerId::Text(value.to_string())
    }
}

impl From<String> for LayerId {
    fn from(value: String) -> Self {
        LayerId::Text(value)
    }
}

// =============================================================================
// LayerDescriptor
// =============================================================================

/// Catalog metadata for one layer, before its file has been fetched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerDescriptor {
    /// Stable identifier, unique within one catalog
    pub id: LayerId,

    /// Display label
    pub name: String,

    /// Location of the raw geospatial file (None means "skip")
    #[serde(rename = "file_url")]
    pub source_url: Option<String>,

    /// Optional format hint such as "Shapefile" or "GeoJSON"
    #[serde(rename = "format")]
    pub declared_format: Option<String>,
}

impl LayerDescriptor {
    /// Create a descriptor with a source URL and no format hint.
    pub fn new(
        id: impl Into<LayerId>,
        name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_url: Some(source_url.into()),
            declared_format: None,
        }
    }

    /// Create a descriptor that has no file attached.
    pub fn without_source(id: impl Into<LayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source_url: None,
            declared_format: None,
        }
    }

    /// Set the declared format hint.
    pub fn with_declared_format(mut self, format: impl Into<String>) -> Self {
        self.declared_format = Some(format.into());
        self
    }

    /// Get the source URL if the layer has a usable one.
    ///
    /// Empty strings are treated like a missing URL.
    pub fn source(&self) -> Option<&str> {
        self.source_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// Parse one catalog entry from its JSON object.
    fn from_json_entry(index: usize, value: &Value) -> Result<Self, CatalogError> {
        let object = value.as_object().ok_or_else(|| CatalogError::InvalidField {
            index,
            field: "entry",
            reason: format!("expected an object, got {}", json_type_name(value)),
        })?;

        let id = match object.get("id") {
            None | Some(Value::Null) => {
                return Err(CatalogError::MissingField { index, field: "id" })
            }
            Some(Value::String(s)) if s.is_empty() => {
                return Err(CatalogError::InvalidField {
                    index,
                    field: "id",
                    reason: "empty string".to_string(),
                })
            }
            Some(Value::String(s)) => LayerId::Text(s.clone()),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(n) => LayerId::Number(n),
                None => {
                    return Err(CatalogError::InvalidField {
                        index,
                        field: "id",
                        reason: format!("{} is not an integer", n),
                    })
                }
            },
            Some(other) => {
                return Err(CatalogError::InvalidField {
                    index,
                    field: "id",
                    reason: format!("expected string or integer, got {}", json_type_name(other)),
                })
            }
        };

        let name = match object.get("name") {
            None | Some(Value::Null) => {
                return Err(CatalogError::MissingField {
                    index,
                    field: "name",
                })
            }
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(CatalogError::InvalidField {
                    index,
                    field: "name",
                    reason: format!("expected string, got {}", json_type_name(other)),
                })
            }
        };

        let source_url = optional_string(object, index, "file_url", &["sourceUrl", "source_url"])?
            .filter(|url| !url.trim().is_empty());
        let declared_format = optional_string(object, index, "format", &["declaredFormat"])?;

        Ok(Self {
            id,
            name,
            source_url,
            declared_format,
        })
    }
}

/// Read an optional string member, trying aliases in order.
fn optional_string(
    object: &Map<String, Value>,
    index: usize,
    field: &'static str,
    aliases: &[&str],
) -> Result<Option<String>, CatalogError> {
    let value = std::iter::once(field)
        .chain(aliases.iter().copied())
        .find_map(|key| object.get(key));

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(CatalogError::InvalidField {
            index,
            field,
            reason: format!("expected string or null, got {}", json_type_name(other)),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Check that descriptors handed to the pipeline form a valid catalog.
///
/// Rejects empty string ids and duplicate ids.
pub fn validate_descriptors(descriptors: &[LayerDescriptor]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(descriptors.len());

    for (index, descriptor) in descriptors.iter().enumerate() {
        if let LayerId::Text(s) = &descriptor.id {
            if s.is_empty() {
                return Err(CatalogError::InvalidField {
                    index,
                    field: "id",
                    reason: "empty string".to_string(),
                });
            }
        }
        if !seen.insert(&descriptor.id) {
            return Err(CatalogError::DuplicateId(descriptor.id.to_string()));
        }
    }

    Ok(())
}

// =============================================================================
// Catalog
// =============================================================================

/// A validated, ordered list of layer descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    descriptors: Vec<LayerDescriptor>,
}

impl Catalog {
    /// Build a catalog from descriptors, validating ids.
    pub fn new(descriptors: Vec<LayerDescriptor>) -> Result<Self, CatalogError> {
        validate_descriptors(&descriptors)?;
        Ok(Self { descriptors })
    }

    /// Parse a catalog from the backend's JSON listing.
    pub fn from_json(value: &Value) -> Result<Self, CatalogError> {
        let entries = value.as_array().ok_or(CatalogError::NotASequence {
            found: json_type_name(value),
        })?;

        let descriptors = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| LayerDescriptor::from_json_entry(index, entry))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(descriptors)
    }

    /// Parse a catalog from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CatalogError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| CatalogError::InvalidField {
                index: 0,
                field: "catalog",
                reason: format!("malformed JSON: {}", e),
            })?;
        Self::from_json(&value)
    }

    /// Get the descriptors in catalog order.
    pub fn descriptors(&self) -> &[LayerDescriptor] {
        &self.descriptors
    }

    /// Number of descriptors in the catalog.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Number of descriptors that point at a file.
    pub fn loadable_count(&self) -> usize {
        self.descriptors
            .iter()
            .filter(|d| d.source().is_some())
            .count()
    }

    /// Find a descriptor by id.
    pub fn get(&self, id: &LayerId) -> Option<&LayerDescriptor> {
        self.descriptors.iter().find(|d| &d.id == id)
    }

    /// Iterate over descriptors in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, LayerDescriptor> {
        self.descriptors.iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a LayerDescriptor;
    type IntoIter = std::slice::Iter<'a, LayerDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
