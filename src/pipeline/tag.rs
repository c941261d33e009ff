//! Provenance tags written into every feature of a loaded layer.

use serde_json::Value;

use crate::catalog::LayerId;
use crate::format::FeatureCollection;

/// Property key holding the originating layer id.
pub const LAYER_ID_TAG: &str = "geodesa:layer_id";

/// Property key holding the originating layer name.
pub const LAYER_NAME_TAG: &str = "geodesa:layer_name";

fn id_value(id: &LayerId) -> Value {
    match id {
        LayerId::Number(n) => Value::from(*n),
        LayerId::Text(s) => Value::String(s.clone()),
    }
}

/// Tag every feature with the layer id and name.
///
/// Null properties become an object holding only the tags. Other keys are
/// left untouched.
pub fn tag_collection(collection: &mut FeatureCollection, layer_id: &LayerId, name: &str) {
    let id = id_value(layer_id);
    for feature in &mut collection.features {
        let properties = feature.properties_mut();
        properties.insert(LAYER_ID_TAG.to_string(), id.clone());
        properties.insert(LAYER_NAME_TAG.to_string(), Value::String(name.to_string()));
    }
}
