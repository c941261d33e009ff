//! Layer file decoders.
//!
//! Every supported format decodes into the same [`geojson::FeatureCollection`]
//! model. Dispatch happens in [`detect::detect_format`] from the layer's
//! metadata alone:
//!
//! - **Shapefile archive**: ZIP with one or more `.shp`/`.dbf` datasets
//! - **GeoJSON**: a single Feature or a FeatureCollection

pub mod detect;
pub mod geojson;
pub mod shapefile;

pub use detect::{detect_format, url_extension, LayerFormat};
pub use geojson::{
    decode_geojson, merge_collections, parse_geojson, Feature, FeatureCollection, GeoJson,
    Geometry, Position, Properties,
};
pub use shapefile::{decode_shapefile_archive, read_archive, ArchiveContents};
