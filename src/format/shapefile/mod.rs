//! Shapefile archive decoding.
//!
//! Uploaded Shapefile layers arrive as ZIP archives holding one or more
//! datasets (`.shp` geometry + `.dbf` attributes, optional `.cpg` and `.prj`).
//! Every dataset is decoded into a feature collection and all of them are
//! merged into one collection, so an archive always maps to one overlay.

pub mod archive;
pub mod dbf;
pub mod shp;

pub use archive::{read_archive, ArchiveContents};
pub use dbf::{DbfField, DbfHeader, TextEncoding};
pub use shp::{read_shapes, ShapeType, ShpHeader};

use crate::error::DecodeError;
use crate::format::geojson::FeatureCollection;

/// Decode a Shapefile ZIP archive into a single feature collection.
pub fn decode_shapefile_archive(bytes: &[u8]) -> Result<FeatureCollection, DecodeError> {
    read_archive(bytes).map(ArchiveContents::into_collection)
}
