//! Integration tests for the layer decoders.
//!
//! These tests exercise format detection and the public decode functions
//! directly, without a fetcher.

use serde_json::json;

use geodesa_layers::format::{
    decode_geojson, decode_shapefile_archive, detect_format, read_archive, ArchiveContents,
    LayerFormat,
};
use geodesa_layers::{DecodeError, FormatError};

use super::test_utils::{
    create_multi_dataset_zip, create_name_dbf, create_point_shp, create_zip,
    feature_collection_bytes,
};

// =============================================================================
// Format Detection
// =============================================================================

#[test]
fn test_detect_by_extension() {
    assert_eq!(
        detect_format("https://files.test/roads.geojson", None).unwrap(),
        LayerFormat::GeoJson
    );
    assert_eq!(
        detect_format("https://files.test/roads.ZIP?token=x", None).unwrap(),
        LayerFormat::ShapefileArchive
    );
    assert_eq!(
        detect_format("media/layers/roads.json", None).unwrap(),
        LayerFormat::GeoJson
    );
}

#[test]
fn test_declared_format_is_case_insensitive() {
    assert_eq!(
        detect_format("https://files.test/blob", Some("SHAPEFILE")).unwrap(),
        LayerFormat::ShapefileArchive
    );
    assert_eq!(
        detect_format("https://files.test/blob.zip", Some("geojson")).unwrap(),
        LayerFormat::GeoJson
    );
}

#[test]
fn test_unknown_declared_format_falls_back_to_extension() {
    assert_eq!(
        detect_format("https://files.test/a.zip", Some("Vector")).unwrap(),
        LayerFormat::ShapefileArchive
    );
}

#[test]
fn test_unsupported_format() {
    let err = detect_format("https://files.test/a.gpkg", None).unwrap_err();
    assert!(matches!(err, FormatError::UnsupportedFormat { .. }));

    let err = detect_format("https://files.test/noext", Some("KML")).unwrap_err();
    assert!(err.to_string().contains("KML"));
}

// =============================================================================
// GeoJSON
// =============================================================================

#[test]
fn test_decode_geojson_collection() {
    let collection = decode_geojson(&feature_collection_bytes(4)).unwrap();
    assert_eq!(collection.len(), 4);
}

#[test]
fn test_decode_geojson_rejects_bare_geometry() {
    let bytes = serde_json::to_vec(&json!({"type": "Point", "coordinates": [0.0, 0.0]})).unwrap();
    let err = decode_geojson(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::UnexpectedType(ref t) if t == "Point"));
}

#[test]
fn test_decode_geojson_requires_type_tag() {
    let bytes = serde_json::to_vec(&json!({"features": []})).unwrap();
    assert!(matches!(
        decode_geojson(&bytes).unwrap_err(),
        DecodeError::MissingTypeTag
    ));
}

#[test]
fn test_decode_geojson_empty_collection() {
    let bytes = serde_json::to_vec(&json!({"type": "FeatureCollection", "features": []})).unwrap();
    assert!(decode_geojson(&bytes).unwrap().is_empty());
}

// =============================================================================
// Shapefile Archives
// =============================================================================

#[test]
fn test_read_archive_reports_dataset_count() {
    let contents = read_archive(&create_multi_dataset_zip(&[1, 2])).unwrap();
    assert_eq!(contents.dataset_count(), 2);
    assert!(matches!(contents, ArchiveContents::Many(_)));
    assert_eq!(contents.into_collection().len(), 3);
}

#[test]
fn test_archive_in_subdirectory() {
    let archive = create_zip(&[
        ("export/towns.shp", create_point_shp(2)),
        ("export/towns.dbf", create_name_dbf("TOWN", 10, &["Tunja", "Pasto"])),
        ("__MACOSX/export/._towns.shp", vec![0u8; 16]),
    ]);

    let collection = decode_shapefile_archive(&archive).unwrap();
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.features[1].property("TOWN"), Some(&json!("Pasto")));
}

#[test]
fn test_archive_with_geojson_member() {
    let archive = create_zip(&[
        ("points.shp", create_point_shp(1)),
        ("extra.geojson", feature_collection_bytes(2)),
    ]);

    let collection = decode_shapefile_archive(&archive).unwrap();
    assert_eq!(collection.len(), 3);
}

#[test]
fn test_not_a_zip() {
    let err = decode_shapefile_archive(b"definitely not a zip").unwrap_err();
    assert!(matches!(err, DecodeError::Archive(_)));
}

#[test]
fn test_corrupt_shp_member() {
    let archive = create_zip(&[("broken.shp", vec![0u8; 20])]);
    let err = decode_shapefile_archive(&archive).unwrap_err();
    assert!(matches!(err, DecodeError::Shapefile { ref dataset, .. } if dataset == "broken"));
}
