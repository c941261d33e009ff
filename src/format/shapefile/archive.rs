//! ZIP archive reader: splits an uploaded archive into datasets and decodes each.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use tracing::{debug, warn};
use zip::ZipArchive;

use super::dbf::{read_table, TextEncoding};
use super::shp::read_shapes;
use crate::error::{DecodeError, ShapefileError};
use crate::format::geojson::{merge_collections, parse_geojson, Feature, FeatureCollection, GeoJson};

// =============================================================================
// ArchiveContents
// =============================================================================

/// What an archive decodes to before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveContents {
    /// Exactly one dataset producing a collection
    Collection(FeatureCollection),

    /// Exactly one member holding a bare feature
    Feature(Feature),

    /// Several datasets, in archive order
    Many(Vec<GeoJson>),
}

impl ArchiveContents {
    /// Flatten into the single canonical collection.
    ///
    /// Collections are concatenated and bare features become one-element
    /// collections, so every archive yields exactly one overlay.
    pub fn into_collection(self) -> FeatureCollection {
        match self {
            ArchiveContents::Collection(collection) => collection,
            ArchiveContents::Feature(feature) => feature.into(),
            ArchiveContents::Many(parts) => merge_collections(parts),
        }
    }

    /// Number of datasets found in the archive.
    pub fn dataset_count(&self) -> usize {
        match self {
            ArchiveContents::Collection(_) | ArchiveContents::Feature(_) => 1,
            ArchiveContents::Many(parts) => parts.len(),
        }
    }
}

// =============================================================================
// Datasets
// =============================================================================

/// The sibling files of one shapefile dataset.
#[derive(Debug, Default)]
struct ShapefileDataset {
    name: String,
    shp: Option<Vec<u8>>,
    dbf: Option<Vec<u8>>,
    cpg: Option<String>,
    prj: Option<String>,
}

/// A member that contributes features, in archive order.
enum Member {
    Shapefile(String),
    GeoJson { name: String, bytes: Vec<u8> },
}

/// Check whether an archive entry is metadata to skip.
fn is_ignored_entry(path: &str) -> bool {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    path.starts_with("__MACOSX/") || file_name.starts_with("._") || file_name.is_empty()
}

/// Largest decompressed size accepted for a single archive member.
pub const MAX_MEMBER_BYTES: u64 = 512 * 1024 * 1024;

fn zip_error(err: impl std::fmt::Display) -> DecodeError {
    DecodeError::Archive(err.to_string())
}

/// Read one member into memory, refusing to grow past `limit` bytes.
///
/// The size declared in the archive header is not trusted for allocation.
fn read_member(entry: impl Read, path: &str, limit: u64) -> Result<Vec<u8>, DecodeError> {
    let mut content = Vec::new();
    entry
        .take(limit.saturating_add(1))
        .read_to_end(&mut content)
        .map_err(zip_error)?;

    if content.len() as u64 > limit {
        return Err(DecodeError::Archive(format!(
            "member {} exceeds {} bytes when decompressed",
            path, limit
        )));
    }
    Ok(content)
}

/// Check whether a JSON member is meant as layer content.
///
/// `.json` files in an archive are often plain metadata; those are skipped
/// instead of failing the layer. `.geojson` members are always decoded.
fn is_metadata_json(path: &str, err: &DecodeError) -> bool {
    path.to_ascii_lowercase().ends_with(".json")
        && matches!(
            err,
            DecodeError::MissingTypeTag | DecodeError::UnexpectedType(_)
        )
}

/// Read a ZIP archive and decode every dataset inside it.
///
/// # Errors
/// * `DecodeError::Archive` - the container is corrupt or a member is too large
/// * `DecodeError::NoDatasets` - no `.shp`, `.geojson` or `.json` members
/// * `DecodeError::Shapefile` - a dataset failed to parse
pub fn read_archive(bytes: &[u8]) -> Result<ArchiveContents, DecodeError> {
    read_archive_with_limit(bytes, MAX_MEMBER_BYTES)
}

fn read_archive_with_limit(bytes: &[u8], member_limit: u64) -> Result<ArchiveContents, DecodeError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(zip_error)?;

    let mut members: Vec<Member> = Vec::new();
    let mut datasets: HashMap<String, ShapefileDataset> = HashMap::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(zip_error)?;
        if entry.is_dir() {
            continue;
        }

        let path = entry.name().to_string();
        if is_ignored_entry(&path) {
            continue;
        }

        let Some((stem, ext)) = path.rsplit_once('.') else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if !matches!(ext.as_str(), "shp" | "dbf" | "cpg" | "prj" | "geojson" | "json") {
            continue;
        }

        let content = read_member(&mut entry, &path, member_limit)?;

        if ext == "geojson" || ext == "json" {
            members.push(Member::GeoJson {
                name: path,
                bytes: content,
            });
            continue;
        }

        let key = stem.to_ascii_lowercase();
        let dataset = datasets.entry(key.clone()).or_insert_with(|| ShapefileDataset {
            name: stem.rsplit('/').next().unwrap_or(stem).to_string(),
            ..Default::default()
        });

        match ext.as_str() {
            "shp" => {
                dataset.shp = Some(content);
                members.push(Member::Shapefile(key));
            }
            "dbf" => dataset.dbf = Some(content),
            "cpg" => dataset.cpg = Some(String::from_utf8_lossy(&content).into_owned()),
            "prj" => dataset.prj = Some(String::from_utf8_lossy(&content).into_owned()),
            _ => {}
        }
    }

    let mut parts = Vec::with_capacity(members.len());
    for member in members {
        match member {
            Member::Shapefile(key) => {
                if let Some(dataset) = datasets.remove(&key) {
                    parts.push(GeoJson::FeatureCollection(decode_dataset(dataset)?));
                }
            }
            Member::GeoJson { name, bytes } => {
                debug!(member = %name, "Decoding GeoJSON archive member");
                match parse_geojson(&bytes) {
                    Ok(part) => parts.push(part),
                    Err(err) if is_metadata_json(&name, &err) => {
                        warn!(member = %name, error = %err, "Skipping non-GeoJSON archive member");
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    match parts.len() {
        0 => Err(DecodeError::NoDatasets),
        1 => Ok(match parts.pop() {
            Some(GeoJson::Feature(feature)) => ArchiveContents::Feature(feature),
            Some(GeoJson::FeatureCollection(collection)) => ArchiveContents::Collection(collection),
            None => return Err(DecodeError::NoDatasets),
        }),
        _ => Ok(ArchiveContents::Many(parts)),
    }
}

/// Decode one shapefile dataset into a collection.
fn decode_dataset(dataset: ShapefileDataset) -> Result<FeatureCollection, DecodeError> {
    let name = dataset.name;
    let wrap = |source: ShapefileError| DecodeError::Shapefile {
        dataset: name.clone(),
        source,
    };

    let shp = dataset.shp.unwrap_or_default();
    let shapes = read_shapes(&shp).map_err(wrap)?;

    let encoding = match dataset.cpg.as_deref() {
        None => TextEncoding::default(),
        Some(cpg) => TextEncoding::from_cpg(cpg).unwrap_or_else(|| {
            warn!(
                dataset = %name,
                code_page = cpg.trim(),
                "Unrecognized code page, decoding attributes as UTF-8"
            );
            TextEncoding::default()
        }),
    };

    let rows = match dataset.dbf.as_deref() {
        Some(dbf) => read_table(dbf, encoding).map_err(wrap)?,
        None => {
            debug!(dataset = %name, "Dataset has no .dbf, features get empty properties");
            Vec::new()
        }
    };

    if dataset.dbf.is_some() && rows.len() != shapes.len() {
        warn!(
            dataset = %name,
            shapes = shapes.len(),
            rows = rows.len(),
            "Shape and attribute counts differ"
        );
    }

    if let Some(prj) = dataset.prj.as_deref() {
        if !prj.trim_start().to_ascii_uppercase().starts_with("GEOGCS") {
            warn!(
                dataset = %name,
                "Dataset uses a projected coordinate system, coordinates are not reprojected"
            );
        }
    }

    let mut rows = rows.into_iter();
    let features = shapes
        .into_iter()
        .map(|geometry| Feature::new(geometry, rows.next().unwrap_or_default()))
        .collect();

    Ok(FeatureCollection::new(features))
}

// =============================================================================
// Tests
// =============================================================================
