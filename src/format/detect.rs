//! Format dispatch for layer files.
//!
//! Decides which decoder applies to a layer from its metadata alone:
//!
//! - **Shapefile archive**: declared as "Shapefile" (or "shp"/"zip"), or a `.zip` URL
//! - **GeoJSON**: declared as "GeoJSON" (or "json"), or a `.geojson` / `.json` URL
//!
//! A declared format that maps to a known decoder wins over the URL
//! extension. Unknown formats return an error that is recorded against the
//! one layer, never the whole batch.

use url::Url;

use crate::error::FormatError;

// =============================================================================
// LayerFormat
// =============================================================================

/// Decoding strategy for a layer file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerFormat {
    /// ZIP archive holding one or more Shapefile datasets
    ShapefileArchive,

    /// GeoJSON Feature or FeatureCollection
    GeoJson,
}

impl LayerFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            LayerFormat::ShapefileArchive => "Shapefile archive",
            LayerFormat::GeoJson => "GeoJSON",
        }
    }
}

// =============================================================================
// Matchers
// =============================================================================

/// One entry of the dispatch table.
struct FormatMatcher {
    format: LayerFormat,
    /// Declared format names (lowercase) that select this decoder
    declared: &'static [&'static str],
    /// File extensions (lowercase, without dot) that select this decoder
    extensions: &'static [&'static str],
}

/// Dispatch table in precedence order.
const MATCHERS: &[FormatMatcher] = &[
    FormatMatcher {
        format: LayerFormat::ShapefileArchive,
        declared: &["shapefile", "shp", "zip"],
        extensions: &["zip"],
    },
    FormatMatcher {
        format: LayerFormat::GeoJson,
        declared: &["geojson", "json"],
        extensions: &["geojson", "json"],
    },
];

/// Detect the format of a layer file.
///
/// # Arguments
/// * `source_url` - Location of the file (its extension is inspected)
/// * `declared_format` - Optional format hint from the catalog
///
/// # Returns
/// * `Ok(LayerFormat)` - The decoder to use
/// * `Err(FormatError::UnsupportedFormat)` - Nothing matched
pub fn detect_format(
    source_url: &str,
    declared_format: Option<&str>,
) -> Result<LayerFormat, FormatError> {
    if let Some(declared) = declared_format {
        let declared = declared.trim().to_ascii_lowercase();
        if let Some(m) = MATCHERS.iter().find(|m| m.declared.contains(&declared.as_str())) {
            return Ok(m.format);
        }
    }

    let extension = url_extension(source_url);
    if let Some(ref ext) = extension {
        if let Some(m) = MATCHERS.iter().find(|m| m.extensions.contains(&ext.as_str())) {
            return Ok(m.format);
        }
    }

    let reason = match (declared_format, extension) {
        (Some(declared), Some(ext)) => format!(
            "declared format '{}' and extension '.{}' of {} have no decoder",
            declared, ext, source_url
        ),
        (Some(declared), None) => format!(
            "declared format '{}' has no decoder and {} has no extension",
            declared, source_url
        ),
        (None, Some(ext)) => format!("extension '.{}' of {} has no decoder", ext, source_url),
        (None, None) => format!("no declared format and {} has no extension", source_url),
    };

    Err(FormatError::UnsupportedFormat { reason })
}

/// Extract the lowercase file extension from a URL or relative path.
///
/// Query strings and fragments are ignored.
pub fn url_extension(source_url: &str) -> Option<String> {
    let path = match Url::parse(source_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => {
            let end = source_url.find(['?', '#']).unwrap_or(source_url.len());
            source_url[..end].to_string()
        }
    };

    let file_name = path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }

    Some(ext.to_ascii_lowercase())
}

// =============================================================================
// Tests
// =============================================================================
