//! Decoded overlay records returned by the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{LayerDescriptor, LayerId};
use crate::error::{DecodeError, FormatError, IoError};
use crate::format::FeatureCollection;

// =============================================================================
// Failures
// =============================================================================

/// Class of a per-layer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// The layer file could not be downloaded
    FetchError,

    /// No decoder matches the declared format or URL extension
    UnsupportedFormat,

    /// The file was fetched but its content could not be decoded
    DecodeError,
}

impl FailureKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FailureKind::FetchError => "FetchError",
            FailureKind::UnsupportedFormat => "UnsupportedFormat",
            FailureKind::DecodeError => "DecodeError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a layer failed, with enough detail to show in a layer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl LayerFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for LayerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl From<IoError> for LayerFailure {
    fn from(err: IoError) -> Self {
        LayerFailure::new(FailureKind::FetchError, err.to_string())
    }
}

impl From<FormatError> for LayerFailure {
    fn from(err: FormatError) -> Self {
        LayerFailure::new(FailureKind::UnsupportedFormat, err.to_string())
    }
}

impl From<DecodeError> for LayerFailure {
    fn from(err: DecodeError) -> Self {
        LayerFailure::new(FailureKind::DecodeError, err.to_string())
    }
}

// =============================================================================
// DecodedOverlay
// =============================================================================

/// Outcome of loading one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OverlayStatus {
    Ready {
        geometry_collection: FeatureCollection,
    },
    Failed {
        failure: LayerFailure,
    },
}

/// One renderable overlay, produced for every descriptor that has a source.
///
/// Serializes flat, e.g.
/// `{"layer_id": 7, "name": "Rivers", "status": "ready", "geometry_collection": {...}}`
/// or `{"layer_id": 7, "name": "Rivers", "status": "failed", "failure": {"kind": "FetchError", ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedOverlay {
    pub layer_id: LayerId,
    pub name: String,

    #[serde(flatten)]
    pub status: OverlayStatus,
}

impl DecodedOverlay {
    /// A successfully decoded overlay.
    pub fn ready(descriptor: &LayerDescriptor, collection: FeatureCollection) -> Self {
        Self {
            layer_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            status: OverlayStatus::Ready {
                geometry_collection: collection,
            },
        }
    }

    /// An overlay that failed to load.
    pub fn failed(descriptor: &LayerDescriptor, failure: LayerFailure) -> Self {
        Self {
            layer_id: descriptor.id.clone(),
            name: descriptor.name.clone(),
            status: OverlayStatus::Failed { failure },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, OverlayStatus::Ready { .. })
    }

    /// The feature collection, if the overlay is ready.
    pub fn collection(&self) -> Option<&FeatureCollection> {
        match &self.status {
            OverlayStatus::Ready {
                geometry_collection,
            } => Some(geometry_collection),
            OverlayStatus::Failed { .. } => None,
        }
    }

    /// The failure, if the overlay failed.
    pub fn failure(&self) -> Option<&LayerFailure> {
        match &self.status {
            OverlayStatus::Failed { failure } => Some(failure),
            OverlayStatus::Ready { .. } => None,
        }
    }

    /// Number of features (0 for failed overlays).
    pub fn feature_count(&self) -> usize {
        self.collection().map_or(0, FeatureCollection::len)
    }
}

// =============================================================================
// Tests
// =============================================================================
