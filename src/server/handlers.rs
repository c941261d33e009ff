//! HTTP request handlers for the overlay API.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /layers` - Current layer catalog
//! - `GET /overlays` - Latest overlay batch (`?refresh=true` reloads first)
//! - `GET /overlays/{layer_id}` - One overlay from the latest batch
//! - `POST /overlays/refresh` - Reload and return a summary

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::CatalogSource;
use crate::error::{CatalogSourceError, IoError, PipelineError};
use crate::io::ByteFetcher;
use crate::pipeline::LayerPipeline;

use super::board::{OverlayBoard, OverlaySnapshot};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<C, F> {
    /// Where the layer catalog comes from
    pub catalog_source: Arc<C>,

    /// Stateless loader for layer files
    pub pipeline: Arc<LayerPipeline<F>>,

    /// Latest published overlays
    pub board: OverlayBoard,
}

impl<C: CatalogSource, F: ByteFetcher> AppState<C, F> {
    pub fn new(catalog_source: C, pipeline: LayerPipeline<F>) -> Self {
        Self {
            catalog_source: Arc::new(catalog_source),
            pipeline: Arc::new(pipeline),
            board: OverlayBoard::new(),
        }
    }
}

impl<C, F> Clone for AppState<C, F> {
    fn clone(&self) -> Self {
        Self {
            catalog_source: Arc::clone(&self.catalog_source),
            pipeline: Arc::clone(&self.pipeline),
            board: self.board.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for the overlays endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct OverlaysQueryParams {
    /// Reload the catalog and all layers before answering
    #[serde(default)]
    pub refresh: bool,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "catalog_unavailable")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Summary returned by a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshResponse {
    /// Generation of this reload
    pub generation: u64,

    /// Overlays that decoded successfully
    pub ready: usize,

    /// Overlays that failed
    pub failed: usize,

    /// True when a newer reload started first and this result was dropped
    pub stale: bool,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Errors surfaced by the overlay API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The catalog could not be fetched or parsed
    #[error(transparent)]
    Catalog(#[from] CatalogSourceError),

    /// The pipeline rejected the catalog
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    /// No overlay with this id in the latest batch
    #[error("Layer not found: {0}")]
    LayerNotFound(String),
}

/// Convert ApiError to HTTP response.
///
/// Upstream catalog problems map to 502/504, unknown layers to 404. Errors
/// are logged by severity: 5xx at ERROR, 404 at DEBUG, other 4xx at WARN.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ApiError::Catalog(CatalogSourceError::Io(IoError::Timeout { .. })) => {
                (StatusCode::GATEWAY_TIMEOUT, "catalog_timeout")
            }
            ApiError::Catalog(CatalogSourceError::Io(_)) => {
                (StatusCode::BAD_GATEWAY, "catalog_unavailable")
            }
            ApiError::Catalog(CatalogSourceError::Invalid(_)) | ApiError::Pipeline(_) => {
                (StatusCode::BAD_GATEWAY, "invalid_catalog")
            }
            ApiError::LayerNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Fetch the catalog, load every layer and publish if still the newest load.
async fn reload<C, F>(state: &AppState<C, F>) -> Result<RefreshResponse, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    let ticket = state.board.begin();
    let catalog = state.catalog_source.fetch_catalog().await?;

    debug!(
        generation = ticket.generation(),
        source = state.catalog_source.identifier(),
        layers = catalog.len(),
        "Reloading overlays"
    );

    let overlays = state
        .pipeline
        .load_latest(catalog.descriptors(), &ticket)
        .await?;

    let (ready, failed, stale) = match overlays {
        Some(overlays) => {
            let ready = overlays.iter().filter(|o| o.is_ready()).count();
            let failed = overlays.len() - ready;
            let published = state.board.publish(&ticket, overlays).await;
            (ready, failed, !published)
        }
        None => (0, 0, true),
    };

    if stale {
        info!(
            generation = ticket.generation(),
            "Reload superseded by a newer one"
        );
    }

    Ok(RefreshResponse {
        generation: ticket.generation(),
        ready,
        failed,
        stale,
    })
}

/// Get the latest snapshot, loading one if nothing was published yet.
async fn latest_or_load<C, F>(
    state: &AppState<C, F>,
    refresh: bool,
) -> Result<Arc<OverlaySnapshot>, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    if !refresh {
        if let Some(snapshot) = state.board.latest().await {
            return Ok(snapshot);
        }
    }

    reload(state).await?;

    // A stale reload publishes nothing; serve whatever is newest
    Ok(state.board.latest().await.unwrap_or_else(|| {
        Arc::new(OverlaySnapshot {
            generation: 0,
            overlays: Vec::new(),
        })
    }))
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle catalog requests.
///
/// # Endpoint
///
/// `GET /layers`
///
/// # Response
///
/// - `200 OK`: the catalog as a JSON array of descriptors
/// - `502 Bad Gateway`: the catalog source failed or returned an invalid listing
pub async fn layers_handler<C, F>(
    State(state): State<AppState<C, F>>,
) -> Result<Response, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    let catalog = state.catalog_source.fetch_catalog().await?;
    Ok(Json(&catalog).into_response())
}

/// Handle overlay batch requests.
///
/// # Endpoint
///
/// `GET /overlays[?refresh=true]`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "generation": 3,
///   "overlays": [
///     {"layer_id": 1, "name": "Rivers", "status": "ready", "geometry_collection": {...}},
///     {"layer_id": 2, "name": "Parks", "status": "failed", "failure": {"kind": "FetchError", "detail": "..."}}
///   ]
/// }
/// ```
pub async fn overlays_handler<C, F>(
    State(state): State<AppState<C, F>>,
    Query(query): Query<OverlaysQueryParams>,
) -> Result<Response, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    let snapshot = latest_or_load(&state, query.refresh).await?;
    Ok(Json(snapshot.as_ref()).into_response())
}

/// Handle single overlay requests.
///
/// # Endpoint
///
/// `GET /overlays/{layer_id}`
///
/// # Response
///
/// - `200 OK`: the overlay (ready or failed)
/// - `404 Not Found`: no overlay with this id in the latest batch
pub async fn overlay_handler<C, F>(
    State(state): State<AppState<C, F>>,
    Path(layer_id): Path<String>,
) -> Result<Response, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    let snapshot = latest_or_load(&state, false).await?;
    let overlay = snapshot
        .find(&layer_id)
        .ok_or_else(|| ApiError::LayerNotFound(layer_id.clone()))?;
    Ok(Json(overlay).into_response())
}

/// Handle refresh requests.
///
/// # Endpoint
///
/// `POST /overlays/refresh`
///
/// # Response
///
/// `200 OK` with a [`RefreshResponse`] summary. `stale: true` means a newer
/// refresh started while this one was loading and its result was dropped.
pub async fn refresh_handler<C, F>(
    State(state): State<AppState<C, F>>,
) -> Result<Json<RefreshResponse>, ApiError>
where
    C: CatalogSource,
    F: ByteFetcher,
{
    let summary = reload(&state).await?;
    Ok(Json(summary))
}

// =============================================================================
// Tests
// =============================================================================
