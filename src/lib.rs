//! # GEODESA Layers
//!
//! Loads the geospatial layers users upload to GEODESA and turns each one
//! into a single feature collection the map viewer can render.
//!
//! A layer catalog lists every uploaded layer with the URL of its raw file.
//! For each entry the pipeline fetches the file, picks a decoder from the
//! declared format or the URL extension, decodes it, and tags every feature
//! with the layer it came from.
//!
//! ## Features
//!
//! - **Shapefile archives**: ZIP files with one or more `.shp`/`.dbf` datasets, merged into one collection
//! - **GeoJSON**: Feature or FeatureCollection documents
//! - **Failure isolation**: a broken layer becomes a failed overlay, the rest still load
//! - **Ordered output**: overlays come back in catalog order even when loaded concurrently
//! - **Last-call-wins**: load tickets let callers drop results of superseded loads
//!
//! ## Architecture
//!
//! - [`io`] - Byte fetching over HTTP
//! - [`catalog`] - Layer descriptors and catalog sources
//! - [`mod@format`] - Format dispatch, GeoJSON and Shapefile decoders
//! - [`pipeline`] - Batch orchestrator and overlay types
//! - [`server`] - Axum-based HTTP API
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use geodesa_layers::{create_http_client, HttpFetcher, LayerDescriptor, LayerPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = create_http_client(None)?;
//!     let pipeline = LayerPipeline::new(HttpFetcher::new(client));
//!
//!     let descriptors = vec![
//!         LayerDescriptor::new(1, "Rivers", "https://files.example.com/rivers.zip"),
//!         LayerDescriptor::new(2, "Parks", "https://files.example.com/parks.geojson"),
//!     ];
//!
//!     for overlay in pipeline.load_all(&descriptors).await? {
//!         println!("{}: {} features", overlay.name, overlay.feature_count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod pipeline;
pub mod server;

// Re-export commonly used types
pub use catalog::{
    validate_descriptors, Catalog, CatalogSource, FileCatalogSource, HttpCatalogSource,
    LayerDescriptor, LayerId,
};
pub use config::{Cli, Command, LoadConfig, OutputFormat, PipelineArgs, ServeConfig};
pub use error::{
    CatalogError, CatalogSourceError, DecodeError, FormatError, IoError, PipelineError,
    ShapefileError,
};
pub use format::{
    decode_geojson, decode_shapefile_archive, detect_format, Feature, FeatureCollection, GeoJson,
    Geometry, LayerFormat,
};
pub use io::{create_http_client, ByteFetcher, HttpFetcher};
pub use pipeline::{
    DecodedOverlay, FailureKind, LayerFailure, LayerPipeline, LoadGeneration, LoadTicket,
    OverlayStatus, PipelineOptions, LAYER_ID_TAG, LAYER_NAME_TAG,
};
pub use server::{
    create_router, create_router_with_state, health_handler, AppState, ErrorResponse,
    HealthResponse, OverlayBoard, RefreshResponse, RouterConfig,
};
