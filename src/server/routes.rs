//! Router configuration for the overlay API.
//!
//! # Route Structure
//!
//! ```text
//! /health                  - Health check
//! /layers                  - Layer catalog
//! /overlays                - Latest overlay batch
//! /overlays/{layer_id}     - One overlay
//! /overlays/refresh        - Reload (POST)
//! ```
//!
//! # Example
//!
//! ```ignore
//! let fetcher = HttpFetcher::new(client.clone());
//! let source = HttpCatalogSource::new(client, "https://backend.example/layers");
//! let router = create_router(source, LayerPipeline::new(fetcher), RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, layers_handler, overlay_handler, overlays_handler, refresh_handler, AppState,
};
use crate::catalog::CatalogSource;
use crate::io::ByteFetcher;
use crate::pipeline::LayerPipeline;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default CORS allows any origin and tracing is enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// # Arguments
///
/// * `catalog_source` - Where the layer catalog is read from
/// * `pipeline` - Loader for layer files
/// * `config` - Router configuration
pub fn create_router<C, F>(
    catalog_source: C,
    pipeline: LayerPipeline<F>,
    config: RouterConfig,
) -> Router
where
    C: CatalogSource + 'static,
    F: ByteFetcher + 'static,
{
    create_router_with_state(AppState::new(catalog_source, pipeline), config)
}

/// Create the application router around existing state.
///
/// Useful when the caller wants to keep a handle on the overlay board.
pub fn create_router_with_state<C, F>(app_state: AppState<C, F>, config: RouterConfig) -> Router
where
    C: CatalogSource + 'static,
    F: ByteFetcher + 'static,
{
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/layers", get(layers_handler::<C, F>))
        .route("/overlays", get(overlays_handler::<C, F>))
        .route("/overlays/refresh", post(refresh_handler::<C, F>))
        .route("/overlays/{layer_id}", get(overlay_handler::<C, F>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::HEAD, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
