//! HTTP surface for the map viewer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │        GET /layers   GET /overlays   POST /overlays/refresh     │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │    board    │  │        routes           │  │
//! │  │ (requests)  │  │ (snapshot)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod board;
pub mod handlers;
pub mod routes;

pub use board::{OverlayBoard, OverlaySnapshot};
pub use handlers::{
    health_handler, layers_handler, overlay_handler, overlays_handler, refresh_handler, ApiError,
    AppState, ErrorResponse, HealthResponse, OverlaysQueryParams, RefreshResponse,
};
pub use routes::{create_router, create_router_with_state, RouterConfig};
