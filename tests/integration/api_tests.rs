//! HTTP API integration tests.
//!
//! These tests drive the full router with a mock catalog source and a mock
//! fetcher, checking status codes, response bodies and refresh behavior.

use std::time::Duration;

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use geodesa_layers::catalog::LayerDescriptor;
use geodesa_layers::error::{CatalogSourceError, IoError};
use geodesa_layers::pipeline::LayerPipeline;
use geodesa_layers::server::{create_router, RouterConfig};

use super::test_utils::{
    create_multi_dataset_zip, feature_collection_bytes, MockCatalogSource, MockFetcher,
};

// =============================================================================
// Helpers
// =============================================================================

fn sample_descriptors() -> Vec<LayerDescriptor> {
    vec![
        LayerDescriptor::new(1, "Rivers", "https://files.test/rivers.geojson"),
        LayerDescriptor::without_source(2, "Draft"),
        LayerDescriptor::new(3, "Parcels", "https://files.test/parcels.zip"),
        LayerDescriptor::new(4, "Gone", "https://files.test/gone.geojson"),
    ]
}

fn sample_fetcher() -> MockFetcher {
    MockFetcher::new()
        .with_file("https://files.test/rivers.geojson", feature_collection_bytes(2))
        .with_file("https://files.test/parcels.zip", create_multi_dataset_zip(&[1, 2]))
        .with_status("https://files.test/gone.geojson", 404)
}

fn test_router(source: MockCatalogSource, fetcher: MockFetcher) -> Router {
    create_router(
        source,
        LayerPipeline::new(fetcher),
        RouterConfig::new().with_tracing(false),
    )
}

async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

// =============================================================================
// Health and Catalog
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = test_router(MockCatalogSource::new(vec![]), MockFetcher::new());

    let (status, body) = send(&router, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_layers_endpoint_lists_catalog() {
    let router = test_router(MockCatalogSource::new(sample_descriptors()), sample_fetcher());

    let (status, body) = send(&router, Method::GET, "/layers").await;

    assert_eq!(status, StatusCode::OK);
    let layers = body.as_array().expect("array body");
    assert_eq!(layers.len(), 4);
    assert_eq!(layers[0]["id"], 1);
    assert_eq!(layers[0]["file_url"], "https://files.test/rivers.geojson");
    assert!(layers[1]["file_url"].is_null());
}

#[tokio::test]
async fn test_layers_endpoint_catalog_unavailable() {
    let source = MockCatalogSource::failing(CatalogSourceError::Io(IoError::Connection(
        "connection refused".to_string(),
    )));
    let router = test_router(source, MockFetcher::new());

    let (status, body) = send(&router, Method::GET, "/layers").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "catalog_unavailable");
}

// =============================================================================
// Overlays
// =============================================================================

#[tokio::test]
async fn test_overlays_endpoint_loads_on_first_request() {
    let source = MockCatalogSource::new(sample_descriptors());
    let router = test_router(source.clone(), sample_fetcher());

    let (status, body) = send(&router, Method::GET, "/overlays").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 1);

    let overlays = body["overlays"].as_array().expect("overlays array");
    assert_eq!(overlays.len(), 3);

    assert_eq!(overlays[0]["layer_id"], 1);
    assert_eq!(overlays[0]["status"], "ready");
    assert_eq!(
        overlays[0]["geometry_collection"]["features"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        overlays[0]["geometry_collection"]["features"][0]["properties"]["geodesa:layer_name"],
        "Rivers"
    );

    assert_eq!(overlays[1]["layer_id"], 3);
    assert_eq!(overlays[1]["status"], "ready");
    assert_eq!(
        overlays[1]["geometry_collection"]["features"]
            .as_array()
            .unwrap()
            .len(),
        3
    );

    assert_eq!(overlays[2]["layer_id"], 4);
    assert_eq!(overlays[2]["status"], "failed");
    assert_eq!(overlays[2]["failure"]["kind"], "FetchError");

    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_overlays_are_served_from_latest_batch() {
    let source = MockCatalogSource::new(sample_descriptors());
    let fetcher = sample_fetcher();
    let router = test_router(source.clone(), fetcher.clone());

    send(&router, Method::GET, "/overlays").await;
    let (status, body) = send(&router, Method::GET, "/overlays").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 1);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(fetcher.request_count("https://files.test/rivers.geojson").await, 1);
}

#[tokio::test]
async fn test_overlays_refresh_query_reloads() {
    let source = MockCatalogSource::new(sample_descriptors());
    let router = test_router(source.clone(), sample_fetcher());

    send(&router, Method::GET, "/overlays").await;
    source
        .set_descriptors(vec![LayerDescriptor::new(
            1,
            "Rivers",
            "https://files.test/rivers.geojson",
        )])
        .await;

    let (status, body) = send(&router, Method::GET, "/overlays?refresh=true").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 2);
    assert_eq!(body["overlays"].as_array().unwrap().len(), 1);
    assert_eq!(source.fetch_count(), 2);
}

#[tokio::test]
async fn test_overlays_catalog_timeout() {
    let source = MockCatalogSource::failing(CatalogSourceError::Io(IoError::Timeout {
        url: "https://backend.test/layers".to_string(),
        millis: 30_000,
    }));
    let router = test_router(source, MockFetcher::new());

    let (status, body) = send(&router, Method::GET, "/overlays").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"], "catalog_timeout");
    assert_eq!(body["status"], 504);
}

#[tokio::test]
async fn test_single_overlay_endpoint() {
    let router = test_router(MockCatalogSource::new(sample_descriptors()), sample_fetcher());

    let (status, body) = send(&router, Method::GET, "/overlays/3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Parcels");
    assert_eq!(body["status"], "ready");

    let (status, body) = send(&router, Method::GET, "/overlays/4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn test_single_overlay_not_found() {
    let router = test_router(MockCatalogSource::new(sample_descriptors()), sample_fetcher());

    // Layer 2 has no file, so it never produces an overlay
    let (status, body) = send(&router, Method::GET, "/overlays/2").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_endpoint_summary() {
    let router = test_router(MockCatalogSource::new(sample_descriptors()), sample_fetcher());

    let (status, body) = send(&router, Method::POST, "/overlays/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generation"], 1);
    assert_eq!(body["ready"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["stale"], false);
}

#[tokio::test]
async fn test_refresh_requires_post() {
    let router = test_router(MockCatalogSource::new(vec![]), MockFetcher::new());

    let (status, _) = send(&router, Method::GET, "/overlays/refresh").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_overlapping_refreshes_last_call_wins() {
    let source = MockCatalogSource::new(vec![LayerDescriptor::new(
        1,
        "Slow",
        "https://files.test/slow.geojson",
    )]);
    let fetcher = MockFetcher::new().with_delayed_file(
        "https://files.test/slow.geojson",
        Duration::from_millis(100),
        feature_collection_bytes(1),
    );
    let router = test_router(source, fetcher);

    let first = send(&router, Method::POST, "/overlays/refresh");
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        send(&router, Method::POST, "/overlays/refresh").await
    };
    let ((_, first_body), (_, second_body)) = tokio::join!(first, second);

    assert_eq!(first_body["generation"], 1);
    assert_eq!(first_body["stale"], true);
    assert_eq!(second_body["generation"], 2);
    assert_eq!(second_body["stale"], false);

    let (_, body) = send(&router, Method::GET, "/overlays").await;
    assert_eq!(body["generation"], 2);
}

#[tokio::test]
async fn test_cors_preflight() {
    let router = test_router(MockCatalogSource::new(vec![]), MockFetcher::new());

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/overlays")
        .header("Origin", "https://viewer.test")
        .header("Access-Control-Request-Method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
