//! Test utilities for integration tests.
//!
//! This module provides mock fetchers and catalog sources plus helpers that
//! build GeoJSON documents, shapefile datasets and ZIP archives in memory.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use geodesa_layers::catalog::{Catalog, CatalogSource, LayerDescriptor};
use geodesa_layers::error::{CatalogSourceError, IoError};
use geodesa_layers::io::ByteFetcher;

// =============================================================================
// Mock Fetcher with Request Tracking
// =============================================================================

/// What the mock fetcher answers for one URL.
#[derive(Clone)]
pub enum MockResponse {
    Body(Bytes),
    Status(u16),
    Delayed(Duration, Bytes),
    Hang,
}

/// A mock byte fetcher serving canned responses and counting requests.
///
/// Unknown URLs answer 404 like a real file server.
#[derive(Clone)]
pub struct MockFetcher {
    responses: Arc<HashMap<String, MockResponse>>,
    request_counts: Arc<RwLock<HashMap<String, usize>>>,
    total_requests: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(HashMap::new()),
            request_counts: Arc::new(RwLock::new(HashMap::new())),
            total_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        Arc::make_mut(&mut self.responses).insert(url.to_string(), response);
        self
    }

    pub fn with_file(self, url: &str, data: impl Into<Bytes>) -> Self {
        self.with_response(url, MockResponse::Body(data.into()))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_delayed_file(self, url: &str, delay: Duration, data: impl Into<Bytes>) -> Self {
        self.with_response(url, MockResponse::Delayed(delay, data.into()))
    }

    pub fn with_hanging(self, url: &str) -> Self {
        self.with_response(url, MockResponse::Hang)
    }

    pub async fn request_count(&self, url: &str) -> usize {
        self.request_counts
            .read()
            .await
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.total_requests.load(Ordering::SeqCst)
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, IoError> {
        self.total_requests.fetch_add(1, Ordering::SeqCst);
        {
            let mut counts = self.request_counts.write().await;
            *counts.entry(url.to_string()).or_insert(0) += 1;
        }

        match self.responses.get(url).cloned() {
            Some(MockResponse::Body(data)) => Ok(data),
            Some(MockResponse::Status(404)) | None => Err(IoError::NotFound(url.to_string())),
            Some(MockResponse::Status(status)) => Err(IoError::Status {
                url: url.to_string(),
                status,
            }),
            Some(MockResponse::Delayed(delay, data)) => {
                tokio::time::sleep(delay).await;
                Ok(data)
            }
            Some(MockResponse::Hang) => std::future::pending().await,
        }
    }

    fn identifier(&self) -> &str {
        "mock://files"
    }
}

// =============================================================================
// Mock Catalog Source
// =============================================================================

/// A catalog source whose listing can be swapped between requests.
#[derive(Clone)]
pub struct MockCatalogSource {
    listing: Arc<RwLock<Result<Catalog, CatalogSourceError>>>,
    fetch_count: Arc<AtomicUsize>,
}

impl MockCatalogSource {
    pub fn new(descriptors: Vec<LayerDescriptor>) -> Self {
        let catalog = Catalog::new(descriptors).expect("valid test catalog");
        Self {
            listing: Arc::new(RwLock::new(Ok(catalog))),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(err: CatalogSourceError) -> Self {
        Self {
            listing: Arc::new(RwLock::new(Err(err))),
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn set_descriptors(&self, descriptors: Vec<LayerDescriptor>) {
        let catalog = Catalog::new(descriptors).expect("valid test catalog");
        *self.listing.write().await = Ok(catalog);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogSourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.listing.read().await.clone()
    }

    fn identifier(&self) -> &str {
        "mock://catalog"
    }
}

// =============================================================================
// GeoJSON Builders
// =============================================================================

/// A point feature with a `n` property.
pub fn point_feature(n: usize) -> Value {
    json!({
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [-74.0 + n as f64, 4.6]},
        "properties": {"n": n}
    })
}

/// A FeatureCollection of `count` point features, serialized.
pub fn feature_collection_bytes(count: usize) -> Vec<u8> {
    let features: Vec<Value> = (0..count).map(point_feature).collect();
    serde_json::to_vec(&json!({"type": "FeatureCollection", "features": features}))
        .expect("serializable")
}

/// A single Feature document, serialized.
pub fn single_feature_bytes() -> Vec<u8> {
    serde_json::to_vec(&point_feature(0)).expect("serializable")
}

// =============================================================================
// Shapefile Builders
// =============================================================================

const SHAPE_POINT: i32 = 1;
const SHAPE_POLYGON: i32 = 5;

/// Build a `.shp` file from raw record contents.
pub fn create_shp(shape_type: i32, records: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (i, content) in records.iter().enumerate() {
        body.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        body.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        body.extend_from_slice(content);
    }

    let mut data = vec![0u8; 100];
    data[0..4].copy_from_slice(&9994i32.to_be_bytes());
    data[24..28].copy_from_slice(&(((100 + body.len()) / 2) as i32).to_be_bytes());
    data[28..32].copy_from_slice(&1000i32.to_le_bytes());
    data[32..36].copy_from_slice(&shape_type.to_le_bytes());
    data.extend(body);
    data
}

/// A `.shp` file holding `count` points.
pub fn create_point_shp(count: usize) -> Vec<u8> {
    let records: Vec<Vec<u8>> = (0..count)
        .map(|i| {
            let mut content = SHAPE_POINT.to_le_bytes().to_vec();
            content.extend_from_slice(&(i as f64).to_le_bytes());
            content.extend_from_slice(&(i as f64 * 2.0).to_le_bytes());
            content
        })
        .collect();
    create_shp(SHAPE_POINT, &records)
}

/// A `.shp` file holding one polygon with the given rings.
pub fn create_polygon_shp(rings: &[Vec<[f64; 2]>]) -> Vec<u8> {
    let num_points: usize = rings.iter().map(Vec::len).sum();

    let mut content = SHAPE_POLYGON.to_le_bytes().to_vec();
    content.extend_from_slice(&[0u8; 32]);
    content.extend_from_slice(&(rings.len() as i32).to_le_bytes());
    content.extend_from_slice(&(num_points as i32).to_le_bytes());
    let mut start = 0i32;
    for ring in rings {
        content.extend_from_slice(&start.to_le_bytes());
        start += ring.len() as i32;
    }
    for [x, y] in rings.iter().flatten() {
        content.extend_from_slice(&x.to_le_bytes());
        content.extend_from_slice(&y.to_le_bytes());
    }

    create_shp(SHAPE_POLYGON, &[content])
}

/// A `.dbf` file with one character column holding `names`.
pub fn create_name_dbf(column: &str, width: u8, names: &[&str]) -> Vec<u8> {
    let header_len: u16 = 32 + 32 + 1;
    let record_len: u16 = 1 + width as u16;

    let mut data = vec![0u8; 32];
    data[0] = 0x03;
    data[4..8].copy_from_slice(&(names.len() as u32).to_le_bytes());
    data[8..10].copy_from_slice(&header_len.to_le_bytes());
    data[10..12].copy_from_slice(&record_len.to_le_bytes());

    let mut field = [0u8; 32];
    field[..column.len()].copy_from_slice(column.as_bytes());
    field[11] = b'C';
    field[16] = width;
    data.extend_from_slice(&field);
    data.push(0x0D);

    for name in names {
        data.push(b' ');
        let mut cell = vec![b' '; width as usize];
        cell[..name.len()].copy_from_slice(name.as_bytes());
        data.extend(cell);
    }
    data.push(0x1A);
    data
}

// =============================================================================
// Archive Builders
// =============================================================================

/// Build a ZIP archive from (path, content) pairs, in order.
pub fn create_zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in entries {
        writer
            .start_file(*path, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// An archive with one point dataset per entry of `counts`.
pub fn create_multi_dataset_zip(counts: &[usize]) -> Vec<u8> {
    let files: Vec<(String, Vec<u8>)> = counts
        .iter()
        .enumerate()
        .flat_map(|(i, &count)| {
            let names: Vec<String> = (0..count).map(|j| format!("d{}-{}", i, j)).collect();
            let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
            vec![
                (format!("dataset{}.shp", i), create_point_shp(count)),
                (format!("dataset{}.dbf", i), create_name_dbf("NAME", 12, &name_refs)),
            ]
        })
        .collect();

    let entries: Vec<(&str, Vec<u8>)> = files
        .iter()
        .map(|(path, data)| (path.as_str(), data.clone()))
        .collect();
    create_zip(&entries)
}
