//! Batch orchestrator: turns a catalog into an ordered list of overlays.
//!
//! ```text
//! descriptor ──► fetch ──► detect format ──► decode ──► tag ──► DecodedOverlay
//!                  │            │               │
//!                  └────────────┴───────────────┴──► Failed { kind, detail }
//! ```
//!
//! Every descriptor runs through its own isolated pipeline. A failure at any
//! step becomes a `Failed` overlay for that descriptor only; the batch call
//! itself only fails when the catalog argument is malformed.

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::generation::LoadTicket;
use super::overlay::{DecodedOverlay, LayerFailure};
use super::tag::tag_collection;
use crate::catalog::{validate_descriptors, Catalog, LayerDescriptor};
use crate::error::{DecodeError, IoError, PipelineError};
use crate::format::{
    decode_geojson, decode_shapefile_archive, detect_format, FeatureCollection, LayerFormat,
};
use crate::io::ByteFetcher;

/// Default number of layers fetched and decoded at the same time.
pub const DEFAULT_CONCURRENCY: usize = 8;

// =============================================================================
// Options
// =============================================================================

/// Tuning knobs for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum layers in flight at once (values below 1 are treated as 1)
    pub concurrency: usize,

    /// Deadline for a single fetch; None relies on the fetcher's own limits
    pub fetch_timeout: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: None,
        }
    }
}

impl PipelineOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

// =============================================================================
// LayerPipeline
// =============================================================================

/// Loads layer files and decodes them into overlays.
///
/// The pipeline holds no state between calls. Storing results (and dropping
/// stale ones) is left to the caller, see [`LoadTicket`].
///
/// # Type Parameters
///
/// * `F` - The byte fetcher used to download layer files
///
/// # Example
///
/// ```ignore
/// let pipeline = LayerPipeline::new(HttpFetcher::new(client));
/// let overlays = pipeline.load_catalog(&catalog).await;
/// for overlay in &overlays {
///     println!("{}: {}", overlay.name, overlay.feature_count());
/// }
/// ```
pub struct LayerPipeline<F> {
    fetcher: F,
    options: PipelineOptions,
}

impl<F: ByteFetcher> LayerPipeline<F> {
    /// Create a pipeline with default options.
    pub fn new(fetcher: F) -> Self {
        Self::with_options(fetcher, PipelineOptions::default())
    }

    pub fn with_options(fetcher: F, options: PipelineOptions) -> Self {
        Self { fetcher, options }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn concurrency(&self) -> usize {
        self.options.concurrency.max(1)
    }

    /// Load every descriptor that has a source URL.
    ///
    /// Output is in input order, one overlay per descriptor with a source.
    /// Descriptors without a source are skipped.
    ///
    /// # Errors
    /// `PipelineError::InvalidInput` if ids are empty or duplicated. No
    /// per-layer failure is ever returned as an error.
    pub async fn load_all(
        &self,
        descriptors: &[LayerDescriptor],
    ) -> Result<Vec<DecodedOverlay>, PipelineError> {
        validate_descriptors(descriptors)?;
        Ok(self.run(descriptors).await)
    }

    /// Load an already validated catalog.
    pub async fn load_catalog(&self, catalog: &Catalog) -> Vec<DecodedOverlay> {
        self.run(catalog.descriptors()).await
    }

    /// Parse a raw JSON catalog and load it.
    pub async fn load_json(&self, catalog: &Value) -> Result<Vec<DecodedOverlay>, PipelineError> {
        let catalog = Catalog::from_json(catalog)?;
        Ok(self.load_catalog(&catalog).await)
    }

    /// Load a single layer. Returns None when the descriptor has no source.
    pub async fn load_one(&self, descriptor: &LayerDescriptor) -> Option<DecodedOverlay> {
        let url = descriptor.source()?;
        Some(self.process(descriptor, url).await)
    }

    /// Load layers and yield each overlay as soon as it is ready.
    ///
    /// Items are `(index, overlay)` where `index` is the descriptor's position
    /// in `descriptors`. Completion order is not input order, so a slow fetch
    /// never holds back layers that already finished.
    pub fn load_stream<'a>(
        &'a self,
        descriptors: &'a [LayerDescriptor],
    ) -> impl Stream<Item = (usize, DecodedOverlay)> + 'a {
        let mut jobs = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            if let Some(url) = descriptor.source() {
                jobs.push(async move { (index, self.process(descriptor, url).await) });
            }
        }

        stream::iter(jobs).buffer_unordered(self.concurrency())
    }

    /// Load layers for `ticket`, returning None if the ticket went stale.
    ///
    /// The check runs after the batch completes, so results of a load that
    /// was superseded while in flight are never handed out.
    pub async fn load_latest(
        &self,
        descriptors: &[LayerDescriptor],
        ticket: &LoadTicket,
    ) -> Result<Option<Vec<DecodedOverlay>>, PipelineError> {
        let overlays = self.load_all(descriptors).await?;

        if !ticket.is_current() {
            debug!(
                generation = ticket.generation(),
                "Discarding results of superseded load"
            );
            return Ok(None);
        }

        Ok(Some(overlays))
    }

    /// Run all descriptors with bounded concurrency, keeping input order.
    async fn run(&self, descriptors: &[LayerDescriptor]) -> Vec<DecodedOverlay> {
        let started = Instant::now();

        let mut jobs = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if let Some(url) = descriptor.source() {
                jobs.push(self.process(descriptor, url));
            }
        }

        let overlays: Vec<DecodedOverlay> = stream::iter(jobs)
            .buffered(self.concurrency())
            .collect()
            .await;

        let ready = overlays.iter().filter(|o| o.is_ready()).count();
        info!(
            descriptors = descriptors.len(),
            ready = ready,
            failed = overlays.len() - ready,
            skipped = descriptors.len() - overlays.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Layer batch loaded"
        );

        overlays
    }

    /// Run one descriptor through fetch, dispatch, decode and tag.
    async fn process(&self, descriptor: &LayerDescriptor, url: &str) -> DecodedOverlay {
        match self.decode_layer(descriptor, url).await {
            Ok(mut collection) => {
                tag_collection(&mut collection, &descriptor.id, &descriptor.name);
                debug!(
                    layer_id = %descriptor.id,
                    features = collection.len(),
                    "Layer decoded"
                );
                DecodedOverlay::ready(descriptor, collection)
            }
            Err(failure) => {
                warn!(
                    layer_id = %descriptor.id,
                    url = url,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "Layer failed to load"
                );
                DecodedOverlay::failed(descriptor, failure)
            }
        }
    }

    async fn decode_layer(
        &self,
        descriptor: &LayerDescriptor,
        url: &str,
    ) -> Result<FeatureCollection, LayerFailure> {
        let bytes = self.fetch(url).await?;
        let format = detect_format(url, descriptor.declared_format.as_deref())?;

        debug!(
            layer_id = %descriptor.id,
            format = format.name(),
            bytes = bytes.len(),
            "Decoding layer"
        );

        Ok(decode(format, bytes).await?)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, IoError> {
        match self.options.fetch_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(url))
                .await
                .map_err(|_| IoError::Timeout {
                    url: url.to_string(),
                    millis: limit.as_millis() as u64,
                })?,
            None => self.fetcher.fetch(url).await,
        }
    }
}

/// Decode fetched bytes with the decoder for `format`.
///
/// Archives are decoded on the blocking pool since they involve
/// decompression and binary parsing.
async fn decode(format: LayerFormat, bytes: Bytes) -> Result<FeatureCollection, DecodeError> {
    match format {
        LayerFormat::GeoJson => decode_geojson(&bytes),
        LayerFormat::ShapefileArchive => {
            tokio::task::spawn_blocking(move || decode_shapefile_archive(&bytes))
                .await
                .map_err(|e| DecodeError::Task(e.to_string()))?
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
