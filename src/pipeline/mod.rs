//! Layer loading pipeline.
//!
//! Takes the catalog's layer descriptors and produces one [`DecodedOverlay`]
//! per descriptor that has a source file:
//!
//! - [`LayerPipeline`] fetches, dispatches, decodes and tags each layer
//! - [`DecodedOverlay`] is either ready (with a feature collection) or failed
//! - [`LoadGeneration`] issues tickets so callers can drop superseded results

mod generation;
mod orchestrator;
mod overlay;
mod tag;

pub use generation::{LoadGeneration, LoadTicket};
pub use orchestrator::{LayerPipeline, PipelineOptions, DEFAULT_CONCURRENCY};
pub use overlay::{DecodedOverlay, FailureKind, LayerFailure, OverlayStatus};
pub use tag::{tag_collection, LAYER_ID_TAG, LAYER_NAME_TAG};
