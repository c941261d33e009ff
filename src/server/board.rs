//! Caller-side store for the latest overlay batch.
//!
//! The pipeline itself is stateless; the server keeps the most recent batch
//! here. Each reload takes a ticket first and may only publish while that
//! ticket is still the newest, so a slow reload can never overwrite the
//! result of one that started after it.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::pipeline::{DecodedOverlay, LoadGeneration, LoadTicket};

/// One published batch of overlays.
#[derive(Debug, Clone, Serialize)]
pub struct OverlaySnapshot {
    /// Generation of the load that produced this batch
    pub generation: u64,

    /// Overlays in catalog order
    pub overlays: Vec<DecodedOverlay>,
}

impl OverlaySnapshot {
    /// Find an overlay by the string form of its layer id.
    pub fn find(&self, layer_id: &str) -> Option<&DecodedOverlay> {
        self.overlays
            .iter()
            .find(|overlay| overlay.layer_id.as_path_segment() == layer_id)
    }

    pub fn ready_count(&self) -> usize {
        self.overlays.iter().filter(|o| o.is_ready()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.overlays.len() - self.ready_count()
    }
}

/// Last-call-wins holder for the latest snapshot.
#[derive(Debug, Clone, Default)]
pub struct OverlayBoard {
    generation: LoadGeneration,
    latest: Arc<RwLock<Option<Arc<OverlaySnapshot>>>>,
}

impl OverlayBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load. Any load started earlier becomes stale.
    pub fn begin(&self) -> LoadTicket {
        self.generation.issue()
    }

    /// Publish a finished batch.
    ///
    /// Returns false (and drops the batch) when a newer load was started
    /// after `ticket` was issued.
    pub async fn publish(&self, ticket: &LoadTicket, overlays: Vec<DecodedOverlay>) -> bool {
        let mut latest = self.latest.write().await;

        let newer_published = latest
            .as_ref()
            .is_some_and(|snapshot| snapshot.generation > ticket.generation());
        if !ticket.is_current() || newer_published {
            return false;
        }

        *latest = Some(Arc::new(OverlaySnapshot {
            generation: ticket.generation(),
            overlays,
        }));
        true
    }

    /// Get the latest published snapshot, if any.
    pub async fn latest(&self) -> Option<Arc<OverlaySnapshot>> {
        self.latest.read().await.clone()
    }
}
