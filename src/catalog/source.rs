//! Catalog sources: where the list of layer descriptors comes from.

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use tracing::debug;

use super::Catalog;
use crate::error::{CatalogSourceError, IoError};

/// Trait for loading the current layer catalog.
///
/// The pipeline never calls this itself; callers fetch a fresh catalog per
/// invocation and pass it in.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch and validate the current catalog.
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogSourceError>;

    /// Get a unique identifier for this source (for logging).
    fn identifier(&self) -> &str;
}

// =============================================================================
// HttpCatalogSource
// =============================================================================

/// Catalog source backed by the GEODESA REST layer listing (`GET /layers`).
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    url: String,
    bearer_token: Option<String>,
}

impl HttpCatalogSource {
    /// Create a source for the given listing URL.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every listing request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Get the listing URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogSourceError> {
        let mut request = self.client.get(&self.url);
        if let Some(ref token) = self.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(self.url.clone()).into());
        }
        if !status.is_success() {
            return Err(IoError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let catalog = Catalog::from_slice(&body)?;
        debug!(
            source = %self.url,
            layers = catalog.len(),
            "Fetched layer catalog"
        );
        Ok(catalog)
    }

    fn identifier(&self) -> &str {
        &self.url
    }
}

// =============================================================================
// FileCatalogSource
// =============================================================================

/// Catalog source that reads a JSON listing from disk.
///
/// Useful for offline runs of the `load` command and for fixtures.
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    path: PathBuf,
    identifier: String,
}

impl FileCatalogSource {
    /// Create a source for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = format!("file://{}", path.display());
        Self { path, identifier }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch_catalog(&self) -> Result<Catalog, CatalogSourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| IoError::File(format!("{}: {}", self.path.display(), e)))?;
        Ok(Catalog::from_slice(&bytes)?)
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
