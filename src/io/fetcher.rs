use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for fetching the raw content of a layer file.
///
/// This abstraction lets the pipeline run against HTTP, local fixtures or
/// in-memory mocks. Implementations must be thread-safe since descriptors
/// are fetched concurrently.
#[async_trait]
pub trait ByteFetcher: Send + Sync {
    /// Fetch the complete content behind `url`.
    ///
    /// Returns an error for transport failures and non-success responses.
    async fn fetch(&self, url: &str) -> Result<Bytes, IoError>;

    /// Get a short identifier for this fetcher (for logging).
    fn identifier(&self) -> &str;
}

#[async_trait]
impl<T: ByteFetcher + ?Sized> ByteFetcher for std::sync::Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Bytes, IoError> {
        (**self).fetch(url).await
    }

    fn identifier(&self) -> &str {
        (**self).identifier()
    }
}
