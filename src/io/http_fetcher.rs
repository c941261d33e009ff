use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use url::Url;

use super::ByteFetcher;
use crate::error::IoError;

/// HTTP-backed implementation of ByteFetcher.
///
/// Issues a plain GET for every layer file. Relative file URLs (as stored by
/// the GEODESA backend, e.g. `/uploads/rivers.zip`) are resolved against an
/// optional asset base URL.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    base_url: Option<Url>,
    identifier: String,
}

impl HttpFetcher {
    /// Create a fetcher that only accepts absolute URLs.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: None,
            identifier: "http".to_string(),
        }
    }

    /// Create a fetcher that resolves relative URLs against `base_url`.
    pub fn with_base_url(client: Client, base_url: &str) -> Result<Self, IoError> {
        let base = Url::parse(base_url).map_err(|e| IoError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let identifier = format!("http({})", base);

        Ok(Self {
            client,
            base_url: Some(base),
            identifier,
        })
    }

    /// Get the asset base URL, if any.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Resolve a layer file URL to an absolute URL.
    pub fn resolve(&self, url: &str) -> Result<Url, IoError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base.join(url).map_err(|e| IoError::InvalidUrl {
                    url: url.to_string(),
                    reason: e.to_string(),
                }),
                None => Err(IoError::InvalidUrl {
                    url: url.to_string(),
                    reason: "relative URL and no asset base URL configured".to_string(),
                }),
            },
            Err(e) => Err(IoError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ByteFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, IoError> {
        let resolved = self.resolve(url)?;

        let response = self
            .client
            .get(resolved.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(resolved.as_str(), e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(resolved.to_string()));
        }
        if !status.is_success() {
            return Err(IoError::Status {
                url: resolved.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(resolved.as_str(), e))
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> IoError {
    if err.is_timeout() {
        return IoError::Connection(format!("request to {} timed out", url));
    }
    IoError::Connection(err.to_string())
}

/// Create the shared HTTP client.
///
/// The timeout, when given, bounds each request end to end.
pub fn create_http_client(timeout: Option<Duration>) -> Result<Client, IoError> {
    let mut builder = Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| IoError::Connection(e.to_string()))
}
