//! Configuration management for the layer loader.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `GEODESA_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Commands
//!
//! - `serve` - Run the HTTP API for the map viewer
//! - `load` - Load a catalog once and print the result
//!
//! # Environment Variables
//!
//! - `GEODESA_HOST` - Server bind address (default: 0.0.0.0)
//! - `GEODESA_PORT` - Server port (default: 3000)
//! - `GEODESA_CATALOG_URL` - Backend layer listing endpoint
//! - `GEODESA_CATALOG_TOKEN` - Bearer token for the listing endpoint
//! - `GEODESA_ASSET_BASE_URL` - Base for relative layer file URLs
//! - `GEODESA_CONCURRENCY` - Layers loaded at once (default: 8)
//! - `GEODESA_FETCH_TIMEOUT` - Per-fetch timeout in seconds, 0 disables (default: 30)
//! - `GEODESA_CORS_ORIGINS` - Allowed CORS origins, comma-separated

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::pipeline::{PipelineOptions, DEFAULT_CONCURRENCY};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default per-fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Upper bound for the concurrency setting.
pub const MAX_CONCURRENCY: usize = 256;

// =============================================================================
// CLI Arguments
// =============================================================================

/// GEODESA layer loader.
///
/// Fetches the layers users uploaded (Shapefile archives and GeoJSON),
/// decodes them into feature collections and serves them to the map viewer.
#[derive(Parser, Debug, Clone)]
#[command(name = "geodesa-layers")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(ServeConfig),

    /// Load a catalog once and print the overlays.
    Load(LoadConfig),
}

/// Settings shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Maximum number of layers fetched and decoded at the same time.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "GEODESA_CONCURRENCY")]
    pub concurrency: usize,

    /// Timeout for a single layer fetch in seconds (0 disables it).
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "GEODESA_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,

    /// Base URL that relative layer file URLs are resolved against.
    ///
    /// Defaults to the catalog URL when loading from HTTP.
    #[arg(long, env = "GEODESA_ASSET_BASE_URL")]
    pub asset_base_url: Option<String>,

    /// Bearer token sent with catalog requests.
    #[arg(long, env = "GEODESA_CATALOG_TOKEN", hide_env_values = true)]
    pub catalog_token: Option<String>,
}

impl PipelineArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }

        if let Some(ref base) = self.asset_base_url {
            validate_http_url("asset_base_url", base)?;
        }

        Ok(())
    }

    /// Get the fetch timeout, None when disabled.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout > 0).then(|| Duration::from_secs(self.fetch_timeout))
    }

    /// Build pipeline options from these arguments.
    pub fn pipeline_options(&self) -> PipelineOptions {
        let options = PipelineOptions::default().with_concurrency(self.concurrency);
        match self.fetch_timeout() {
            Some(timeout) => options.with_fetch_timeout(timeout),
            None => options,
        }
    }
}

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "GEODESA_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "GEODESA_PORT")]
    pub port: u16,

    // =========================================================================
    // Catalog Configuration
    // =========================================================================
    /// URL of the backend's layer listing.
    #[arg(long, env = "GEODESA_CATALOG_URL")]
    pub catalog_url: String,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "GEODESA_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.catalog_url.trim().is_empty() {
            return Err(
                "Catalog URL is required. Set --catalog-url or GEODESA_CATALOG_URL".to_string(),
            );
        }
        validate_http_url("catalog_url", &self.catalog_url)?;

        self.pipeline.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for relative layer files: the explicit setting, else the catalog URL.
    pub fn asset_base_url(&self) -> &str {
        self.pipeline
            .asset_base_url
            .as_deref()
            .unwrap_or(&self.catalog_url)
    }
}

/// Output format for the `load` command.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per layer
    #[default]
    Summary,

    /// All overlays as pretty-printed JSON
    Json,
}

/// Where the `load` command reads its catalog from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    Url(String),
    File(PathBuf),
}

/// Configuration for the `load` command.
#[derive(Args, Debug, Clone)]
pub struct LoadConfig {
    /// URL of the backend's layer listing.
    #[arg(long, env = "GEODESA_CATALOG_URL", conflicts_with = "catalog_file")]
    pub catalog_url: Option<String>,

    /// Read the catalog from a JSON file instead.
    #[arg(long)]
    pub catalog_file: Option<PathBuf>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.catalog_location()?;
        self.pipeline.validate()
    }

    /// Resolve where the catalog comes from.
    pub fn catalog_location(&self) -> Result<CatalogLocation, String> {
        match (&self.catalog_url, &self.catalog_file) {
            (Some(_), Some(_)) => {
                Err("Use either --catalog-url or --catalog-file, not both".to_string())
            }
            (Some(url), None) => {
                validate_http_url("catalog_url", url)?;
                Ok(CatalogLocation::Url(url.clone()))
            }
            (None, Some(path)) => Ok(CatalogLocation::File(path.clone())),
            (None, None) => Err(
                "No catalog given. Set --catalog-url (or GEODESA_CATALOG_URL) or --catalog-file"
                    .to_string(),
            ),
        }
    }
}

/// Check that a setting holds an absolute http(s) URL.
fn validate_http_url(field: &str, value: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", field, e))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!(
            "{} must use http or https, got '{}'",
            field, other
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
