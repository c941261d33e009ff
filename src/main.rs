//! GEODESA layer loader.
//!
//! This binary runs the overlay API or loads a catalog once from the command line.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geodesa_layers::{
    catalog::{Catalog, CatalogSource, FileCatalogSource, HttpCatalogSource},
    config::{CatalogLocation, Cli, Command, LoadConfig, OutputFormat, PipelineArgs, ServeConfig},
    error::CatalogSourceError,
    io::{create_http_client, HttpFetcher},
    pipeline::{DecodedOverlay, LayerPipeline},
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Load(config) => run_load(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    info!("Configuration:");
    info!("  Catalog: {}", config.catalog_url);
    info!("  Asset base URL: {}", config.asset_base_url());
    info!("  Concurrency: {}", config.pipeline.concurrency);
    match config.pipeline.fetch_timeout() {
        Some(timeout) => info!("  Fetch timeout: {}s", timeout.as_secs()),
        None => warn!("  Fetch timeout: disabled"),
    }

    let client = match create_http_client(config.pipeline.fetch_timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetcher = match HttpFetcher::with_base_url(client.clone(), config.asset_base_url()) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog_source = http_catalog_source(client, &config.catalog_url, &config.pipeline);

    // The backend may come up after us, so an unreachable catalog only warns
    info!("");
    info!("Checking catalog...");
    match catalog_source.fetch_catalog().await {
        Ok(catalog) => {
            info!("  Reachable");
            info!(
                "  Found {} layer(s), {} with files",
                catalog.len(),
                catalog.loadable_count()
            );
        }
        Err(e) => {
            warn!("  Catalog not reachable yet: {}", e);
            warn!("  Overlays will load on the first request");
        }
    }

    let pipeline = LayerPipeline::with_options(fetcher, config.pipeline.pipeline_options());
    let router = create_router(catalog_source, pipeline, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/layers", addr);
    info!("    curl http://{}/overlays", addr);
    info!("    curl -X POST http://{}/overlays/refresh", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!(" ██████╗ ███████╗ ██████╗ ██████╗ ███████╗███████╗ █████╗ ");
    info!("██╔════╝ ██╔════╝██╔═══██╗██╔══██╗██╔════╝██╔════╝██╔══██╗");
    info!("██║  ███╗█████╗  ██║   ██║██║  ██║█████╗  ███████╗███████║");
    info!("██║   ██║██╔══╝  ██║   ██║██║  ██║██╔══╝  ╚════██║██╔══██║");
    info!("╚██████╔╝███████╗╚██████╔╝██████╔╝███████╗███████║██║  ██║");
    info!(" ╚═════╝ ╚══════╝ ╚═════╝ ╚═════╝ ╚══════╝╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                   layers v{}", version);
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so `load --format json` keeps stdout clean.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "geodesa_layers=debug,tower_http=debug"
    } else {
        "geodesa_layers=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new();

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

fn http_catalog_source(
    client: reqwest::Client,
    url: &str,
    pipeline: &PipelineArgs,
) -> HttpCatalogSource {
    let source = HttpCatalogSource::new(client, url);
    match pipeline.catalog_token {
        Some(ref token) => source.with_bearer_token(token.clone()),
        None => source,
    }
}

// =============================================================================
// Load Command
// =============================================================================

async fn run_load(config: LoadConfig) -> ExitCode {
    init_logging(config.verbose);

    let location = match config
        .validate()
        .and_then(|_| config.catalog_location())
    {
        Ok(location) => location,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match create_http_client(config.pipeline.fetch_timeout()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let base_url = match (&config.pipeline.asset_base_url, &location) {
        (Some(base), _) => Some(base.as_str()),
        (None, CatalogLocation::Url(url)) => Some(url.as_str()),
        (None, CatalogLocation::File(_)) => None,
    };

    let fetcher = match base_url {
        Some(base) => match HttpFetcher::with_base_url(client.clone(), base) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => HttpFetcher::new(client.clone()),
    };

    let catalog = match read_catalog(client, &location, &config.pipeline).await {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error: failed to read catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = LayerPipeline::with_options(fetcher, config.pipeline.pipeline_options());
    let overlays = pipeline.load_catalog(&catalog).await;

    match config.format {
        OutputFormat::Summary => print_summary(&catalog, &overlays),
        OutputFormat::Json => match serde_json::to_string_pretty(&overlays) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize overlays: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

async fn read_catalog(
    client: reqwest::Client,
    location: &CatalogLocation,
    pipeline: &PipelineArgs,
) -> Result<Catalog, CatalogSourceError> {
    match location {
        CatalogLocation::Url(url) => {
            http_catalog_source(client, url, pipeline)
                .fetch_catalog()
                .await
        }
        CatalogLocation::File(path) => FileCatalogSource::new(path).fetch_catalog().await,
    }
}

/// Print one line per overlay plus totals.
fn print_summary(catalog: &Catalog, overlays: &[DecodedOverlay]) {
    println!("{:<12} {:<32} {:<8} {:>9}  DETAIL", "ID", "NAME", "STATUS", "FEATURES");
    println!("{}", "─".repeat(80));

    for overlay in overlays {
        let (status, detail) = match overlay.failure() {
            None => ("ready", String::new()),
            Some(failure) => ("failed", failure.to_string()),
        };
        println!(
            "{:<12} {:<32} {:<8} {:>9}  {}",
            overlay.layer_id.to_string(),
            overlay.name,
            status,
            overlay.feature_count(),
            detail
        );
    }

    let ready = overlays.iter().filter(|o| o.is_ready()).count();
    println!("{}", "─".repeat(80));
    println!(
        "{} layer(s): {} ready, {} failed, {} without a file",
        catalog.len(),
        ready,
        overlays.len() - ready,
        catalog.len() - overlays.len()
    );
}
