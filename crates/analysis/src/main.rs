//! CiteNet command line
//!
//! Usage: `citenet [--config <path>] <corpus.json> <seed>...`
//!
//! Builds a citation graph from the seeds over a JSON corpus, computes
//! metrics and research gaps, and prints the export bundle on stdout.

use anyhow::{bail, Context};
use citenet_analysis::{CorpusFetcher, ResearchTools};
use citenet_common::cache::PaperCache;
use citenet_common::config::{AppConfig, ObservabilityConfig};
use citenet_common::metrics::register_metrics;
use citenet_common::VERSION;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: citenet [--config <path>] <corpus.json> <seed>...";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.iter().position(|arg| arg == "--config") {
        Some(at) if at + 1 < args.len() => {
            let path = args.remove(at + 1);
            args.remove(at);
            Some(path)
        }
        Some(_) => bail!("{USAGE}"),
        None => None,
    };

    let config = match &config_path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };
    let config = config.validated().context("invalid configuration")?;

    init_tracing(&config.observability);

    info!("Starting {} v{}", config.observability.service_name, VERSION);

    register_metrics();

    let mut args = args.into_iter();
    let Some(corpus_path) = args.next() else {
        bail!("{USAGE}");
    };
    let seeds: Vec<String> = args.collect();
    if seeds.is_empty() {
        bail!("{USAGE}");
    }

    let fetcher = CorpusFetcher::from_path(&corpus_path)
        .await
        .with_context(|| format!("failed to load corpus {corpus_path}"))?;

    let cache = Arc::new(PaperCache::new(config.cache.clone())?);
    let tools = ResearchTools::new(Arc::new(fetcher), config).with_cache(cache);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        on_signal.cancel();
    });

    let bundle = match tools.analyze(&seeds, &cancel).await {
        Ok(bundle) => bundle,
        Err(e) => {
            let response = e.to_response();
            error!(code = response.error.numeric_code, "Analysis failed");
            println!("{}", serde_json::to_string_pretty(&response)?);
            std::process::exit(1);
        }
    };

    if bundle.status.incomplete {
        warn!(reasons = ?bundle.status.reasons, "Returning an incomplete graph");
    }

    println!("{}", bundle.to_json()?);

    info!("Done");
    Ok(())
}

/// Logs go to stderr so stdout carries only the bundle
fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, cancelling build..."),
        _ = terminate => info!("Received SIGTERM, cancelling build..."),
    }
}
