//! kubewatch sink runner
//!
//! Reads events as JSON lines on stdin and hands each to the configured sink.
//!
//! ## Usage
//!
//! ```bash
//! # Default sink, events logged at debug
//! KW_LOG_LEVEL=debug kubewatch-sinks < events.ndjson
//!
//! # Graph sink from the config file
//! KW_CONFIG=./kubewatch.yaml kubewatch-sinks < events.ndjson
//! ```
//!
//! ## Environment Variables
//!
//! - `KW_CONFIG`: config file path (default: "$HOME/.kubewatch.yaml")
//! - `KW_GRAPH_ENDPOINT`: graph endpoint when the config file has none
//! - `KW_GRAPH_REGION`: graph region when the config file has none
//! - `KW_LOG_LEVEL`: log level (default: "info")
//! - `KW_LOG_FORMAT`: "pretty" or "json" (default: "pretty")

use kubewatch_sinks::config::{Config, LogFormat};
use kubewatch_sinks::dispatch;
use kubewatch_sinks::metrics::Metrics;
use kubewatch_sinks::sink::Sink;
use tokio::io::BufReader;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let filter = EnvFilter::try_new(&config.log_level.0).unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }

    Metrics::init()?;

    let mut sink = dispatch::start(&config).await?;
    info!(sink = sink.name(), "Starting kubewatch sink runner");

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = dispatch::run(&sink, stdin) => {
            result?;
        }
        _ = shutdown_signal() => {}
    }

    sink.close().await?;
    info!("kubewatch sink runner stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
