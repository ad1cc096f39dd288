//! quotestats - follow a quote feed and print running statistics
//!
//! Events are written to stdout as JSON lines; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quotestats::ingest::{spawn, ws::WsConnector, ControllerGone, Event, IngestConfig};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Controller(#[from] ControllerGone),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Streaming statistics over a WebSocket quote feed
#[derive(Parser)]
#[command(name = "quotestats")]
#[command(about = "Running mean, std, median and mode over a live quote feed", long_about = None)]
#[command(version)]
struct Cli {
    /// Feed URL (overrides the configured one)
    #[arg(short, long, env = "QUOTESTATS_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, env = "QUOTESTATS_CONFIG")]
    config: Option<String>,

    /// How often to publish a stats snapshot, in milliseconds
    #[arg(long, env = "QUOTESTATS_STATS_INTERVAL_MS", default_value_t = 1000)]
    stats_interval_ms: u64,

    /// Log level
    #[arg(long, env = "QUOTESTATS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "QUOTESTATS_LOG_JSON")]
    json: bool,
}

/// Layer defaults, an optional file and `QUOTESTATS_*` variables
///
/// Nested keys use a double underscore, e.g. `QUOTESTATS_STATS__TOP_K`.
fn load_config(path: Option<&str>) -> Result<IngestConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    builder = builder.add_source(config::Config::try_from(&IngestConfig::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path).required(false));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("QUOTESTATS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let mut config =
        load_config(cli.config.as_deref()).map_err(|e| CliError::Config(e.to_string()))?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    if cli.stats_interval_ms == 0 {
        return Err(CliError::Config("stats interval must be positive".into()));
    }

    info!(url = %config.url, "quotestats starting");

    let connector = Arc::new(WsConnector::new(config.url.clone()));
    let mut ingestion = spawn(config, connector).map_err(|e| CliError::Config(e.to_string()))?;
    ingestion.handle.start()?;

    let mut poll = tokio::time::interval(Duration::from_millis(cli.stats_interval_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                info!("interrupt received, stopping");
                break;
            }
            _ = poll.tick() => ingestion.handle.get_stats()?,
            event = ingestion.events.recv() => match event {
                Some(event) => {
                    if let Event::Anomaly(anomaly) = &event {
                        warn!(
                            sequence_index = anomaly.sequence_index,
                            value = anomaly.value,
                            z_score = anomaly.z_score,
                            "anomaly detected"
                        );
                    }
                    println!("{}", serde_json::to_string(&event)?);
                }
                None => break,
            },
        }
    }

    ingestion.handle.stop()?;
    drop(ingestion.handle);
    if let Err(e) = ingestion.task.await {
        warn!(error = %e, "ingestion task ended abnormally");
    }

    Ok(())
}
