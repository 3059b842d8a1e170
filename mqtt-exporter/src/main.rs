//! Prometheus exporter for MQTT sensor readings.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use mqtt_exporter::{
    DeviceAliases, ExporterConfig, HttpServer, MetricStore, Router, TopicSubscriber,
    build_decoders, build_registry,
};
use mqtt_exporter_common::config::LOG_LEVELS;
use mqtt_exporter_common::{connect, init_tracing};

/// Grace period for in-flight work once shutdown is signalled.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Prometheus exporter for IoT sensor readings published over MQTT.
#[derive(Parser, Debug)]
#[command(name = "mqtt-exporter")]
#[command(about = "Export MQTT sensor readings as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// MQTT topic filter to subscribe to (repeatable, replaces config).
    #[arg(short, long = "topic")]
    topics: Vec<String>,

    /// Zenoh endpoint to connect to (repeatable, replaces config).
    #[arg(long = "connect")]
    connect: Vec<String>,

    /// Log level (overrides config).
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(LOG_LEVELS))]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // Apply CLI overrides
    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
    }
    if !args.topics.is_empty() {
        config.subscription.topics = args.topics;
    }
    if !args.connect.is_empty() {
        config.zenoh.connect = args.connect;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!("Starting MQTT Prometheus Exporter");

    let filters = config.topic_filters()?;
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Build the pipeline
    let store = Arc::new(MetricStore::new());
    let aliases = DeviceAliases::from_config(&config.devices);
    info!(aliases = aliases.len(), "Loaded device aliases");

    let decoders = build_decoders(&config.decoders, aliases, store.clone());
    let router = Arc::new(Router::new(decoders));
    info!(decoders = ?router.decoder_names(), "Decoders enabled");
    if router.decoder_names().is_empty() {
        warn!("All decoders are disabled, no metrics will be exported");
    }

    let registry = Arc::new(build_registry(&config.prometheus.prefix, store.clone())?);

    // Bind and subscribe up front so either failure stops startup.
    let http_server = HttpServer::bind(
        registry,
        router.clone(),
        listen_addr,
        config.prometheus.path.clone(),
    )
    .await?;

    let session = connect(&config.zenoh).await?;
    let subscriber = TopicSubscriber::declare(session, &filters, router.clone()).await?;

    // Separate signals so subscriptions stop before the HTTP server.
    let (subscriber_shutdown_tx, subscriber_shutdown_rx) = watch::channel(false);
    let (http_shutdown_tx, http_shutdown_rx) = watch::channel(false);

    let mut subscriber_task = tokio::spawn(subscriber.run(subscriber_shutdown_rx));
    let mut http_task = tokio::spawn(http_server.run(http_shutdown_rx));

    // A component that stops on its own is fatal.
    let early_exit = tokio::select! {
        result = wait_for_signal() => {
            result?;
            None
        }
        result = &mut subscriber_task => Some(stopped_early("Subscriber", result)),
        result = &mut http_task => Some(stopped_early("HTTP server", result)),
    };
    if let Some(e) = early_exit {
        let _ = subscriber_shutdown_tx.send(true);
        let _ = http_shutdown_tx.send(true);
        return Err(e);
    }

    // Stop consuming messages first, then stop serving scrapes.
    subscriber_shutdown_tx.send(true)?;
    match tokio::time::timeout(SHUTDOWN_GRACE, subscriber_task).await {
        Ok(Ok(Err(e))) => error!("Subscriber error: {}", e),
        Ok(Err(e)) => error!("Subscriber task failed: {}", e),
        Ok(Ok(Ok(()))) => {}
        Err(_) => warn!("Subscriber did not stop within the grace period"),
    }

    http_shutdown_tx.send(true)?;
    match tokio::time::timeout(SHUTDOWN_GRACE, http_task).await {
        Ok(Ok(Err(e))) => error!("HTTP server error: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Ok(Ok(Ok(()))) => {}
        Err(_) => warn!("HTTP server did not stop within the grace period"),
    }

    // Print final stats
    let stats = router.stats();
    info!(
        messages_received = stats.messages_received,
        messages_handled = stats.messages_handled,
        messages_unrecognized = stats.messages_unrecognized,
        series_count = store.len(),
        kinds = ?store.kinds(),
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

/// Turn the result of a task that ended before shutdown into an error.
fn stopped_early(component: &str, result: Result<anyhow::Result<()>, JoinError>) -> anyhow::Error {
    match result {
        Ok(Ok(())) => anyhow::anyhow!("{} stopped unexpectedly", component),
        Ok(Err(e)) => e.context(format!("{} failed", component)),
        Err(e) => anyhow::anyhow!("{} task failed: {}", component, e),
    }
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down...");
    }

    Ok(())
}
