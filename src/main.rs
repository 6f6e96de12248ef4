//! 📈 Signal Analytics Service
//!
//! Receives market updates and commands on the ingest bus, scores every
//! token, gates the results and publishes alerts and replies.
//!
//! ## Architecture
//! - Ingest Bus (UDP 45200): market updates + commands
//! - Publish Bus (UDP 45210): alerts + command replies
//! - Metrics: Prometheus endpoint on port 9095

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{error, info};

use signal_analytics::config::Config;
use signal_analytics::decision_engine::{AlertAuditLog, InMemoryDedupeStore};
use signal_analytics::feature_cache::InMemoryMetadataStore;
use signal_analytics::metrics;
use signal_analytics::query::InMemoryPortfolioStore;
use signal_analytics::udp_bus::{BusReceiver, BusSender};
use signal_analytics::{AnalyticsService, Collaborators, SignalPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.logging.log_level)).init();

    info!("📈 Signal Analytics starting...");
    config.validate().context("Invalid configuration")?;
    info!("✅ Configuration: loaded and validated");

    metrics::init_metrics();
    if config.network.metrics_port != 0 {
        let port = config.network.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(port).await {
                error!("❌ Metrics server error: {}", e);
            }
        });
    }

    let metadata = Arc::new(InMemoryMetadataStore::new());
    if let Some(path) = &config.cache.metadata_path {
        metadata.load_from_json_file(path)?;
    }
    let portfolios = Arc::new(InMemoryPortfolioStore::new());
    if let Some(path) = &config.cache.portfolio_path {
        portfolios.load_from_json_file(path)?;
    }
    let audit_log = match &config.logging.audit_log_path {
        Some(path) => Some(AlertAuditLog::new(path)?),
        None => None,
    };

    let sender = Arc::new(BusSender::new(config.network.publish_addr()).await?);
    let pipeline = Arc::new(SignalPipeline::new(
        &config,
        Collaborators {
            metadata: metadata.clone(),
            token_list: metadata,
            sink: sender.clone(),
            dedupe_store: Arc::new(InMemoryDedupeStore::new(config.dedupe.capacity)),
            portfolios,
            audit_log,
        },
    ));

    let receiver = BusReceiver::bind(config.network.ingest_addr(), config.network.queue_capacity).await?;
    let service = AnalyticsService::new(pipeline, sender.clone());
    service.start(receiver.start());
    info!("✅ Analytics service running");

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("🛑 Shutdown signal received");

    receiver.stop();
    service.stop().await;

    receiver.print_stats();
    sender.print_stats();
    info!("👋 Signal Analytics stopped");
    Ok(())
}
