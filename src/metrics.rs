//! 📊 Prometheus metrics for the analytics service
//!
//! Call `init_metrics()` at startup and serve with `start_metrics_server()`.
//! Recording helpers are free functions so pipeline code never touches the
//! registry directly.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::{error, info};
use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use tokio::net::TcpListener;

use crate::decision_engine::logging::AlertOutcome;

/// Global metrics registry
static METRICS: once_cell::sync::Lazy<Arc<AnalyticsMetrics>> =
    once_cell::sync::Lazy::new(|| Arc::new(AnalyticsMetrics::new()));

pub struct AnalyticsMetrics {
    registry: Registry,

    // Ingest
    pub updates_received: IntCounter,
    pub updates_processed: IntCounter,
    pub update_errors: IntCounter,
    pub commands_handled: IntCounter,
    pub parse_errors: IntCounter,

    // Outcomes
    pub watch_drops: IntCounter,
    pub alerts_sent: IntCounter,
    pub alerts_muted: IntCounter,
    pub alerts_throttled: IntCounter,
    pub alerts_duplicate: IntCounter,
    pub alerts_delivery_failed: IntCounter,

    // Regime
    pub regime_risk_on: IntGauge,
    pub reference_price_usd: Gauge,

    pub processing_latency: Histogram,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let c = IntCounter::with_opts(Opts::new(name, help)).expect("valid counter opts");
    registry.register(Box::new(c.clone())).expect("unique metric name");
    c
}

impl AnalyticsMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let updates_received = counter(&registry, "analytics_updates_received", "Market updates received from the ingest bus");
        let updates_processed = counter(&registry, "analytics_updates_processed", "Market updates fully evaluated");
        let update_errors = counter(&registry, "analytics_update_errors", "Market updates rejected or failing during processing");
        let commands_handled = counter(&registry, "analytics_commands_handled", "Command requests answered");
        let parse_errors = counter(&registry, "analytics_parse_errors", "Ingest datagrams that failed to decode");

        let watch_drops = counter(&registry, "analytics_watch_drops", "Evaluations ending in the watch band");
        let alerts_sent = counter(&registry, "analytics_alerts_sent", "Alerts delivered");
        let alerts_muted = counter(&registry, "analytics_alerts_muted", "Alerts dropped while muted");
        let alerts_throttled = counter(&registry, "analytics_alerts_throttled", "Alerts blocked by cooldown or rate caps");
        let alerts_duplicate = counter(&registry, "analytics_alerts_duplicate", "Alerts suppressed as duplicates");
        let alerts_delivery_failed = counter(&registry, "analytics_alerts_delivery_failed", "Alerts the sink failed to deliver");

        let regime_risk_on = IntGauge::with_opts(
            Opts::new("analytics_regime_risk_on", "1 when the market regime is risk-on"),
        ).expect("valid gauge opts");
        registry.register(Box::new(regime_risk_on.clone())).expect("unique metric name");

        let reference_price_usd = Gauge::with_opts(
            Opts::new("analytics_reference_price_usd", "Last reference asset price in USD"),
        ).expect("valid gauge opts");
        registry.register(Box::new(reference_price_usd.clone())).expect("unique metric name");

        let processing_latency = Histogram::with_opts(
            HistogramOpts::new("analytics_processing_latency_seconds", "Per-update processing latency")
                .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        ).expect("valid histogram opts");
        registry.register(Box::new(processing_latency.clone())).expect("unique metric name");

        Self {
            registry,
            updates_received,
            updates_processed,
            update_errors,
            commands_handled,
            parse_errors,
            watch_drops,
            alerts_sent,
            alerts_muted,
            alerts_throttled,
            alerts_duplicate,
            alerts_delivery_failed,
            regime_risk_on,
            reference_price_usd,
            processing_latency,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for AnalyticsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

pub fn metrics() -> Arc<AnalyticsMetrics> {
    METRICS.clone()
}

/// Initialize metrics (called at startup)
pub fn init_metrics() {
    let _ = METRICS.clone();
    info!("📊 Metrics system initialized");
}

/// Start Prometheus metrics HTTP server
pub async fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);

    info!("📊 Starting metrics server on {}", addr);

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler));

    let listener = TcpListener::bind(&addr).await?;

    info!("✓ Metrics server listening on http://{}", addr);
    info!("  • Metrics endpoint: http://{}/metrics", addr);
    info!("  • Health endpoint: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn metrics_handler() -> Response {
    let encoder = prometheus::TextEncoder::new();

    match encoder.encode_to_string(&metrics().registry().gather()) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"healthy","service":"signal_analytics"}"#,
    )
        .into_response()
}

// ============================================================================
// Helper Functions for Recording Metrics
// ============================================================================

pub fn record_update_received() {
    metrics().updates_received.inc();
}

pub fn record_update_processed() {
    metrics().updates_processed.inc();
}

pub fn record_update_error() {
    metrics().update_errors.inc();
}

pub fn record_command_handled() {
    metrics().commands_handled.inc();
}

pub fn record_parse_error() {
    metrics().parse_errors.inc();
}

pub fn record_watch_drop() {
    metrics().watch_drops.inc();
}

pub fn record_alert_outcome(outcome: AlertOutcome) {
    let m = metrics();
    match outcome {
        AlertOutcome::Sent => m.alerts_sent.inc(),
        AlertOutcome::Muted => m.alerts_muted.inc(),
        AlertOutcome::Throttled => m.alerts_throttled.inc(),
        AlertOutcome::Duplicate => m.alerts_duplicate.inc(),
        AlertOutcome::DeliveryFailed => m.alerts_delivery_failed.inc(),
    }
}

pub fn update_regime(risk_on: bool, reference_price: f64) {
    let m = metrics();
    m.regime_risk_on.set(if risk_on { 1 } else { 0 });
    m.reference_price_usd.set(reference_price);
}

/// Timer for measuring per-update processing latency
pub struct ProcessingTimer {
    start: std::time::Instant,
}

impl ProcessingTimer {
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    pub fn observe(self) {
        metrics().processing_latency.observe(self.start.elapsed().as_secs_f64());
    }
}
