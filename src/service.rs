//! 🧠 Signal pipeline and analytics worker
//!
//! `SignalPipeline` runs one market update through the whole decision chain:
//! validation, regime routing, factor scoring, confidence, entry gates,
//! banding and finally admission (mute → throttle → dedupe → delivery).
//! `AnalyticsService` owns the single worker task that feeds it from the
//! ingest channel and answers commands.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::decision_engine::{
    AlertAuditLog, AlertOutcome, AuditEntry, Band, ConfidenceScorer, DedupeStore, Deduplicator,
    EntryExitChecker, PositionSizer, RegimeDetector, SignalCalculator, SignalResult,
    ThrottleManager, ThrottleReason,
};
use crate::feature_cache::{MarketCache, MetadataSource, SignalCache, TokenListSource};
use crate::metrics;
use crate::query::{PortfolioSource, SignalQueryHandler};
use crate::udp_bus::messages::{Alert, BusMessage, CommandReply, MarketUpdate};

/// Delivery side for admitted alerts
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Delivery side for command replies
pub trait ReplySink: Send + Sync {
    fn send_reply(&self, reply: &CommandReply) -> Result<()>;
}

/// External collaborators the pipeline reads from and writes to
pub struct Collaborators {
    pub metadata: Arc<dyn MetadataSource>,
    pub token_list: Arc<dyn TokenListSource>,
    pub sink: Arc<dyn AlertSink>,
    pub dedupe_store: Arc<dyn DedupeStore>,
    pub portfolios: Arc<dyn PortfolioSource>,
    pub audit_log: Option<AlertAuditLog>,
}

/// What became of one market update
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Reference-asset update fed to the regime detector
    RegimeUpdated { risk_on: bool },
    /// Scored but stayed in the watch band; never alerted
    Watch { signals: SignalResult },
    Muted { signals: SignalResult },
    Throttled { signals: SignalResult, reason: ThrottleReason },
    Duplicate { signals: SignalResult },
    DeliveryFailed { signals: SignalResult, error: String },
    Sent { alert: Alert },
}

impl PipelineOutcome {
    pub fn band(&self) -> Option<Band> {
        match self {
            PipelineOutcome::RegimeUpdated { .. } => None,
            PipelineOutcome::Watch { signals }
            | PipelineOutcome::Muted { signals }
            | PipelineOutcome::Throttled { signals, .. }
            | PipelineOutcome::Duplicate { signals }
            | PipelineOutcome::DeliveryFailed { signals, .. } => Some(signals.band),
            PipelineOutcome::Sent { alert } => Some(alert.band),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, PipelineOutcome::Sent { .. })
    }
}

#[derive(Debug, Default, Clone)]
pub struct PipelineStats {
    pub processed: u64,
    pub regime_updates: u64,
    pub watch: u64,
    pub sent: u64,
    pub muted: u64,
    pub throttled: u64,
    pub duplicate: u64,
    pub delivery_failed: u64,
}

pub struct SignalPipeline {
    calculator: SignalCalculator,
    scorer: ConfidenceScorer,
    checker: EntryExitChecker,
    sizer: PositionSizer,
    regime: RegimeDetector,
    throttle: ThrottleManager,
    deduplicator: Deduplicator,
    market_cache: MarketCache,
    signal_cache: SignalCache,
    metadata: Arc<dyn MetadataSource>,
    token_list: Arc<dyn TokenListSource>,
    sink: Arc<dyn AlertSink>,
    portfolios: Arc<dyn PortfolioSource>,
    tracked_wallet: Option<String>,
    audit_log: Option<AlertAuditLog>,
    stats: Mutex<PipelineStats>,
}

impl SignalPipeline {
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        info!("🧠 Building signal pipeline");
        Self {
            calculator: SignalCalculator::with_config(config.signals.clone()),
            scorer: ConfidenceScorer::with_config(config.scoring.clone()),
            checker: EntryExitChecker::with_config(config.entry.clone()),
            sizer: PositionSizer::new(config.sizing.clone()),
            regime: RegimeDetector::with_config(config.regime.clone()),
            throttle: ThrottleManager::with_config(config.throttle.clone()),
            deduplicator: Deduplicator::new(collaborators.dedupe_store, config.dedupe.ttl()),
            market_cache: MarketCache::new(Duration::seconds(config.cache.market_ttl_secs)),
            signal_cache: SignalCache::new(Duration::seconds(config.cache.signal_ttl_secs)),
            metadata: collaborators.metadata,
            token_list: collaborators.token_list,
            sink: collaborators.sink,
            portfolios: collaborators.portfolios,
            tracked_wallet: config.cache.tracked_wallet.clone(),
            audit_log: collaborators.audit_log,
            stats: Mutex::new(PipelineStats::default()),
        }
    }

    /// Replace the signal calculator, e.g. to plug in a relative-strength provider
    pub fn with_calculator(mut self, calculator: SignalCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    pub fn regime(&self) -> &RegimeDetector {
        &self.regime
    }

    pub fn throttle(&self) -> &ThrottleManager {
        &self.throttle
    }

    pub fn deduplicator(&self) -> &Deduplicator {
        &self.deduplicator
    }

    pub fn market_cache(&self) -> &MarketCache {
        &self.market_cache
    }

    pub fn portfolios(&self) -> &Arc<dyn PortfolioSource> {
        &self.portfolios
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.lock().unwrap().clone()
    }

    pub fn process_update(&self, update: MarketUpdate) -> Result<PipelineOutcome> {
        self.process_update_at(update, Utc::now())
    }

    /// Run one update through the pipeline at wall-clock time `now`
    pub fn process_update_at(&self, update: MarketUpdate, now: DateTime<Utc>) -> Result<PipelineOutcome> {
        update
            .validate()
            .with_context(|| format!("Rejected market update for {}", update.mint_short()))?;

        let processed = {
            let mut stats = self.stats.lock().unwrap();
            stats.processed += 1;
            stats.processed
        };
        if processed % 100 == 0 {
            self.market_cache.purge_expired(now);
            self.signal_cache.purge_expired(now);
        }

        if self.regime.is_reference(&update.mint_base) {
            let change = self.calculator.long_momentum_pct(&update);
            let risk_on = self.regime.update_reference_at(update.price_usd, change, now);
            metrics::update_regime(risk_on, update.price_usd);
            self.stats.lock().unwrap().regime_updates += 1;
            return Ok(PipelineOutcome::RegimeUpdated { risk_on });
        }

        self.market_cache.insert_at(&update.mint_base, update.clone(), now);
        let signals = self.evaluate(&update);
        self.signal_cache.insert_at(&update.mint_base, signals.clone(), now);

        if signals.band == Band::Watch {
            debug!("👀 {} ({}) stays in watch: conf={} entry={} edge={}",
                   update.symbol, update.mint_short(), signals.confidence,
                   signals.entry_confirmed, signals.net_edge_ok);
            metrics::record_watch_drop();
            self.stats.lock().unwrap().watch += 1;
            return Ok(PipelineOutcome::Watch { signals });
        }

        Ok(self.admit(&update, signals, now))
    }

    /// Score an update against the current regime without side effects on
    /// admission state.
    pub fn evaluate(&self, update: &MarketUpdate) -> SignalResult {
        let metadata = self.metadata.get_metadata(&update.mint_base);
        let known_good = self.token_list.known_good();

        let mut signals = self.calculator.calculate_signals(update, metadata.as_ref(), &known_good);
        signals.confidence = self.scorer.score(&signals, self.regime.is_risk_on());
        signals.entry_confirmed = self.checker.check_entry_conditions(update, &signals);
        signals.net_edge_ok = self.checker.check_net_edge(update, &signals);
        signals.band = self.scorer.determine_band(signals.confidence, signals.entry_confirmed, signals.net_edge_ok);
        signals
    }

    pub fn get_token_signals(&self, mint: &str) -> Option<SignalResult> {
        self.get_token_signals_at(mint, Utc::now())
    }

    /// Cached signals for `mint`, recomputed from the cached market snapshot
    /// when the signal entry has expired.
    pub fn get_token_signals_at(&self, mint: &str, now: DateTime<Utc>) -> Option<SignalResult> {
        if let Some(signals) = self.signal_cache.get_at(mint, now) {
            return Some(signals);
        }
        let update = self.market_cache.get_at(mint, now)?;
        let signals = self.evaluate(&update);
        self.signal_cache.insert_at(mint, signals.clone(), now);
        Some(signals)
    }

    fn active_positions(&self) -> usize {
        self.tracked_wallet
            .as_deref()
            .and_then(|wallet| self.portfolios.get_portfolio(wallet))
            .map_or(0, |p| p.holdings.len())
    }

    fn admit(&self, update: &MarketUpdate, signals: SignalResult, now: DateTime<Utc>) -> PipelineOutcome {
        let mint = update.mint_base.as_str();

        if self.throttle.is_muted_at(now) {
            debug!("🔇 {} alert dropped while muted", update.symbol);
            self.audit(&signals, AlertOutcome::Muted, String::new(), now);
            return PipelineOutcome::Muted { signals };
        }

        let ticket = match self.throttle.try_acquire_at(mint, signals.band, now) {
            Ok(ticket) => ticket,
            Err(reason) => {
                debug!("🛡️ {} alert throttled: {}", update.symbol, reason);
                self.audit(&signals, AlertOutcome::Throttled, reason.to_string(), now);
                return PipelineOutcome::Throttled { signals, reason };
            }
        };

        if self.deduplicator.is_duplicate_at(mint, &signals.reasons, now) {
            self.throttle.release(ticket);
            debug!("🔁 {} alert suppressed as duplicate", update.symbol);
            self.audit(&signals, AlertOutcome::Duplicate, String::new(), now);
            return PipelineOutcome::Duplicate { signals };
        }

        let alert = Alert {
            alert_id: Uuid::new_v4(),
            mint: update.mint_base.clone(),
            symbol: update.symbol.clone(),
            price_usd: update.price_usd,
            liq_usd: update.liq_usd,
            vol24h_usd: update.vol24h_usd,
            confidence: signals.confidence,
            band: signals.band,
            reasons: signals.reasons.clone(),
            suggested_size_usd: self.sizer.size_for(signals.confidence, update.liq_usd, self.active_positions()),
            risk_regime: self.regime.regime_string().to_string(),
            timestamp: now,
        };

        match self.sink.deliver(&alert) {
            Ok(()) => {
                info!("🚨 Published {} alert for {}: confidence {}, reasons: {}",
                      alert.band, alert.symbol, alert.confidence, alert.reasons.join(", "));
                self.audit(&signals, AlertOutcome::Sent, format!("size ${:.2}", alert.suggested_size_usd), now);
                PipelineOutcome::Sent { alert }
            }
            Err(e) => {
                self.throttle.release(ticket);
                self.deduplicator.forget(mint, &signals.reasons);
                warn!("⚠️ Failed to deliver alert for {}: {:#}", update.symbol, e);
                let error = format!("{:#}", e);
                self.audit(&signals, AlertOutcome::DeliveryFailed, error.clone(), now);
                PipelineOutcome::DeliveryFailed { signals, error }
            }
        }
    }

    fn audit(&self, signals: &SignalResult, outcome: AlertOutcome, details: String, now: DateTime<Utc>) {
        metrics::record_alert_outcome(outcome);
        {
            let mut stats = self.stats.lock().unwrap();
            match outcome {
                AlertOutcome::Sent => stats.sent += 1,
                AlertOutcome::Muted => stats.muted += 1,
                AlertOutcome::Throttled => stats.throttled += 1,
                AlertOutcome::Duplicate => stats.duplicate += 1,
                AlertOutcome::DeliveryFailed => stats.delivery_failed += 1,
            }
        }

        if let Some(log) = &self.audit_log {
            let entry = AuditEntry {
                timestamp: now,
                mint: signals.mint.clone(),
                symbol: signals.symbol.clone(),
                band: signals.band,
                confidence: signals.confidence,
                outcome,
                details,
                reasons: signals.reasons.clone(),
            };
            if let Err(e) = log.log(&entry) {
                warn!("⚠️ Failed to write audit entry: {:#}", e);
            }
        }
    }

    pub fn print_stats(&self) {
        let stats = self.stats();
        let dedupe = self.deduplicator.stats();
        info!("📊 Pipeline Statistics:");
        info!("   Processed: {} (regime updates {})", stats.processed, stats.regime_updates);
        info!("   Watch: {}", stats.watch);
        info!("   Sent: {}", stats.sent);
        info!("   Muted: {}, throttled: {}, duplicate: {}", stats.muted, stats.throttled, stats.duplicate);
        info!("   Delivery failures: {}", stats.delivery_failed);
        info!("   Duplicate rate: {:.1}%", dedupe.duplicate_rate());
        info!("   Regime: {}", self.regime.regime_string());
    }
}

/// Owns the worker task that drains the ingest channel
pub struct AnalyticsService {
    pipeline: Arc<SignalPipeline>,
    queries: Arc<SignalQueryHandler>,
    replies: Arc<dyn ReplySink>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AnalyticsService {
    pub fn new(pipeline: Arc<SignalPipeline>, replies: Arc<dyn ReplySink>) -> Self {
        let queries = Arc::new(SignalQueryHandler::new(pipeline.clone()));
        Self {
            pipeline,
            queries,
            replies,
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn pipeline(&self) -> &Arc<SignalPipeline> {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the worker. Updates are processed one at a time in channel order.
    pub fn start(&self, mut rx: mpsc::Receiver<BusMessage>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("⚠️ Analytics service already running");
            return;
        }

        let pipeline = self.pipeline.clone();
        let queries = self.queries.clone();
        let replies = self.replies.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();

        let handle = tokio::spawn(async move {
            info!("🧠 Analytics worker started");

            while running.load(Ordering::SeqCst) {
                let msg = tokio::select! {
                    biased;
                    _ = shutdown.notified() => break,
                    msg = rx.recv() => msg,
                };
                let Some(msg) = msg else {
                    info!("📭 Ingest channel closed");
                    break;
                };

                match msg {
                    BusMessage::MarketUpdate(update) => {
                        metrics::record_update_received();
                        let timer = metrics::ProcessingTimer::start();
                        match pipeline.process_update(update) {
                            Ok(_) => metrics::record_update_processed(),
                            Err(e) => {
                                metrics::record_update_error();
                                error!("❌ Error processing market update: {:#}", e);
                            }
                        }
                        timer.observe();
                    }
                    BusMessage::Command(request) => {
                        let reply = queries.handle(&request);
                        metrics::record_command_handled();
                        if let Err(e) = replies.send_reply(&reply) {
                            warn!("⚠️ Failed to send reply for {}: {:#}", request.correlation_id, e);
                        }
                    }
                    other => debug!("↩️ Worker ignoring {} message", other.kind()),
                }
            }

            info!("🛑 Analytics worker stopped");
        });

        *self.worker.lock().unwrap() = Some(handle);
    }

    /// Stop accepting work, let the in-flight item finish and join the worker
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("🛑 Stopping analytics service...");
        self.shutdown.notify_one();

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("❌ Analytics worker panicked: {}", e);
            }
        }
        self.pipeline.print_stats();
    }
}
