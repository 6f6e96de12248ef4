//! 🔎 Point-in-time queries and operator commands
//!
//! Answers `CommandRequest`s against the pipeline's caches:
//! - `get_signals {mint}`: full factor breakdown for one token
//! - `get_signals {wallet}`: per-holding confidence, band and P&L
//! - `status`, `mute {minutes?}`, `unmute`

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::service::SignalPipeline;
use crate::udp_bus::messages::{CommandReply, CommandRequest};

const DEFAULT_MUTE_MINUTES: i64 = 60;

/// One token position in a wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub mint: String,
    #[serde(default)]
    pub symbol: String,
    pub amount: f64,
    #[serde(default)]
    pub value_usd: f64,
    pub entry_price: f64,
    pub first_acquired: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub wallet: String,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

/// Wallet holdings lookup
pub trait PortfolioSource: Send + Sync {
    fn get_portfolio(&self, wallet: &str) -> Option<Portfolio>;
}

#[derive(Default)]
pub struct InMemoryPortfolioStore {
    portfolios: DashMap<String, Portfolio>,
}

impl InMemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, portfolio: Portfolio) {
        self.portfolios.insert(portfolio.wallet.clone(), portfolio);
    }

    /// Seed from a JSON array of portfolios
    pub fn load_from_json_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read portfolio file: {:?}", path))?;
        let portfolios: Vec<Portfolio> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse portfolio file: {:?}", path))?;

        let count = portfolios.len();
        for portfolio in portfolios {
            self.upsert(portfolio);
        }
        info!("👛 Loaded {} portfolios from {:?}", count, path);
        Ok(count)
    }
}

impl PortfolioSource for InMemoryPortfolioStore {
    fn get_portfolio(&self, wallet: &str) -> Option<Portfolio> {
        self.portfolios.get(wallet).map(|entry| entry.value().clone())
    }
}

/// Signal view of one holding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSignal {
    pub mint: String,
    pub symbol: String,
    pub amount: f64,
    pub value_usd: f64,
    pub confidence: u8,
    /// Band name, or "unknown" without current market data
    pub band: String,
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl_pct: f64,
    pub hold_time_hours: i64,
    pub risk_regime: String,
}

pub struct SignalQueryHandler {
    pipeline: Arc<SignalPipeline>,
}

impl SignalQueryHandler {
    pub fn new(pipeline: Arc<SignalPipeline>) -> Self {
        Self { pipeline }
    }

    pub fn handle(&self, request: &CommandRequest) -> CommandReply {
        self.handle_at(request, Utc::now())
    }

    pub fn handle_at(&self, request: &CommandRequest, now: DateTime<Utc>) -> CommandReply {
        let corr = request.correlation_id.as_str();
        match request.command.as_str() {
            "get_signals" => self.handle_signals_request(request, now),
            "status" => CommandReply::success(corr, self.status_payload(now)),
            "mute" => {
                let minutes = match mute_minutes(request) {
                    Ok(minutes) => minutes,
                    Err(e) => return CommandReply::error(corr, format!("{:#}", e)),
                };
                let until = self.pipeline.throttle().mute_at(minutes, now);
                CommandReply::success(corr, json!({ "muted": true, "muted_until": until, "minutes": minutes }))
            }
            "unmute" => {
                self.pipeline.throttle().unmute();
                CommandReply::success(corr, json!({ "muted": false }))
            }
            other => {
                warn!("⚠️ Unknown command: {}", other);
                CommandReply::error(corr, format!("Unknown command: {}", other))
            }
        }
    }

    fn handle_signals_request(&self, request: &CommandRequest, now: DateTime<Utc>) -> CommandReply {
        let corr = request.correlation_id.as_str();
        let regime = self.pipeline.regime().regime_string();

        if let Some(mint) = request.arg_str("mint") {
            return match self.pipeline.get_token_signals_at(mint, now) {
                Some(signals) => CommandReply::success(
                    corr,
                    json!({
                        "mint": mint,
                        "symbol": signals.symbol,
                        "confidence": signals.confidence,
                        "band": signals.band,
                        "signals": signals.factors_json(),
                        "data_quality": signals.data_quality,
                        "entry_confirmed": signals.entry_confirmed,
                        "net_edge_ok": signals.net_edge_ok,
                        "reasons": signals.reasons,
                        "risk_regime": regime,
                    }),
                ),
                None => CommandReply::error(corr, "Token not found or no signals available"),
            };
        }

        if let Some(wallet) = request.arg_str("wallet") {
            let signals = self.get_portfolio_signals_at(wallet, now);
            return match serde_json::to_value(&signals) {
                Ok(payload) => CommandReply::success(corr, payload),
                Err(e) => CommandReply::error(corr, format!("Failed to encode portfolio signals: {}", e)),
            };
        }

        CommandReply::error(corr, "Missing required parameter: mint or wallet")
    }

    pub fn get_portfolio_signals(&self, wallet: &str) -> Vec<PortfolioSignal> {
        self.get_portfolio_signals_at(wallet, Utc::now())
    }

    /// One entry per holding. An unknown wallet yields an empty list.
    pub fn get_portfolio_signals_at(&self, wallet: &str, now: DateTime<Utc>) -> Vec<PortfolioSignal> {
        let Some(portfolio) = self.pipeline.portfolios().get_portfolio(wallet) else {
            warn!("👛 No portfolio found for wallet: {}", wallet);
            return Vec::new();
        };
        let regime = self.pipeline.regime().regime_string().to_string();

        portfolio
            .holdings
            .iter()
            .map(|holding| {
                let mut result = PortfolioSignal {
                    mint: holding.mint.clone(),
                    symbol: holding.symbol.clone(),
                    amount: holding.amount,
                    value_usd: holding.value_usd,
                    confidence: 0,
                    band: "unknown".to_string(),
                    entry_price: holding.entry_price,
                    current_price: holding.entry_price,
                    pnl_pct: 0.0,
                    hold_time_hours: 0,
                    risk_regime: regime.clone(),
                };

                if let Some(update) = self.pipeline.market_cache().get_at(&holding.mint, now) {
                    result.current_price = update.price_usd;
                    if holding.entry_price > 0.0 {
                        result.pnl_pct = (update.price_usd / holding.entry_price - 1.0) * 100.0;
                    }
                    result.hold_time_hours = (now - holding.first_acquired).num_hours().max(0);

                    if let Some(signals) = self.pipeline.get_token_signals_at(&holding.mint, now) {
                        result.confidence = signals.confidence;
                        result.band = signals.band.as_str().to_string();
                    }
                }
                result
            })
            .collect()
    }

    fn status_payload(&self, now: DateTime<Utc>) -> serde_json::Value {
        let regime = self.pipeline.regime().snapshot();
        let throttle = self.pipeline.throttle().stats();
        let dedupe = self.pipeline.deduplicator().stats();
        let pipeline = self.pipeline.stats();

        json!({
            "risk_regime": self.pipeline.regime().regime_string(),
            "regime": {
                "points": regime.points,
                "mean_change_pct": regime.mean_change_pct,
                "momentum_pct": regime.momentum_pct,
                "last_price": regime.last_price,
                "transitions": regime.transitions,
            },
            "muted": self.pipeline.throttle().is_muted_at(now),
            "muted_until": self.pipeline.throttle().muted_until(),
            "throttle": {
                "checks": throttle.checks,
                "admitted": throttle.admitted,
                "released": throttle.released,
                "blocked_cooldown": throttle.blocked_cooldown,
                "blocked_global": throttle.blocked_global,
                "blocked_band": throttle.blocked_band,
                "history_len": throttle.history_len,
            },
            "dedupe": {
                "checked": dedupe.total_checked,
                "duplicates": dedupe.duplicates_dropped,
                "store_errors": dedupe.store_errors,
                "duplicate_rate_pct": dedupe.duplicate_rate(),
            },
            "pipeline": {
                "processed": pipeline.processed,
                "watch": pipeline.watch,
                "sent": pipeline.sent,
                "muted": pipeline.muted,
                "throttled": pipeline.throttled,
                "duplicate": pipeline.duplicate,
                "delivery_failed": pipeline.delivery_failed,
            },
            "cached_tokens": self.pipeline.market_cache().len(),
        })
    }
}

/// `minutes` may be a number or a numeric string; absent means the default.
fn mute_minutes(request: &CommandRequest) -> Result<i64> {
    let minutes = match request.args.get("minutes") {
        None | Some(serde_json::Value::Null) => DEFAULT_MUTE_MINUTES,
        Some(serde_json::Value::Number(n)) => n.as_i64().context("minutes must be an integer")?,
        Some(serde_json::Value::String(s)) => s.trim().parse().context("minutes must be an integer")?,
        Some(_) => anyhow::bail!("minutes must be an integer"),
    };
    if minutes <= 0 {
        anyhow::bail!("minutes must be > 0");
    }
    Ok(minutes)
}
