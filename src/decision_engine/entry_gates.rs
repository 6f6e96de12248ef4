//! 🚪 Entry gates and net edge
//!
//! Hard filters that must all pass before a signal may leave the watch band,
//! plus the expected-value inequality (net edge) used as a second gate.

use anyhow::{bail, Result};
use log::{debug, info};

use crate::decision_engine::signals::SignalResult;
use crate::udp_bus::messages::MarketUpdate;

/// Entry gate configuration
#[derive(Debug, Clone)]
pub struct EntryConfig {
    pub min_age_hours: f64,
    pub min_liquidity_usd: f64,
    pub min_volume_usd: f64,
    pub max_spread_pct: f64,
    pub max_impact_pct: f64,
    pub max_route_hops: u32,
    pub max_route_deviation_pct: f64,

    pub short_bar_label: String,
    pub long_bar_label: String,
    pub min_short_momentum_pct: f64,
    pub max_short_momentum_pct: f64,
    pub min_long_momentum_pct: f64,
    pub max_long_momentum_pct: f64,

    pub min_dq_for_actionable: f64,
    pub young_token_hours: f64,
    pub min_confidence_young_risky: u8,

    /// Cap on the modelled upside, in percent
    pub upside_cap_pct: f64,
    /// Downside multiplier in the net edge inequality
    pub net_edge_k: f64,
    /// Fixed execution-lag cost, in percent
    pub lag_penalty_pct: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            min_age_hours: 24.0,
            min_liquidity_usd: 150_000.0,
            min_volume_usd: 500_000.0,
            max_spread_pct: 2.5,
            max_impact_pct: 1.5,
            max_route_hops: 3,
            max_route_deviation_pct: 0.8,
            short_bar_label: "5m".to_string(),
            long_bar_label: "15m".to_string(),
            min_short_momentum_pct: 1.0,
            max_short_momentum_pct: 12.0,
            min_long_momentum_pct: 2.0,
            max_long_momentum_pct: 60.0,
            min_dq_for_actionable: 0.7,
            young_token_hours: 72.0,
            min_confidence_young_risky: 80,
            upside_cap_pct: 15.0,
            net_edge_k: 2.0,
            lag_penalty_pct: 0.3,
        }
    }
}

impl EntryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_short_momentum_pct > self.max_short_momentum_pct {
            bail!("MIN_M1H_PCT must be <= MAX_M1H_PCT");
        }
        if self.min_long_momentum_pct > self.max_long_momentum_pct {
            bail!("MIN_M24H_PCT must be <= MAX_M24H_PCT");
        }
        if self.min_confidence_young_risky > 100 {
            bail!("MIN_CONFIDENCE_YOUNG_RISKY must be <= 100");
        }
        if self.net_edge_k < 0.0 || self.upside_cap_pct < 0.0 {
            bail!("NET_EDGE_K and UPSIDE_CAP_PCT must be >= 0");
        }
        Ok(())
    }
}

/// The individual hard gates, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryGate {
    Age,
    Liquidity,
    Volume,
    Tradability,
    Route,
    ShortMomentum,
    LongMomentum,
    DataQuality,
    YoungRiskyConfidence,
}

impl EntryGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryGate::Age => "age",
            EntryGate::Liquidity => "liquidity",
            EntryGate::Volume => "volume",
            EntryGate::Tradability => "spread/impact",
            EntryGate::Route => "route",
            EntryGate::ShortMomentum => "short momentum",
            EntryGate::LongMomentum => "long momentum",
            EntryGate::DataQuality => "data quality",
            EntryGate::YoungRiskyConfidence => "young/risky confidence",
        }
    }
}

pub struct EntryExitChecker {
    config: EntryConfig,
}

impl EntryExitChecker {
    pub fn new() -> Self {
        Self::with_config(EntryConfig::default())
    }

    pub fn with_config(config: EntryConfig) -> Self {
        info!("🚪 Initializing entry gates:");
        info!("   Min age {:.0}h, liq ${:.0}, vol ${:.0}",
              config.min_age_hours, config.min_liquidity_usd, config.min_volume_usd);
        info!("   Momentum: short [{:.1}%, {:.1}%], long [{:.1}%, {:.1}%]",
              config.min_short_momentum_pct, config.max_short_momentum_pct,
              config.min_long_momentum_pct, config.max_long_momentum_pct);
        info!("   Net edge: upside cap {:.1}%, k={:.1}, lag {:.2}%",
              config.upside_cap_pct, config.net_edge_k, config.lag_penalty_pct);
        Self { config }
    }

    pub fn config(&self) -> &EntryConfig {
        &self.config
    }

    /// First gate that rejects the update, or `None` when all pass.
    ///
    /// `signals.confidence` must already hold the final confidence, since
    /// young tokens with elevated rug risk need an elevated score.
    pub fn failed_entry_gate(&self, update: &MarketUpdate, signals: &SignalResult) -> Option<EntryGate> {
        let cfg = &self.config;

        if update.age_hours < cfg.min_age_hours {
            return Some(EntryGate::Age);
        }
        if update.liq_usd < cfg.min_liquidity_usd {
            return Some(EntryGate::Liquidity);
        }
        if update.vol24h_usd < cfg.min_volume_usd {
            return Some(EntryGate::Volume);
        }
        if update.spread_pct > cfg.max_spread_pct || update.impact_1pct_pct > cfg.max_impact_pct {
            return Some(EntryGate::Tradability);
        }
        let route = &update.route;
        if !route.ok || route.hops > cfg.max_route_hops || route.deviation_pct > cfg.max_route_deviation_pct {
            return Some(EntryGate::Route);
        }

        // No momentum data, no entry.
        match update.bar(&cfg.short_bar_label).and_then(|b| b.pct_change()) {
            Some(pct) if pct >= cfg.min_short_momentum_pct && pct <= cfg.max_short_momentum_pct => {}
            _ => return Some(EntryGate::ShortMomentum),
        }
        match update.bar(&cfg.long_bar_label).and_then(|b| b.pct_change()) {
            Some(pct) if pct >= cfg.min_long_momentum_pct && pct <= cfg.max_long_momentum_pct => {}
            _ => return Some(EntryGate::LongMomentum),
        }

        if signals.data_quality < cfg.min_dq_for_actionable {
            return Some(EntryGate::DataQuality);
        }

        if update.age_hours < cfg.young_token_hours
            && signals.s7_rug_risk < 0.5
            && signals.confidence < cfg.min_confidence_young_risky
        {
            return Some(EntryGate::YoungRiskyConfidence);
        }

        None
    }

    pub fn check_entry_conditions(&self, update: &MarketUpdate, signals: &SignalResult) -> bool {
        match self.failed_entry_gate(update, signals) {
            Some(gate) => {
                debug!("🚪 {} entry blocked by {} gate", update.mint_short(), gate.as_str());
                false
            }
            None => true,
        }
    }

    /// Net edge in percent: capped upside minus weighted execution cost.
    /// A missing short bar models zero upside.
    pub fn net_edge_pct(&self, update: &MarketUpdate) -> f64 {
        let cfg = &self.config;
        let short_pct = update
            .bar(&cfg.short_bar_label)
            .and_then(|b| b.pct_change())
            .unwrap_or(0.0);
        let upside = (2.0 * short_pct).min(cfg.upside_cap_pct);
        let downside = 2.0 * update.impact_1pct_pct + update.spread_pct + cfg.lag_penalty_pct;
        upside - cfg.net_edge_k * downside
    }

    pub fn check_net_edge(&self, update: &MarketUpdate, _signals: &SignalResult) -> bool {
        let edge = self.net_edge_pct(update);
        if !(edge > 0.0) {
            debug!("🚪 {} net edge {:.2}% <= 0", update.mint_short(), edge);
            return false;
        }
        true
    }
}

impl Default for EntryExitChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision_engine::scoring::Band;
    use crate::udp_bus::messages::{OhlcvBar, RouteInfo};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn bar(open: f64, close: f64) -> OhlcvBar {
        OhlcvBar { open, high: close.max(open), low: close.min(open), close, volume_usd: 1.0 }
    }

    fn update() -> MarketUpdate {
        let mut bars = BTreeMap::new();
        bars.insert("5m".to_string(), bar(1.0, 1.03));
        bars.insert("15m".to_string(), bar(1.0, 1.05));
        MarketUpdate {
            pool_id: String::new(),
            mint_base: "MintGate".to_string(),
            mint_quote: "USDC".to_string(),
            symbol: "GATE".to_string(),
            price_usd: 1.0,
            liq_usd: 200_000.0,
            vol24h_usd: 800_000.0,
            spread_pct: 0.5,
            impact_1pct_pct: 0.3,
            age_hours: 720.0,
            route: RouteInfo { ok: true, hops: 2, deviation_pct: 0.1 },
            bars,
            timestamp: Utc::now(),
        }
    }

    fn signals() -> SignalResult {
        SignalResult {
            mint: "MintGate".to_string(),
            symbol: "GATE".to_string(),
            s1_liquidity: 0.5,
            s2_volume: 0.5,
            s3_momentum_short: 0.7,
            s4_momentum_long: 0.7,
            s5_volatility: 0.5,
            s6_price_discovery: 0.5,
            s7_rug_risk: 0.63,
            s8_tradability: 0.8,
            s9_relative_strength: 0.7,
            s10_route_quality: 0.7,
            n1_hygiene: 1.0,
            data_quality: 1.0,
            confidence: 75,
            band: Band::Watch,
            entry_confirmed: false,
            net_edge_ok: false,
            reasons: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_all_gates_pass() {
        let checker = EntryExitChecker::new();
        assert!(checker.check_entry_conditions(&update(), &signals()));
    }

    #[test]
    fn test_gate_order() {
        let checker = EntryExitChecker::new();
        let mut u = update();
        u.age_hours = 1.0;
        u.liq_usd = 1.0;
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::Age));

        let mut u = update();
        u.vol24h_usd = 10.0;
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::Volume));

        let mut u = update();
        u.impact_1pct_pct = 2.0;
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::Tradability));

        let mut u = update();
        u.route.ok = false;
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::Route));
    }

    #[test]
    fn test_missing_momentum_blocks_entry() {
        let checker = EntryExitChecker::new();
        let mut u = update();
        u.bars.remove("5m");
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::ShortMomentum));

        let mut u = update();
        u.bars.remove("15m");
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::LongMomentum));
    }

    #[test]
    fn test_momentum_out_of_bounds() {
        let checker = EntryExitChecker::new();
        let mut u = update();
        u.bars.insert("5m".to_string(), bar(1.0, 1.20));
        assert_eq!(checker.failed_entry_gate(&u, &signals()), Some(EntryGate::ShortMomentum));
    }

    #[test]
    fn test_low_data_quality_blocks_entry() {
        let checker = EntryExitChecker::new();
        let mut s = signals();
        s.data_quality = 0.6;
        assert_eq!(checker.failed_entry_gate(&update(), &s), Some(EntryGate::DataQuality));
    }

    #[test]
    fn test_young_risky_needs_elevated_confidence() {
        let checker = EntryExitChecker::new();
        let mut u = update();
        u.age_hours = 48.0;
        let mut s = signals();
        s.s7_rug_risk = 0.04;
        s.confidence = 79;
        assert_eq!(checker.failed_entry_gate(&u, &s), Some(EntryGate::YoungRiskyConfidence));
        s.confidence = 80;
        assert!(checker.check_entry_conditions(&u, &s));
    }

    #[test]
    fn test_net_edge() {
        let checker = EntryExitChecker::new();
        // upside 6, downside 0.6 + 0.5 + 0.3 = 1.4, edge 6 - 2.8
        assert!((checker.net_edge_pct(&update()) - 3.2).abs() < 1e-6);
        assert!(checker.check_net_edge(&update(), &signals()));

        let mut u = update();
        u.bars.remove("5m");
        assert!(!checker.check_net_edge(&u, &signals()));

        let mut u = update();
        u.bars.insert("5m".to_string(), bar(1.0, 1.5));
        // upside capped at 15
        assert!((checker.net_edge_pct(&u) - (15.0 - 2.8)).abs() < 1e-6);
    }
}
