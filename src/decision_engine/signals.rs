//! 📐 Signal Calculator
//!
//! Maps one market update (+ optional token metadata + the known-good token
//! set) into eleven factor scores, a data-quality score and an ordered list
//! of human-readable reasons.
//!
//! Every factor has a neutral fallback for missing inputs, so this never
//! fails. The calculation is pure: identical inputs give identical output.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;

use crate::decision_engine::scoring::Band;
use crate::udp_bus::messages::{MarketUpdate, TokenMetadata};

/// Piecewise-linear normalisation curve.
///
/// Knots are `(x, y)` pairs with strictly increasing `x`. Values between
/// knots are interpolated, values past the last knot take its `y`. Values
/// below the first knot take `below` when set (a documented floor), else
/// the first knot's `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCurve {
    knots: Vec<(f64, f64)>,
    below: Option<f64>,
}

impl PiecewiseCurve {
    pub fn new(knots: Vec<(f64, f64)>) -> Self {
        Self { knots, below: None }
    }

    /// Output used for inputs strictly below the first knot
    pub fn with_floor(mut self, below: f64) -> Self {
        self.below = Some(below);
        self
    }

    pub fn knots(&self) -> &[(f64, f64)] {
        &self.knots
    }

    pub fn floor(&self) -> Option<f64> {
        self.below
    }

    /// Reject curves that would produce gaps, overlaps or decreasing output.
    pub fn validate(&self, name: &str) -> Result<()> {
        if self.knots.is_empty() {
            bail!("{} curve has no knots", name);
        }
        for &(x, y) in &self.knots {
            if !x.is_finite() || !(0.0..=1.0).contains(&y) {
                bail!("{} curve knot ({}, {}) out of range", name, x, y);
            }
        }
        for pair in self.knots.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if x1 <= x0 {
                bail!("{} curve knots must be strictly increasing in x ({} then {})", name, x0, x1);
            }
            if y1 < y0 {
                bail!("{} curve must be non-decreasing ({} then {})", name, y0, y1);
            }
        }
        if let Some(below) = self.below {
            if below > self.knots[0].1 {
                bail!("{} curve floor {} exceeds first knot", name, below);
            }
        }
        Ok(())
    }

    pub fn eval(&self, x: f64) -> f64 {
        let Some(&(x0, y0)) = self.knots.first() else {
            return 0.0;
        };
        // NaN compares false everywhere; treat it as the lowest input.
        if x.is_nan() || x < x0 {
            return clamp01(self.below.unwrap_or(y0));
        }
        for pair in self.knots.windows(2) {
            let ((xa, ya), (xb, yb)) = (pair[0], pair[1]);
            if x <= xb {
                return clamp01(ya + (yb - ya) * (x - xa) / (xb - xa));
            }
        }
        clamp01(self.knots[self.knots.len() - 1].1)
    }

    /// Parse `"x:y,x:y,..."` (used for env overrides).
    pub fn parse_knots(raw: &str) -> Result<Vec<(f64, f64)>> {
        let mut knots = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((x, y)) = part.split_once(':') else {
                bail!("curve knot '{}' must be written as x:y", part);
            };
            knots.push((x.trim().parse::<f64>()?, y.trim().parse::<f64>()?));
        }
        Ok(knots)
    }
}

pub(crate) fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// S9 provider. The default is a constant until a market-relative
/// calculation exists.
pub trait RelativeStrength: Send + Sync {
    fn score(&self, update: &MarketUpdate) -> f64;
}

/// Fixed relative-strength score
#[derive(Debug, Clone, Copy)]
pub struct ConstantRelativeStrength(pub f64);

impl RelativeStrength for ConstantRelativeStrength {
    fn score(&self, _update: &MarketUpdate) -> f64 {
        self.0
    }
}

/// Signal calculator configuration
#[derive(Debug, Clone)]
pub struct SignalConfig {
    pub min_liquidity_headsup: f64,
    pub min_liquidity_actionable: f64,
    pub min_volume_headsup: f64,
    pub min_volume_actionable: f64,

    /// Bar interval feeding the short-horizon momentum ("m1h")
    pub short_bar_label: String,
    /// Bar interval feeding long-horizon momentum ("m24h") and volatility
    pub long_bar_label: String,
    pub min_short_momentum_pct: f64,
    pub min_long_momentum_pct: f64,

    pub liquidity_curve: PiecewiseCurve,
    pub volume_curve: PiecewiseCurve,
    pub short_momentum_curve: PiecewiseCurve,
    pub long_momentum_curve: PiecewiseCurve,
    pub volatility_curve: PiecewiseCurve,

    pub max_spread_pct: f64,
    pub max_impact_pct: f64,
    pub max_route_hops: u32,
    pub max_route_deviation_pct: f64,

    pub young_token_hours: f64,
    pub max_top_holder_pct: f64,
    pub min_fdv_liq: f64,
    pub max_fdv_liq: f64,
    pub preferred_min_fdv_liq: f64,
    pub preferred_max_fdv_liq: f64,

    pub dq_penalty_per_missing: f64,
    pub min_dq_for_actionable: f64,
    pub relative_strength_default: f64,
}

impl SignalConfig {
    pub fn liquidity_curve_for(headsup: f64, actionable: f64) -> PiecewiseCurve {
        PiecewiseCurve::new(vec![
            (headsup, 0.3),
            (actionable, 0.5),
            (500_000.0, 0.8),
            (1_000_000.0, 0.9),
            (2_000_000.0, 1.0),
        ])
        .with_floor(0.0)
    }

    pub fn volume_curve_for(headsup: f64, actionable: f64) -> PiecewiseCurve {
        PiecewiseCurve::new(vec![
            (headsup, 0.3),
            (actionable, 0.5),
            (2_000_000.0, 0.8),
            (5_000_000.0, 0.9),
            (10_000_000.0, 1.0),
        ])
        .with_floor(0.0)
    }

    pub fn short_momentum_curve_for(min_pct: f64, max_pct: f64) -> PiecewiseCurve {
        PiecewiseCurve::new(vec![
            (-10.0, 0.0),
            (-5.0, 0.3),
            (0.0, 0.5),
            (min_pct, 0.7),
            (6.0, 0.9),
            (max_pct, 1.0),
        ])
    }

    pub fn long_momentum_curve_for(min_pct: f64, max_pct: f64) -> PiecewiseCurve {
        PiecewiseCurve::new(vec![
            (-30.0, 0.0),
            (-10.0, 0.3),
            (0.0, 0.5),
            (min_pct, 0.7),
            (20.0, 0.9),
            (max_pct, 1.0),
        ])
    }

    pub fn default_volatility_curve() -> PiecewiseCurve {
        PiecewiseCurve::new(vec![(0.0, 0.0), (5.0, 0.5), (10.0, 0.8), (20.0, 1.0)])
    }

    pub fn validate(&self) -> Result<()> {
        self.liquidity_curve.validate("liquidity")?;
        self.volume_curve.validate("volume")?;
        self.short_momentum_curve.validate("short momentum")?;
        self.long_momentum_curve.validate("long momentum")?;
        self.volatility_curve.validate("volatility")?;
        if self.short_bar_label.is_empty() || self.long_bar_label.is_empty() {
            bail!("bar interval labels must not be empty");
        }
        if self.max_spread_pct <= 0.0 || self.max_impact_pct <= 0.0 {
            bail!("MAX_SPREAD_PCT and MAX_IMPACT_PCT must be > 0");
        }
        if self.max_route_hops == 0 || self.max_route_deviation_pct <= 0.0 {
            bail!("MAX_ROUTE_HOPS and MAX_ROUTE_DEVIATION_PCT must be > 0");
        }
        if self.dq_penalty_per_missing < 0.0 || self.dq_penalty_per_missing > 1.0 {
            bail!("DQ_PENALTY_PER_MISSING must be between 0.0 and 1.0");
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_liquidity_headsup: 25_000.0,
            min_liquidity_actionable: 150_000.0,
            min_volume_headsup: 50_000.0,
            min_volume_actionable: 500_000.0,
            short_bar_label: "5m".to_string(),
            long_bar_label: "15m".to_string(),
            min_short_momentum_pct: 1.0,
            min_long_momentum_pct: 2.0,
            liquidity_curve: Self::liquidity_curve_for(25_000.0, 150_000.0),
            volume_curve: Self::volume_curve_for(50_000.0, 500_000.0),
            short_momentum_curve: Self::short_momentum_curve_for(1.0, 12.0),
            long_momentum_curve: Self::long_momentum_curve_for(2.0, 60.0),
            volatility_curve: Self::default_volatility_curve(),
            max_spread_pct: 2.5,
            max_impact_pct: 1.5,
            max_route_hops: 3,
            max_route_deviation_pct: 0.8,
            young_token_hours: 72.0,
            max_top_holder_pct: 25.0,
            min_fdv_liq: 2.0,
            max_fdv_liq: 150.0,
            preferred_min_fdv_liq: 5.0,
            preferred_max_fdv_liq: 50.0,
            dq_penalty_per_missing: 0.08,
            min_dq_for_actionable: 0.7,
            relative_strength_default: 0.7,
        }
    }
}

/// Per-token signal evaluation.
///
/// Factor scores and reasons come from [`SignalCalculator`]; confidence,
/// gates and band are filled in by the later pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalResult {
    pub mint: String,
    pub symbol: String,

    pub s1_liquidity: f64,
    pub s2_volume: f64,
    pub s3_momentum_short: f64,
    pub s4_momentum_long: f64,
    pub s5_volatility: f64,
    pub s6_price_discovery: f64,
    pub s7_rug_risk: f64,
    pub s8_tradability: f64,
    pub s9_relative_strength: f64,
    pub s10_route_quality: f64,
    pub n1_hygiene: f64,

    pub data_quality: f64,
    pub confidence: u8,
    pub band: Band,
    pub entry_confirmed: bool,
    pub net_edge_ok: bool,
    pub reasons: Vec<String>,
    /// Timestamp of the update the result was computed from
    pub computed_at: DateTime<Utc>,
}

impl SignalResult {
    /// The ten weighted factors, in S1..S10 order
    pub fn weighted_factors(&self) -> [f64; 10] {
        [
            self.s1_liquidity,
            self.s2_volume,
            self.s3_momentum_short,
            self.s4_momentum_long,
            self.s5_volatility,
            self.s6_price_discovery,
            self.s7_rug_risk,
            self.s8_tradability,
            self.s9_relative_strength,
            self.s10_route_quality,
        ]
    }

    /// Factor scores as a JSON object keyed by factor name
    pub fn factors_json(&self) -> serde_json::Value {
        serde_json::json!({
            "s1_liquidity": self.s1_liquidity,
            "s2_volume": self.s2_volume,
            "s3_momentum_short": self.s3_momentum_short,
            "s4_momentum_long": self.s4_momentum_long,
            "s5_volatility": self.s5_volatility,
            "s6_price_discovery": self.s6_price_discovery,
            "s7_rug_risk": self.s7_rug_risk,
            "s8_tradability": self.s8_tradability,
            "s9_relative_strength": self.s9_relative_strength,
            "s10_route_quality": self.s10_route_quality,
            "n1_hygiene": self.n1_hygiene,
        })
    }
}

/// Computes factor scores for market updates
pub struct SignalCalculator {
    config: SignalConfig,
    relative_strength: Arc<dyn RelativeStrength>,
}

impl SignalCalculator {
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    pub fn with_config(config: SignalConfig) -> Self {
        info!("📐 Initializing signal calculator:");
        info!("   Liquidity floors: heads-up ${:.0}, actionable ${:.0}",
              config.min_liquidity_headsup, config.min_liquidity_actionable);
        info!("   Volume floors: heads-up ${:.0}, actionable ${:.0}",
              config.min_volume_headsup, config.min_volume_actionable);
        info!("   Momentum bars: short={} long={}",
              config.short_bar_label, config.long_bar_label);
        info!("   Tradability caps: spread {:.2}%, impact {:.2}%, {} hops, dev {:.2}%",
              config.max_spread_pct, config.max_impact_pct,
              config.max_route_hops, config.max_route_deviation_pct);

        let relative_strength = Arc::new(ConstantRelativeStrength(config.relative_strength_default));
        Self { config, relative_strength }
    }

    /// Replace the S9 provider
    pub fn with_relative_strength(mut self, provider: Arc<dyn RelativeStrength>) -> Self {
        self.relative_strength = provider;
        self
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn calculate_signals(
        &self,
        update: &MarketUpdate,
        metadata: Option<&TokenMetadata>,
        known_good: &HashSet<String>,
    ) -> SignalResult {
        let s2 = self.volume_score(update);
        let s5 = self.volatility_score(update);

        let mut result = SignalResult {
            mint: update.mint_base.clone(),
            symbol: update.symbol.clone(),
            s1_liquidity: self.liquidity_score(update),
            s2_volume: s2,
            s3_momentum_short: self.short_momentum_score(update),
            s4_momentum_long: self.long_momentum_score(update),
            s5_volatility: s5,
            s6_price_discovery: clamp01(0.4 * s2 + 0.6 * s5.min(0.8)),
            s7_rug_risk: self.rug_risk_score(update, metadata),
            s8_tradability: self.tradability_score(update),
            s9_relative_strength: clamp01(self.relative_strength.score(update)),
            s10_route_quality: self.route_quality_score(update),
            n1_hygiene: if known_good.contains(&update.mint_base) { 1.0 } else { 0.0 },
            data_quality: self.data_quality(update),
            confidence: 0,
            band: Band::Watch,
            entry_confirmed: false,
            net_edge_ok: false,
            reasons: Vec::new(),
            computed_at: update.timestamp,
        };
        result.reasons = self.generate_reasons(update, metadata, &result);
        result
    }

    /// Short-horizon momentum in percent, if the short bar is usable
    pub fn short_momentum_pct(&self, update: &MarketUpdate) -> Option<f64> {
        update.bar(&self.config.short_bar_label).and_then(|bar| bar.pct_change())
    }

    /// Long-horizon momentum in percent, if the long bar is usable
    pub fn long_momentum_pct(&self, update: &MarketUpdate) -> Option<f64> {
        update.bar(&self.config.long_bar_label).and_then(|bar| bar.pct_change())
    }

    fn liquidity_score(&self, update: &MarketUpdate) -> f64 {
        if !(update.liq_usd > 0.0) {
            return 0.0;
        }
        self.config.liquidity_curve.eval(update.liq_usd)
    }

    fn volume_score(&self, update: &MarketUpdate) -> f64 {
        if !(update.vol24h_usd > 0.0) {
            return 0.0;
        }
        self.config.volume_curve.eval(update.vol24h_usd)
    }

    fn short_momentum_score(&self, update: &MarketUpdate) -> f64 {
        match self.short_momentum_pct(update) {
            Some(pct) => self.config.short_momentum_curve.eval(pct),
            None => 0.5,
        }
    }

    fn long_momentum_score(&self, update: &MarketUpdate) -> f64 {
        // Missing bar flows through the curve as zero momentum.
        let pct = self.long_momentum_pct(update).unwrap_or(0.0);
        self.config.long_momentum_curve.eval(pct)
    }

    fn volatility_score(&self, update: &MarketUpdate) -> f64 {
        match update.bar(&self.config.long_bar_label).and_then(|bar| bar.range_pct()) {
            Some(range) => self.config.volatility_curve.eval(range),
            None => 0.5,
        }
    }

    fn rug_risk_score(&self, update: &MarketUpdate, metadata: Option<&TokenMetadata>) -> f64 {
        let Some(meta) = metadata else {
            return 0.5;
        };
        let age_factor = (update.age_hours / 720.0).clamp(0.0, 1.0);
        let holder_factor = if meta.top_holder_pct > 0.0 {
            (1.0 - meta.top_holder_pct / 100.0).max(0.0)
        } else {
            1.0
        };
        let auth_factor = if meta.risky_authorities { 0.7 } else { 1.0 };
        clamp01((0.7 * age_factor * holder_factor * auth_factor).min(0.9))
    }

    fn tradability_score(&self, update: &MarketUpdate) -> f64 {
        let cfg = &self.config;
        if update.spread_pct > cfg.max_spread_pct || update.impact_1pct_pct > cfg.max_impact_pct {
            return 0.0;
        }
        let spread_headroom = 1.0 - update.spread_pct / cfg.max_spread_pct;
        let impact_headroom = 1.0 - update.impact_1pct_pct / cfg.max_impact_pct;
        clamp01(0.4 * spread_headroom + 0.6 * impact_headroom)
    }

    fn route_is_valid(&self, update: &MarketUpdate) -> bool {
        let route = &update.route;
        route.ok
            && route.hops <= self.config.max_route_hops
            && route.deviation_pct <= self.config.max_route_deviation_pct
    }

    fn route_quality_score(&self, update: &MarketUpdate) -> f64 {
        if !self.route_is_valid(update) {
            return 0.0;
        }
        let route = &update.route;
        let max_hops = self.config.max_route_hops as f64;
        let hop_headroom = if max_hops > 1.0 {
            1.0 - (route.hops.max(1) as f64 - 1.0) / (max_hops - 1.0)
        } else {
            1.0
        };
        let deviation_headroom = 1.0 - route.deviation_pct / self.config.max_route_deviation_pct;
        clamp01(0.3 * hop_headroom + 0.7 * deviation_headroom)
    }

    fn data_quality(&self, update: &MarketUpdate) -> f64 {
        let missing = [
            !(update.liq_usd > 0.0),
            !(update.vol24h_usd > 0.0),
            self.short_momentum_pct(update).is_none(),
            self.long_momentum_pct(update).is_none(),
            !(update.spread_pct > 0.0),
            !(update.impact_1pct_pct > 0.0),
        ]
        .iter()
        .filter(|&&m| m)
        .count();

        clamp01(1.0 - self.config.dq_penalty_per_missing * missing as f64)
    }

    fn generate_reasons(
        &self,
        update: &MarketUpdate,
        metadata: Option<&TokenMetadata>,
        result: &SignalResult,
    ) -> Vec<String> {
        let cfg = &self.config;
        let mut reasons = Vec::new();

        if update.liq_usd >= cfg.min_liquidity_actionable {
            reasons.push(format!("Liq ${:.1}k", update.liq_usd / 1_000.0));
        } else if update.liq_usd >= cfg.min_liquidity_headsup {
            reasons.push(format!("Liq ${:.1}k (low)", update.liq_usd / 1_000.0));
        }

        if update.vol24h_usd >= cfg.min_volume_actionable {
            reasons.push(format!("Vol24h ${:.1}M", update.vol24h_usd / 1_000_000.0));
        } else if update.vol24h_usd >= cfg.min_volume_headsup {
            reasons.push(format!("Vol24h ${:.1}k (low)", update.vol24h_usd / 1_000.0));
        }

        if let Some(pct) = self.short_momentum_pct(update) {
            if pct >= cfg.min_short_momentum_pct {
                reasons.push(format!("m1h +{:.1}%", pct));
            } else if pct <= -5.0 {
                reasons.push(format!("m1h {:.1}%", pct));
            }
        }

        if let Some(pct) = self.long_momentum_pct(update) {
            if pct >= cfg.min_long_momentum_pct {
                reasons.push(format!("m24h +{:.1}%", pct));
            } else if pct <= -10.0 {
                reasons.push(format!("m24h {:.1}%", pct));
            }
        }

        if update.age_hours < cfg.young_token_hours {
            reasons.push(format!("age {:.1}h (young)", update.age_hours));
        } else {
            reasons.push(format!("age {}d", (update.age_hours / 24.0) as u64));
        }

        if result.s8_tradability >= 0.8 {
            reasons.push(format!("spread {:.2}%, impact {:.2}%",
                                 update.spread_pct, update.impact_1pct_pct));
        } else if update.spread_pct > cfg.max_spread_pct || update.impact_1pct_pct > cfg.max_impact_pct {
            reasons.push(format!("poor liquidity: spread {:.2}%, impact {:.2}%",
                                 update.spread_pct, update.impact_1pct_pct));
        }

        if self.route_is_valid(update) {
            reasons.push(format!("route {} hops, dev {:.2}%",
                                 update.route.hops, update.route.deviation_pct));
        } else {
            reasons.push("route issues".to_string());
        }

        if let Some(meta) = metadata {
            if let Some(fdv) = meta.fdv_usd.filter(|_| update.liq_usd > 0.0) {
                let ratio = fdv / update.liq_usd;
                if ratio > cfg.max_fdv_liq {
                    reasons.push(format!("FDV/Liq {:.1} (high)", ratio));
                } else if ratio < cfg.min_fdv_liq {
                    reasons.push(format!("FDV/Liq {:.1} (low)", ratio));
                } else if ratio >= cfg.preferred_min_fdv_liq && ratio <= cfg.preferred_max_fdv_liq {
                    reasons.push(format!("FDV/Liq {:.1} (good)", ratio));
                }
            }
            if meta.top_holder_pct > cfg.max_top_holder_pct {
                reasons.push(format!("top holder {:.1}% (high)", meta.top_holder_pct));
            }
            if meta.risky_authorities {
                reasons.push("risky authorities".to_string());
            }
            if !meta.on_token_list {
                reasons.push("not on token list".to_string());
            }
        }

        if result.data_quality < cfg.min_dq_for_actionable {
            reasons.push(format!("DQ {:.2} (low)", result.data_quality));
        }

        reasons
    }
}

impl Default for SignalCalculator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::udp_bus::messages::{OhlcvBar, RouteInfo};
    use std::collections::BTreeMap;

    fn bar(open: f64, close: f64, high: f64, low: f64) -> OhlcvBar {
        OhlcvBar { open, high, low, close, volume_usd: 10_000.0 }
    }

    fn update() -> MarketUpdate {
        let mut bars = BTreeMap::new();
        bars.insert("5m".to_string(), bar(1.0, 1.03, 1.04, 0.99));
        bars.insert("15m".to_string(), bar(1.0, 1.05, 1.08, 0.99));
        MarketUpdate {
            pool_id: "pool".to_string(),
            mint_base: "MintA".to_string(),
            mint_quote: "USDC".to_string(),
            symbol: "AAA".to_string(),
            price_usd: 1.05,
            liq_usd: 200_000.0,
            vol24h_usd: 800_000.0,
            spread_pct: 0.5,
            impact_1pct_pct: 0.3,
            age_hours: 48.0,
            route: RouteInfo { ok: true, hops: 2, deviation_pct: 0.1 },
            bars,
            timestamp: Utc::now(),
        }
    }

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            mint: "MintA".to_string(),
            symbol: "AAA".to_string(),
            on_token_list: true,
            top_holder_pct: 10.0,
            risky_authorities: false,
            first_liquidity_ts: None,
            fdv_usd: None,
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
    }

    #[test]
    fn test_curve_interpolation_and_floor() {
        let curve = SignalConfig::liquidity_curve_for(25_000.0, 150_000.0);
        assert_eq!(curve.eval(0.0), 0.0);
        assert_eq!(curve.eval(24_999.0), 0.0);
        assert_close(curve.eval(25_000.0), 0.3);
        assert_close(curve.eval(87_500.0), 0.4);
        assert_close(curve.eval(150_000.0), 0.5);
        assert_close(curve.eval(200_000.0), 0.5 + 0.3 * 50_000.0 / 350_000.0);
        assert_eq!(curve.eval(5_000_000.0), 1.0);
        assert_eq!(curve.eval(f64::NAN), 0.0);
    }

    #[test]
    fn test_curve_validation() {
        assert!(SignalConfig::default().validate().is_ok());

        let overlapping = PiecewiseCurve::new(vec![(0.0, 0.1), (0.0, 0.2)]);
        assert!(overlapping.validate("x").is_err());

        let decreasing = PiecewiseCurve::new(vec![(0.0, 0.5), (1.0, 0.4)]);
        assert!(decreasing.validate("x").is_err());

        // min momentum above the fixed 6% knot breaks ordering
        let bad = SignalConfig::short_momentum_curve_for(7.0, 12.0);
        assert!(bad.validate("short").is_err());
    }

    #[test]
    fn test_parse_knots() {
        let knots = PiecewiseCurve::parse_knots("0:0, 5:0.5,10:0.8").unwrap();
        assert_eq!(knots, vec![(0.0, 0.0), (5.0, 0.5), (10.0, 0.8)]);
        assert!(PiecewiseCurve::parse_knots("0-0").is_err());
    }

    #[test]
    fn test_monotonic_liquidity_and_volume() {
        let calc = SignalCalculator::new();
        let known = HashSet::new();
        let mut u = update();
        let mut last_s1 = 0.0;
        let mut last_s2 = 0.0;
        for step in 0..300 {
            u.liq_usd = step as f64 * 10_000.0;
            u.vol24h_usd = step as f64 * 40_000.0;
            let r = calc.calculate_signals(&u, None, &known);
            assert!(r.s1_liquidity >= last_s1);
            assert!(r.s2_volume >= last_s2);
            last_s1 = r.s1_liquidity;
            last_s2 = r.s2_volume;
        }
        assert_eq!(last_s1, 1.0);
        assert_eq!(last_s2, 1.0);
    }

    #[test]
    fn test_momentum_scores() {
        let calc = SignalCalculator::new();
        let r = calc.calculate_signals(&update(), None, &HashSet::new());
        // +3% short: between (1, 0.7) and (6, 0.9)
        assert_close(r.s3_momentum_short, 0.7 + 0.2 * 2.0 / 5.0);
        // +5% long: between (2, 0.7) and (20, 0.9)
        assert_close(r.s4_momentum_long, 0.7 + 0.2 * 3.0 / 18.0);
    }

    #[test]
    fn test_missing_bars_fall_back_to_neutral() {
        let calc = SignalCalculator::new();
        let mut u = update();
        u.bars.clear();
        let r = calc.calculate_signals(&u, None, &HashSet::new());
        assert_eq!(r.s3_momentum_short, 0.5);
        assert_eq!(r.s4_momentum_long, 0.5);
        assert_eq!(r.s5_volatility, 0.5);
        assert_close(r.s6_price_discovery, 0.4 * r.s2_volume + 0.6 * 0.5);
    }

    #[test]
    fn test_rug_risk() {
        let calc = SignalCalculator::new();
        let mut u = update();
        assert_eq!(calc.calculate_signals(&u, None, &HashSet::new()).s7_rug_risk, 0.5);

        let meta = metadata();
        let r = calc.calculate_signals(&u, Some(&meta), &HashSet::new());
        assert_close(r.s7_rug_risk, 0.7 * (48.0 / 720.0) * 0.9);

        u.age_hours = 10_000.0;
        let r = calc.calculate_signals(&u, Some(&meta), &HashSet::new());
        assert_close(r.s7_rug_risk, 0.7 * 0.9);

        let mut risky = meta.clone();
        risky.risky_authorities = true;
        risky.top_holder_pct = 0.0;
        let r = calc.calculate_signals(&u, Some(&risky), &HashSet::new());
        assert_close(r.s7_rug_risk, 0.7 * 0.7);
    }

    #[test]
    fn test_tradability_and_route() {
        let calc = SignalCalculator::new();
        let mut u = update();
        let r = calc.calculate_signals(&u, None, &HashSet::new());
        assert_close(r.s8_tradability, 0.4 * (1.0 - 0.5 / 2.5) + 0.6 * (1.0 - 0.3 / 1.5));
        assert_close(r.s10_route_quality, 0.3 * 0.5 + 0.7 * (1.0 - 0.1 / 0.8));

        u.spread_pct = 3.0;
        u.route.hops = 4;
        let r = calc.calculate_signals(&u, None, &HashSet::new());
        assert_eq!(r.s8_tradability, 0.0);
        assert_eq!(r.s10_route_quality, 0.0);
        assert!(r.reasons.iter().any(|s| s.starts_with("poor liquidity")));
        assert!(r.reasons.iter().any(|s| s == "route issues"));
    }

    #[test]
    fn test_hygiene_membership() {
        let calc = SignalCalculator::new();
        let mut known = HashSet::new();
        assert_eq!(calc.calculate_signals(&update(), None, &known).n1_hygiene, 0.0);
        known.insert("MintA".to_string());
        assert_eq!(calc.calculate_signals(&update(), None, &known).n1_hygiene, 1.0);
    }

    #[test]
    fn test_data_quality_penalties() {
        let calc = SignalCalculator::new();
        assert_eq!(calc.calculate_signals(&update(), None, &HashSet::new()).data_quality, 1.0);

        let mut u = update();
        u.liq_usd = 0.0;
        u.vol24h_usd = 0.0;
        u.bars.clear();
        let r = calc.calculate_signals(&u, None, &HashSet::new());
        assert_close(r.data_quality, 1.0 - 4.0 * 0.08);
        assert!(r.reasons.iter().any(|s| s.starts_with("DQ ")));
    }

    #[test]
    fn test_reason_order() {
        let calc = SignalCalculator::new();
        let mut meta = metadata();
        meta.on_token_list = false;
        meta.top_holder_pct = 30.0;
        meta.fdv_usd = Some(2_000_000.0);
        let r = calc.calculate_signals(&update(), Some(&meta), &HashSet::new());
        assert_eq!(r.reasons, vec![
            "Liq $200.0k".to_string(),
            "Vol24h $0.8M".to_string(),
            "m1h +3.0%".to_string(),
            "m24h +5.0%".to_string(),
            "age 48.0h (young)".to_string(),
            "spread 0.50%, impact 0.30%".to_string(),
            "route 2 hops, dev 0.10%".to_string(),
            "FDV/Liq 10.0 (good)".to_string(),
            "top holder 30.0% (high)".to_string(),
            "not on token list".to_string(),
        ]);
    }

    #[test]
    fn test_pluggable_relative_strength() {
        struct Fixed;
        impl RelativeStrength for Fixed {
            fn score(&self, _update: &MarketUpdate) -> f64 {
                1.7
            }
        }
        let calc = SignalCalculator::new();
        assert_eq!(calc.calculate_signals(&update(), None, &HashSet::new()).s9_relative_strength, 0.7);
        let calc = SignalCalculator::new().with_relative_strength(Arc::new(Fixed));
        assert_eq!(calc.calculate_signals(&update(), None, &HashSet::new()).s9_relative_strength, 1.0);
    }

    #[test]
    fn test_calculation_is_pure() {
        let calc = SignalCalculator::new();
        let meta = metadata();
        let known: HashSet<String> = ["MintA".to_string()].into_iter().collect();
        let a = calc.calculate_signals(&update(), Some(&meta), &known);
        let mut b_update = update();
        b_update.timestamp = a.computed_at;
        let a = calc.calculate_signals(&b_update, Some(&meta), &known);
        let b = calc.calculate_signals(&b_update, Some(&meta), &known);
        assert_eq!(a, b);
    }
}
