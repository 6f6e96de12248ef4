//! 🎯 Confidence Scoring
//!
//! Folds the factor scores into a single 0-100 confidence, applies the
//! hygiene and rug-risk penalties, biases it by market regime and maps the
//! result to a severity band.

use std::fmt;

use anyhow::{bail, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::decision_engine::signals::{clamp01, SignalResult};

/// Severity classification of a signal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Watch,
    HeadsUp,
    Actionable,
    HighConviction,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Watch, Band::HeadsUp, Band::Actionable, Band::HighConviction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Watch => "watch",
            Band::HeadsUp => "heads_up",
            Band::Actionable => "actionable",
            Band::HighConviction => "high_conviction",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring configuration
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// S1..S10 weights, must sum to 1.0
    pub weights: [f64; 10],
    pub hygiene_penalty: i32,
    /// Ceiling applied when S7 (rug risk) is below 0.5
    pub rug_risk_cap: i32,
    pub min_dq_for_actionable: f64,
    /// Upper bound on the data-quality ceiling
    pub dq_ceiling_max: i32,
    pub risk_on_adjustment: i32,
    pub risk_off_adjustment: i32,
    pub headsup_min: u8,
    pub headsup_max: u8,
    pub actionable_min: u8,
    pub high_conviction_min: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: [0.15, 0.15, 0.10, 0.10, 0.05, 0.05, 0.20, 0.10, 0.05, 0.05],
            hygiene_penalty: 10,
            rug_risk_cap: 55,
            min_dq_for_actionable: 0.7,
            dq_ceiling_max: 50,
            risk_on_adjustment: 5,
            risk_off_adjustment: -10,
            headsup_min: 60,
            headsup_max: 69,
            actionable_min: 70,
            high_conviction_min: 85,
        }
    }
}

impl ScoringConfig {
    /// Band thresholds must leave every band reachable; weights must be a
    /// proper convex combination.
    pub fn validate(&self) -> Result<()> {
        if self.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("factor weights must be finite and non-negative");
        }
        let sum: f64 = self.weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            bail!("factor weights must sum to 1.0 (got {:.6})", sum);
        }
        if self.headsup_min > self.headsup_max {
            bail!("HEADSUP_MIN ({}) must be <= HEADSUP_MAX ({})", self.headsup_min, self.headsup_max);
        }
        if self.headsup_max >= self.actionable_min {
            bail!("HEADSUP_MAX ({}) must be < ACTIONABLE_MIN ({}), otherwise heads-up is unreachable",
                  self.headsup_max, self.actionable_min);
        }
        if self.actionable_min > self.high_conviction_min {
            bail!("ACTIONABLE_MIN ({}) must be <= HIGH_CONVICTION_MIN ({})",
                  self.actionable_min, self.high_conviction_min);
        }
        if self.high_conviction_min > 100 {
            bail!("HIGH_CONVICTION_MIN must be <= 100");
        }
        if !(0.0..=1.0).contains(&self.min_dq_for_actionable) {
            bail!("MIN_DQ_FOR_ACTIONABLE must be between 0.0 and 1.0");
        }
        if self.risk_on_adjustment < 0 || self.risk_off_adjustment > 0 {
            bail!("risk-on adjustment must be >= 0 and risk-off adjustment <= 0");
        }
        Ok(())
    }
}

/// Confidence scorer
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::with_config(ScoringConfig::default())
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        info!("🎯 Initializing confidence scorer:");
        info!("   Bands: heads-up {}-{}, actionable {}+, high conviction {}+",
              config.headsup_min, config.headsup_max,
              config.actionable_min, config.high_conviction_min);
        info!("   Penalties: hygiene -{}, rug cap {}, DQ floor {:.2}",
              config.hygiene_penalty, config.rug_risk_cap, config.min_dq_for_actionable);
        info!("   Regime bias: risk-on {:+}, risk-off {:+}",
              config.risk_on_adjustment, config.risk_off_adjustment);
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Ceiling imposed by low data quality, if the floor is not met.
    pub fn data_quality_ceiling(&self, data_quality: f64) -> Option<u8> {
        let dq = clamp01(data_quality);
        if dq >= self.config.min_dq_for_actionable {
            return None;
        }
        let ceiling = ((dq * 100.0).round() as i32).min(self.config.dq_ceiling_max);
        Some(ceiling.clamp(0, 100) as u8)
    }

    /// Raw confidence before the regime bias
    pub fn calculate_confidence(&self, signals: &SignalResult) -> u8 {
        if let Some(ceiling) = self.data_quality_ceiling(signals.data_quality) {
            return ceiling;
        }

        let weighted_sum: f64 = signals
            .weighted_factors()
            .iter()
            .zip(self.config.weights.iter())
            .map(|(score, weight)| clamp01(*score) * weight)
            .sum();

        // Truncate like an integer cast; the epsilon absorbs float noise
        // such as 0.8 summing to 0.79999.
        let mut score = (weighted_sum * 100.0 + 1e-9).floor() as i32;

        if signals.n1_hygiene < 0.5 {
            score -= self.config.hygiene_penalty;
        }
        if signals.s7_rug_risk < 0.5 {
            score = score.min(self.config.rug_risk_cap);
        }

        score.clamp(0, 100) as u8
    }

    pub fn apply_risk_adjustment(&self, score: u8, risk_on: bool) -> u8 {
        let adjustment = if risk_on {
            self.config.risk_on_adjustment
        } else {
            self.config.risk_off_adjustment
        };
        (score as i32 + adjustment).clamp(0, 100) as u8
    }

    /// Confidence including the regime bias. The data-quality ceiling still
    /// holds after the bias.
    pub fn score(&self, signals: &SignalResult, risk_on: bool) -> u8 {
        let adjusted = self.apply_risk_adjustment(self.calculate_confidence(signals), risk_on);
        match self.data_quality_ceiling(signals.data_quality) {
            Some(ceiling) => adjusted.min(ceiling),
            None => adjusted,
        }
    }

    pub fn determine_band(&self, score: u8, entry_confirmed: bool, net_edge_ok: bool) -> Band {
        if !entry_confirmed || !net_edge_ok {
            return Band::Watch;
        }
        let cfg = &self.config;
        if score >= cfg.high_conviction_min {
            Band::HighConviction
        } else if score >= cfg.actionable_min {
            Band::Actionable
        } else if score >= cfg.headsup_min && score <= cfg.headsup_max {
            Band::HeadsUp
        } else {
            Band::Watch
        }
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn signals_with(all: f64) -> SignalResult {
        SignalResult {
            mint: "MintA".to_string(),
            symbol: "AAA".to_string(),
            s1_liquidity: all,
            s2_volume: all,
            s3_momentum_short: all,
            s4_momentum_long: all,
            s5_volatility: all,
            s6_price_discovery: all,
            s7_rug_risk: all,
            s8_tradability: all,
            s9_relative_strength: all,
            s10_route_quality: all,
            n1_hygiene: 1.0,
            data_quality: 1.0,
            confidence: 0,
            band: Band::Watch,
            entry_confirmed: false,
            net_edge_ok: false,
            reasons: Vec::new(),
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_weighted_sum() {
        let scorer = ConfidenceScorer::new();
        assert_eq!(scorer.calculate_confidence(&signals_with(1.0)), 100);
        assert_eq!(scorer.calculate_confidence(&signals_with(0.8)), 80);
    }

    #[test]
    fn test_hygiene_penalty() {
        let scorer = ConfidenceScorer::new();
        let mut s = signals_with(0.8);
        s.n1_hygiene = 0.0;
        assert_eq!(scorer.calculate_confidence(&s), 70);
    }

    #[test]
    fn test_rug_risk_cap() {
        let scorer = ConfidenceScorer::new();
        let mut s = signals_with(1.0);
        s.s7_rug_risk = 0.4;
        // 100 - 0.2*60 = 88, capped to 55
        assert_eq!(scorer.calculate_confidence(&s), 55);
    }

    #[test]
    fn test_data_quality_dominates() {
        let scorer = ConfidenceScorer::new();
        let mut s = signals_with(1.0);
        s.data_quality = 0.52;
        assert_eq!(scorer.calculate_confidence(&s), 50);
        s.data_quality = 0.36;
        assert_eq!(scorer.calculate_confidence(&s), 36);
        // ceiling survives a risk-on bias
        assert_eq!(scorer.score(&s, true), 36);
        assert_eq!(scorer.score(&s, false), 26);
    }

    #[test]
    fn test_risk_adjustment_clamps() {
        let scorer = ConfidenceScorer::new();
        assert_eq!(scorer.apply_risk_adjustment(98, true), 100);
        assert_eq!(scorer.apply_risk_adjustment(5, false), 0);
        assert_eq!(scorer.apply_risk_adjustment(70, true), 75);
        assert_eq!(scorer.apply_risk_adjustment(70, false), 60);
    }

    #[test]
    fn test_band_gates_dominate() {
        let scorer = ConfidenceScorer::new();
        for score in 0..=100u8 {
            assert_eq!(scorer.determine_band(score, false, true), Band::Watch);
            assert_eq!(scorer.determine_band(score, true, false), Band::Watch);
        }
    }

    #[test]
    fn test_band_thresholds() {
        let scorer = ConfidenceScorer::new();
        assert_eq!(scorer.determine_band(59, true, true), Band::Watch);
        assert_eq!(scorer.determine_band(60, true, true), Band::HeadsUp);
        assert_eq!(scorer.determine_band(69, true, true), Band::HeadsUp);
        assert_eq!(scorer.determine_band(70, true, true), Band::Actionable);
        assert_eq!(scorer.determine_band(84, true, true), Band::Actionable);
        assert_eq!(scorer.determine_band(85, true, true), Band::HighConviction);
    }

    #[test]
    fn test_misconfigured_bands_fall_through_to_watch() {
        let config = ScoringConfig {
            headsup_min: 80,
            headsup_max: 75,
            actionable_min: 95,
            high_conviction_min: 90,
            ..ScoringConfig::default()
        };
        assert!(config.validate().is_err());
        let scorer = ConfidenceScorer::with_config(config);
        assert_eq!(scorer.determine_band(78, true, true), Band::Watch);
        assert_eq!(scorer.determine_band(92, true, true), Band::HighConviction);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScoringConfig::default().validate().is_ok());

        let overlapping = ScoringConfig { headsup_max: 70, ..ScoringConfig::default() };
        assert!(overlapping.validate().is_err());

        let mut bad_weights = ScoringConfig::default();
        bad_weights.weights[0] = 0.5;
        assert!(bad_weights.validate().is_err());
    }

    #[test]
    fn test_confidence_bounded_for_extremes() {
        let scorer = ConfidenceScorer::new();
        for value in [-5.0, 0.0, 0.3, 1.0, 7.0, f64::NAN] {
            let mut s = signals_with(value);
            s.data_quality = value;
            s.n1_hygiene = 0.0;
            let score = scorer.score(&s, true);
            assert!(score <= 100);
        }
    }

    #[test]
    fn test_band_serde_names() {
        assert_eq!(serde_json::to_string(&Band::HeadsUp).unwrap(), "\"heads_up\"");
        assert_eq!(Band::HighConviction.to_string(), "high_conviction");
    }
}
