//! 💰 Position Sizer - hypothetical position size for an admitted signal
//!
//! Scales a per-slot base allocation by confidence and by how much size the
//! pool's liquidity can absorb, without letting cumulative deployment exceed
//! the configured maximum.

use anyhow::{bail, Result};
use log::{debug, info};

/// Position sizer configuration
#[derive(Debug, Clone)]
pub struct PositionSizerConfig {
    /// Portfolio value used for sizing (USD)
    pub portfolio_value_usd: f64,
    /// Fraction of pool liquidity a position may represent
    pub liquidity_size_factor: f64,
    pub max_positions: usize,
    /// Hard cap on deployed capital, % of portfolio
    pub max_deployed_pct: f64,
    /// Target deployment spread across all slots, % of portfolio
    pub default_deployed_pct: f64,
}

impl Default for PositionSizerConfig {
    fn default() -> Self {
        Self {
            portfolio_value_usd: 10_000.0,
            liquidity_size_factor: 0.008,
            max_positions: 3,
            max_deployed_pct: 35.0,
            default_deployed_pct: 30.0,
        }
    }
}

impl PositionSizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_positions == 0 {
            bail!("MAX_POSITIONS must be > 0");
        }
        if self.max_deployed_pct <= 0.0 || self.max_deployed_pct > 100.0 {
            bail!("MAX_DEPLOYED_PCT must be in (0, 100]");
        }
        if self.default_deployed_pct <= 0.0 || self.default_deployed_pct > self.max_deployed_pct {
            bail!("DEFAULT_DEPLOYED_PCT must be in (0, MAX_DEPLOYED_PCT]");
        }
        if self.portfolio_value_usd < 0.0 || self.liquidity_size_factor < 0.0 {
            bail!("PORTFOLIO_VALUE_USD and LIQUIDITY_SIZE_FACTOR must be >= 0");
        }
        Ok(())
    }
}

pub struct PositionSizer {
    config: PositionSizerConfig,
}

impl PositionSizer {
    pub fn new(config: PositionSizerConfig) -> Self {
        info!("💰 Position Sizer initialized:");
        info!("   Portfolio: ${:.2}", config.portfolio_value_usd);
        info!("   Slots: {}, deployed target {:.1}% (max {:.1}%)",
              config.max_positions, config.default_deployed_pct, config.max_deployed_pct);
        info!("   Liquidity factor: {:.4}", config.liquidity_size_factor);

        Self { config }
    }

    pub fn config(&self) -> &PositionSizerConfig {
        &self.config
    }

    /// Per-slot base allocation, % of portfolio
    pub fn base_pct(&self) -> f64 {
        self.config.default_deployed_pct / self.config.max_positions.max(1) as f64
    }

    /// Size in USD for `portfolio_value_usd`; zero once every slot is taken.
    pub fn calculate_position_size(
        &self,
        confidence: u8,
        liq_usd: f64,
        portfolio_value_usd: f64,
        active_positions: usize,
    ) -> f64 {
        if active_positions >= self.config.max_positions || !(portfolio_value_usd > 0.0) {
            return 0.0;
        }

        let base_pct = self.base_pct();
        let confidence_factor = confidence.min(100) as f64 / 100.0;
        let liquidity_factor = (liq_usd.max(0.0) * self.config.liquidity_size_factor / portfolio_value_usd).min(1.0);

        let max_additional_pct = self.config.max_deployed_pct - active_positions as f64 * base_pct;
        let size_pct = (base_pct * confidence_factor * liquidity_factor)
            .min(max_additional_pct)
            .max(0.0);

        let size_usd = portfolio_value_usd * size_pct / 100.0;
        debug!("💰 Sized position: conf={} liq=${:.0} active={} → {:.3}% (${:.2})",
               confidence, liq_usd, active_positions, size_pct, size_usd);
        size_usd
    }

    /// Same as [`calculate_position_size`](Self::calculate_position_size) using the configured portfolio value
    pub fn size_for(&self, confidence: u8, liq_usd: f64, active_positions: usize) -> f64 {
        self.calculate_position_size(confidence, liq_usd, self.config.portfolio_value_usd, active_positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(PositionSizerConfig::default())
    }

    #[test]
    fn test_base_allocation() {
        let s = sizer();
        assert!((s.base_pct() - 10.0).abs() < 1e-9);
        // deep pool, full confidence: 10% of 10k
        let size = s.size_for(100, 10_000_000.0, 0);
        assert!((size - 1_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_and_liquidity_scaling() {
        let s = sizer();
        let size = s.size_for(80, 10_000_000.0, 0);
        assert!((size - 800.0).abs() < 1e-6);

        // 500k * 0.008 / 10k = 0.4
        let size = s.size_for(100, 500_000.0, 0);
        assert!((size - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_slots_exhausted() {
        let s = sizer();
        assert_eq!(s.size_for(100, 10_000_000.0, 3), 0.0);
        assert_eq!(s.size_for(100, 10_000_000.0, 7), 0.0);
        assert_eq!(s.calculate_position_size(100, 1_000_000.0, 0.0, 0), 0.0);
    }

    #[test]
    fn test_max_deployed_cap() {
        let s = PositionSizer::new(PositionSizerConfig {
            max_positions: 4,
            max_deployed_pct: 32.0,
            default_deployed_pct: 32.0,
            ..PositionSizerConfig::default()
        });
        // base 8%, three active use 24%, 8% left
        let size = s.size_for(100, 10_000_000.0, 3);
        assert!((size - 800.0).abs() < 1e-6);

        let tight = PositionSizer::new(PositionSizerConfig {
            max_deployed_pct: 25.0,
            default_deployed_pct: 25.0,
            max_positions: 2,
            ..PositionSizerConfig::default()
        });
        // base 12.5%, one active → 12.5% left, not exceeded
        assert!((tight.size_for(100, 10_000_000.0, 1) - 1_250.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_validation() {
        assert!(PositionSizerConfig::default().validate().is_ok());
        let bad = PositionSizerConfig { max_positions: 0, ..PositionSizerConfig::default() };
        assert!(bad.validate().is_err());
        let bad = PositionSizerConfig { max_deployed_pct: 120.0, ..PositionSizerConfig::default() };
        assert!(bad.validate().is_err());
    }
}
