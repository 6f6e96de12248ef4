//! 🌡️ Market regime detection
//!
//! Tracks the reference asset (SOL) over a rolling window and derives a
//! binary risk-on / risk-off state that biases confidence.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Regime detector configuration
#[derive(Debug, Clone)]
pub struct RegimeConfig {
    /// Updates for this mint feed the detector instead of the scorer
    pub reference_mint: String,
    pub window_hours: i64,
    /// Mean 24h change (percent) that must be exceeded for risk-on
    pub risk_on_change_pct: f64,
    /// Momentum (percent vs. window mean) that must be exceeded for risk-on
    pub risk_on_momentum_pct: f64,
    pub min_points: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            reference_mint: "So11111111111111111111111111111111111111112".to_string(),
            window_hours: 24,
            risk_on_change_pct: 1.0,
            risk_on_momentum_pct: 0.0,
            min_points: 3,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_hours <= 0 {
            bail!("REGIME_WINDOW_HOURS must be > 0");
        }
        if self.min_points < 2 {
            bail!("REGIME_MIN_POINTS must be >= 2");
        }
        if self.reference_mint.is_empty() {
            bail!("REFERENCE_MINT must be set");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct RegimePoint {
    price: f64,
    pct_change_24h: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RegimeWindow {
    points: VecDeque<RegimePoint>,
    risk_on: bool,
    last_mean_change: f64,
    last_momentum: f64,
    /// Most recent 24h change fed in, reused when a print carries none
    last_change_pct: f64,
    transitions: u64,
}

/// Point-in-time view of the detector
#[derive(Debug, Clone, Default)]
pub struct RegimeSnapshot {
    pub risk_on: bool,
    pub points: usize,
    pub mean_change_pct: f64,
    pub momentum_pct: f64,
    pub last_price: Option<f64>,
    pub transitions: u64,
}

pub struct RegimeDetector {
    config: RegimeConfig,
    window: Mutex<RegimeWindow>,
}

impl RegimeDetector {
    pub fn new() -> Self {
        Self::with_config(RegimeConfig::default())
    }

    pub fn with_config(config: RegimeConfig) -> Self {
        info!("🌡️ Initializing regime detector:");
        info!("   Reference mint: {}", config.reference_mint);
        info!("   Window: {}h, min {} points", config.window_hours, config.min_points);
        info!("   Risk-on: mean change > {:.2}% and momentum > {:.2}%",
              config.risk_on_change_pct, config.risk_on_momentum_pct);
        Self {
            config,
            window: Mutex::new(RegimeWindow::default()),
        }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    pub fn is_reference(&self, mint: &str) -> bool {
        mint == self.config.reference_mint
    }

    pub fn update_regime(&self, price: f64, pct_change_24h: f64) -> bool {
        self.update_regime_at(price, pct_change_24h, Utc::now())
    }

    /// Feed a reference print whose 24h change may be unknown. A missing
    /// change repeats the last one seen (0 before any).
    pub fn update_reference_at(&self, price: f64, pct_change_24h: Option<f64>, now: DateTime<Utc>) -> bool {
        let change = match pct_change_24h {
            Some(change) => change,
            None => self.window.lock().unwrap().last_change_pct,
        };
        self.update_regime_at(price, change, now)
    }

    /// Append a point, evict old ones and recompute the state. Returns the
    /// resulting `risk_on`.
    pub fn update_regime_at(&self, price: f64, pct_change_24h: f64, now: DateTime<Utc>) -> bool {
        let mut window = self.window.lock().unwrap();

        let pct_change_24h = if pct_change_24h.is_finite() { pct_change_24h } else { 0.0 };
        window.last_change_pct = pct_change_24h;
        window.points.push_back(RegimePoint {
            price,
            pct_change_24h,
            timestamp: now,
        });
        let cutoff = now - Duration::hours(self.config.window_hours);
        while window.points.front().map_or(false, |p| p.timestamp < cutoff) {
            window.points.pop_front();
        }

        let was_risk_on = window.risk_on;
        let new_state = if window.points.len() < self.config.min_points {
            window.last_mean_change = 0.0;
            window.last_momentum = 0.0;
            false
        } else {
            let n = window.points.len();
            let mean_change = window.points.iter().map(|p| p.pct_change_24h).sum::<f64>() / n as f64;
            let prior_mean_price = window.points.iter().take(n - 1).map(|p| p.price).sum::<f64>()
                / (n - 1) as f64;
            let momentum = if prior_mean_price > 0.0 {
                (price / prior_mean_price - 1.0) * 100.0
            } else {
                0.0
            };
            window.last_mean_change = mean_change;
            window.last_momentum = momentum;
            mean_change > self.config.risk_on_change_pct && momentum > self.config.risk_on_momentum_pct
        };

        window.risk_on = new_state;
        if new_state != was_risk_on {
            window.transitions += 1;
            info!("🌡️ Regime changed: {} → {} (mean 24h {:.2}%, momentum {:.2}%, {} points)",
                  regime_str(was_risk_on), regime_str(new_state),
                  window.last_mean_change, window.last_momentum, window.points.len());
        } else {
            debug!("🌡️ Regime {} (price ${:.2}, {} points)",
                   regime_str(new_state), price, window.points.len());
        }
        new_state
    }

    pub fn is_risk_on(&self) -> bool {
        self.window.lock().unwrap().risk_on
    }

    pub fn regime_string(&self) -> &'static str {
        regime_str(self.is_risk_on())
    }

    pub fn snapshot(&self) -> RegimeSnapshot {
        let window = self.window.lock().unwrap();
        RegimeSnapshot {
            risk_on: window.risk_on,
            points: window.points.len(),
            mean_change_pct: window.last_mean_change,
            momentum_pct: window.last_momentum,
            last_price: window.points.back().map(|p| p.price),
            transitions: window.transitions,
        }
    }
}

impl Default for RegimeDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn regime_str(risk_on: bool) -> &'static str {
    if risk_on {
        "RISK-ON"
    } else {
        "RISK-OFF"
    }
}
