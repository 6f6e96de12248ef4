//! 🛡️ Alert Guardrails
//!
//! Admission control for outbound alerts: per-token cooldowns that depend on
//! the band, global and per-band sliding-window rate caps, and an operator
//! mute. All state sits behind one mutex so check-and-record is atomic.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use crate::decision_engine::scoring::Band;

/// Configuration for alert throttling
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub cooldown_high_conviction_mins: i64, // Default: 720
    pub cooldown_actionable_mins: i64,      // Default: 360
    pub cooldown_heads_up_mins: i64,        // Default: 60
    pub cooldown_watch_mins: i64,           // Default: 30

    pub rate_window_mins: i64,              // Default: 60
    pub global_max_per_window: usize,       // Default: 15
    pub high_conviction_max_per_window: usize,
    pub actionable_max_per_window: usize,
    pub heads_up_max_per_window: usize,
    pub watch_max_per_window: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            cooldown_high_conviction_mins: 720,
            cooldown_actionable_mins: 360,
            cooldown_heads_up_mins: 60,
            cooldown_watch_mins: 30,
            rate_window_mins: 60,
            global_max_per_window: 15,
            high_conviction_max_per_window: 3,
            actionable_max_per_window: 5,
            heads_up_max_per_window: 10,
            watch_max_per_window: 20,
        }
    }
}

impl ThrottleConfig {
    pub fn cooldown(&self, band: Band) -> Duration {
        let mins = match band {
            Band::HighConviction => self.cooldown_high_conviction_mins,
            Band::Actionable => self.cooldown_actionable_mins,
            Band::HeadsUp => self.cooldown_heads_up_mins,
            Band::Watch => self.cooldown_watch_mins,
        };
        Duration::minutes(mins)
    }

    pub fn band_cap(&self, band: Band) -> usize {
        match band {
            Band::HighConviction => self.high_conviction_max_per_window,
            Band::Actionable => self.actionable_max_per_window,
            Band::HeadsUp => self.heads_up_max_per_window,
            Band::Watch => self.watch_max_per_window,
        }
    }

    pub fn rate_window(&self) -> Duration {
        Duration::minutes(self.rate_window_mins)
    }

    /// History older than this can no longer affect any check
    pub fn retention(&self) -> Duration {
        Band::ALL
            .iter()
            .map(|b| self.cooldown(*b))
            .chain(std::iter::once(self.rate_window()))
            .max()
            .unwrap_or_else(|| self.rate_window())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate_window_mins <= 0 {
            bail!("THROTTLE_WINDOW_MINS must be > 0");
        }
        if self.cooldown_watch_mins < 0 {
            bail!("cooldowns must be >= 0");
        }
        if !(self.cooldown_high_conviction_mins >= self.cooldown_actionable_mins
            && self.cooldown_actionable_mins >= self.cooldown_heads_up_mins
            && self.cooldown_heads_up_mins >= self.cooldown_watch_mins)
        {
            bail!("cooldowns must be ordered high_conviction >= actionable >= heads_up >= watch");
        }
        if self.global_max_per_window == 0 {
            bail!("GLOBAL_MAX_PER_WINDOW must be > 0");
        }
        Ok(())
    }
}

/// One delivered alert
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleRecord {
    pub token_id: String,
    pub band: Band,
    pub timestamp: DateTime<Utc>,
}

/// Why an alert was held back
#[derive(Debug, Clone, PartialEq)]
pub enum ThrottleReason {
    Cooldown { remaining_secs: i64 },
    GlobalRateLimit { count: usize, cap: usize },
    BandRateLimit { band: Band, count: usize, cap: usize },
}

impl fmt::Display for ThrottleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThrottleReason::Cooldown { remaining_secs } => {
                write!(f, "token cooldown: {}s remaining", remaining_secs)
            }
            ThrottleReason::GlobalRateLimit { count, cap } => {
                write!(f, "global rate limit: {}/{} in window", count, cap)
            }
            ThrottleReason::BandRateLimit { band, count, cap } => {
                write!(f, "{} rate limit: {}/{} in window", band, count, cap)
            }
        }
    }
}

/// Handle for a recorded alert that can be rolled back with
/// [`ThrottleManager::release`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ThrottleTicket {
    record: ThrottleRecord,
}

impl ThrottleTicket {
    pub fn record(&self) -> &ThrottleRecord {
        &self.record
    }
}

#[derive(Debug, Default, Clone)]
pub struct ThrottleStats {
    pub checks: u64,
    pub admitted: u64,
    pub blocked_cooldown: u64,
    pub blocked_global: u64,
    pub blocked_band: u64,
    pub released: u64,
    pub history_len: usize,
    pub muted: bool,
}

#[derive(Debug, Default)]
struct ThrottleState {
    history: VecDeque<ThrottleRecord>,
    muted_until: Option<DateTime<Utc>>,
    stats: ThrottleStats,
}

pub struct ThrottleManager {
    config: ThrottleConfig,
    state: Mutex<ThrottleState>,
}

impl ThrottleManager {
    pub fn new() -> Self {
        Self::with_config(ThrottleConfig::default())
    }

    pub fn with_config(config: ThrottleConfig) -> Self {
        info!("🛡️ Initializing alert guardrails:");
        info!("   Cooldowns: high conviction {}m, actionable {}m, heads-up {}m, watch {}m",
              config.cooldown_high_conviction_mins,
              config.cooldown_actionable_mins,
              config.cooldown_heads_up_mins,
              config.cooldown_watch_mins);
        info!("   Rate window {}m: global {}, high conviction {}, actionable {}, heads-up {}",
              config.rate_window_mins,
              config.global_max_per_window,
              config.high_conviction_max_per_window,
              config.actionable_max_per_window,
              config.heads_up_max_per_window);

        Self {
            config,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn should_throttle(&self, token_id: &str, band: Band) -> bool {
        self.should_throttle_at(token_id, band, Utc::now())
    }

    pub fn should_throttle_at(&self, token_id: &str, band: Band, now: DateTime<Utc>) -> bool {
        self.throttle_reason_at(token_id, band, now).is_some()
    }

    /// Reason the alert would be throttled right now, if any
    pub fn throttle_reason_at(&self, token_id: &str, band: Band, now: DateTime<Utc>) -> Option<ThrottleReason> {
        let mut state = self.state.lock().unwrap();
        self.prune(&mut state, now);
        self.check(&mut state, token_id, band, now)
    }

    pub fn record_alert(&self, token_id: &str, band: Band) {
        self.record_alert_at(token_id, band, Utc::now());
    }

    pub fn record_alert_at(&self, token_id: &str, band: Band, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.history.push_back(ThrottleRecord {
            token_id: token_id.to_string(),
            band,
            timestamp: now,
        });
        state.stats.admitted += 1;
        self.prune(&mut state, now);
    }

    /// Check and record under one lock. Two concurrent callers can never
    /// both pass a window that only has room for one.
    pub fn try_acquire_at(
        &self,
        token_id: &str,
        band: Band,
        now: DateTime<Utc>,
    ) -> std::result::Result<ThrottleTicket, ThrottleReason> {
        let mut state = self.state.lock().unwrap();
        self.prune(&mut state, now);
        if let Some(reason) = self.check(&mut state, token_id, band, now) {
            return Err(reason);
        }

        let record = ThrottleRecord {
            token_id: token_id.to_string(),
            band,
            timestamp: now,
        };
        state.history.push_back(record.clone());
        state.stats.admitted += 1;
        Ok(ThrottleTicket { record })
    }

    /// Roll back an acquisition whose alert was never delivered
    pub fn release(&self, ticket: ThrottleTicket) {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.history.iter().rposition(|r| *r == ticket.record) {
            state.history.remove(pos);
            state.stats.released += 1;
            debug!("🛡️ Released throttle slot for {} ({})", ticket.record.token_id, ticket.record.band);
        }
    }

    pub fn mute_at(&self, minutes: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        let until = now + Duration::minutes(minutes.max(0));
        self.state.lock().unwrap().muted_until = Some(until);
        warn!("🔇 Alerts muted for {} minutes (until {})", minutes, until.format("%H:%M:%S"));
        until
    }

    pub fn mute(&self, minutes: i64) -> DateTime<Utc> {
        self.mute_at(minutes, Utc::now())
    }

    pub fn unmute(&self) {
        self.state.lock().unwrap().muted_until = None;
        info!("🔊 Alerts unmuted");
    }

    pub fn is_muted_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.muted_until {
            Some(until) if now < until => true,
            Some(_) => {
                state.muted_until = None;
                false
            }
            None => false,
        }
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted_at(Utc::now())
    }

    pub fn muted_until(&self) -> Option<DateTime<Utc>> {
        self.state.lock().unwrap().muted_until
    }

    pub fn stats(&self) -> ThrottleStats {
        let state = self.state.lock().unwrap();
        let mut stats = state.stats.clone();
        stats.history_len = state.history.len();
        stats.muted = state.muted_until.map_or(false, |until| Utc::now() < until);
        stats
    }

    fn check(
        &self,
        state: &mut ThrottleState,
        token_id: &str,
        band: Band,
        now: DateTime<Utc>,
    ) -> Option<ThrottleReason> {
        state.stats.checks += 1;

        let cooldown = self.config.cooldown(band);
        if let Some(last) = state.history.iter().rev().find(|r| r.token_id == token_id) {
            let elapsed = now - last.timestamp;
            if elapsed < cooldown {
                state.stats.blocked_cooldown += 1;
                return Some(ThrottleReason::Cooldown {
                    remaining_secs: (cooldown - elapsed).num_seconds(),
                });
            }
        }

        let window_start = now - self.config.rate_window();
        let (global, band_count) = state
            .history
            .iter()
            .filter(|r| r.timestamp > window_start)
            .fold((0usize, 0usize), |(all, same), r| (all + 1, same + usize::from(r.band == band)));

        if global >= self.config.global_max_per_window {
            state.stats.blocked_global += 1;
            return Some(ThrottleReason::GlobalRateLimit {
                count: global,
                cap: self.config.global_max_per_window,
            });
        }

        let cap = self.config.band_cap(band);
        if band_count >= cap {
            state.stats.blocked_band += 1;
            return Some(ThrottleReason::BandRateLimit { band, count: band_count, cap });
        }

        None
    }

    fn prune(&self, state: &mut ThrottleState, now: DateTime<Utc>) {
        let cutoff = now - self.config.retention();
        while state.history.front().map_or(false, |r| r.timestamp < cutoff) {
            state.history.pop_front();
        }
    }
}

impl Default for ThrottleManager {
    fn default() -> Self {
        Self::new()
    }
}
