//! Configuration management for the analytics service
//!
//! Loads configuration from environment variables (via .env file) and provides
//! validated, type-safe access to all service parameters. Thresholds that
//! several stages share (liquidity floors, momentum bounds, tradability caps)
//! are read once and copied into every section that uses them.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::decision_engine::entry_gates::EntryConfig;
use crate::decision_engine::guardrails::ThrottleConfig;
use crate::decision_engine::position_sizer::PositionSizerConfig;
use crate::decision_engine::regime::RegimeConfig;
use crate::decision_engine::scoring::ScoringConfig;
use crate::decision_engine::signals::{PiecewiseCurve, SignalConfig};

/// Complete configuration for the analytics service
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub signals: SignalConfig,
    pub scoring: ScoringConfig,
    pub entry: EntryConfig,
    pub sizing: PositionSizerConfig,
    pub regime: RegimeConfig,
    pub throttle: ThrottleConfig,
    pub dedupe: DedupeConfig,
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
}

/// Alert deduplication configuration
#[derive(Debug, Clone)]
pub struct DedupeConfig {
    /// How long identical alert content stays suppressed (seconds)
    pub ttl_secs: i64,
    /// In-memory store size before expired keys are swept
    pub capacity: usize,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self { ttl_secs: 21_600, capacity: 10_000 }
    }
}

impl DedupeConfig {
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs)
    }
}

/// Feature cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Signal results are served to queries for this long (seconds)
    pub signal_ttl_secs: i64,
    /// Market snapshots are considered current for this long (seconds)
    pub market_ttl_secs: i64,
    /// Optional JSON file of token metadata loaded at startup
    pub metadata_path: Option<PathBuf>,
    /// Optional JSON file of `{wallet, holdings}` portfolios loaded at startup
    pub portfolio_path: Option<PathBuf>,
    /// Wallet whose holding count feeds position sizing
    pub tracked_wallet: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            signal_ttl_secs: 60,
            market_ttl_secs: 900,
            metadata_path: None,
            portfolio_path: None,
            tracked_wallet: None,
        }
    }
}

/// Network communication configuration
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// UDP bind address (typically 127.0.0.1 for localhost)
    pub udp_bind_address: IpAddr,
    /// Port to receive market updates and commands on
    pub ingest_bus_port: u16,
    /// Port alerts and replies are sent to
    pub publish_bus_port: u16,
    /// Host the publish bus lives on
    pub publish_host: IpAddr,
    /// Capacity of the update queue between receiver and worker
    pub queue_capacity: usize,
    /// Prometheus exporter port (0 disables)
    pub metrics_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            udp_bind_address: IpAddr::from([127, 0, 0, 1]),
            ingest_bus_port: 45200,
            publish_bus_port: 45210,
            publish_host: IpAddr::from([127, 0, 0, 1]),
            queue_capacity: 1000,
            metrics_port: 9095,
        }
    }
}

impl NetworkConfig {
    pub fn ingest_addr(&self) -> SocketAddr {
        SocketAddr::new(self.udp_bind_address, self.ingest_bus_port)
    }

    pub fn publish_addr(&self) -> SocketAddr {
        SocketAddr::new(self.publish_host, self.publish_bus_port)
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Path to the alert audit CSV (disabled when unset)
    pub audit_log_path: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            audit_log_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Expects a .env file in the working directory or environment variables to be set.
    /// Unset variables take their defaults; set but unparsable ones are an error.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (ignoring error if not found)
        let _ = dotenv::dotenv();

        let d_sig = SignalConfig::default();
        let d_entry = EntryConfig::default();
        let d_score = ScoringConfig::default();

        // Shared thresholds
        let liq_headsup = get_env_f64("MIN_LIQUIDITY_HEADSUP", d_sig.min_liquidity_headsup)?;
        let liq_actionable = get_env_f64("MIN_LIQUIDITY_ACTIONABLE", d_sig.min_liquidity_actionable)?;
        let vol_headsup = get_env_f64("MIN_VOLUME_HEADSUP", d_sig.min_volume_headsup)?;
        let vol_actionable = get_env_f64("MIN_VOLUME_ACTIONABLE", d_sig.min_volume_actionable)?;
        let min_m1h = get_env_f64("MIN_M1H_PCT", d_entry.min_short_momentum_pct)?;
        let max_m1h = get_env_f64("MAX_M1H_PCT", d_entry.max_short_momentum_pct)?;
        let min_m24h = get_env_f64("MIN_M24H_PCT", d_entry.min_long_momentum_pct)?;
        let max_m24h = get_env_f64("MAX_M24H_PCT", d_entry.max_long_momentum_pct)?;
        let short_bar = get_env_string("SHORT_BAR_LABEL", &d_sig.short_bar_label)?;
        let long_bar = get_env_string("LONG_BAR_LABEL", &d_sig.long_bar_label)?;
        let max_spread = get_env_f64("MAX_SPREAD_PCT", d_sig.max_spread_pct)?;
        let max_impact = get_env_f64("MAX_IMPACT_PCT", d_sig.max_impact_pct)?;
        let max_hops = get_env_u32("MAX_ROUTE_HOPS", d_sig.max_route_hops)?;
        let max_deviation = get_env_f64("MAX_ROUTE_DEVIATION_PCT", d_sig.max_route_deviation_pct)?;
        let young_hours = get_env_f64("YOUNG_TOKEN_HOURS", d_sig.young_token_hours)?;
        let min_dq = get_env_f64("MIN_DQ_FOR_ACTIONABLE", d_score.min_dq_for_actionable)?;

        let signals = SignalConfig {
            min_liquidity_headsup: liq_headsup,
            min_liquidity_actionable: liq_actionable,
            min_volume_headsup: vol_headsup,
            min_volume_actionable: vol_actionable,
            short_bar_label: short_bar.clone(),
            long_bar_label: long_bar.clone(),
            min_short_momentum_pct: min_m1h,
            min_long_momentum_pct: min_m24h,
            liquidity_curve: get_env_curve(
                "LIQUIDITY_CURVE",
                SignalConfig::liquidity_curve_for(liq_headsup, liq_actionable),
            )?,
            volume_curve: get_env_curve(
                "VOLUME_CURVE",
                SignalConfig::volume_curve_for(vol_headsup, vol_actionable),
            )?,
            short_momentum_curve: get_env_curve(
                "SHORT_MOMENTUM_CURVE",
                SignalConfig::short_momentum_curve_for(min_m1h, max_m1h),
            )?,
            long_momentum_curve: get_env_curve(
                "LONG_MOMENTUM_CURVE",
                SignalConfig::long_momentum_curve_for(min_m24h, max_m24h),
            )?,
            volatility_curve: get_env_curve("VOLATILITY_CURVE", SignalConfig::default_volatility_curve())?,
            max_spread_pct: max_spread,
            max_impact_pct: max_impact,
            max_route_hops: max_hops,
            max_route_deviation_pct: max_deviation,
            young_token_hours: young_hours,
            max_top_holder_pct: get_env_f64("MAX_TOP_HOLDER_PCT", d_sig.max_top_holder_pct)?,
            min_fdv_liq: get_env_f64("MIN_FDV_LIQ", d_sig.min_fdv_liq)?,
            max_fdv_liq: get_env_f64("MAX_FDV_LIQ", d_sig.max_fdv_liq)?,
            preferred_min_fdv_liq: get_env_f64("PREFERRED_MIN_FDV_LIQ", d_sig.preferred_min_fdv_liq)?,
            preferred_max_fdv_liq: get_env_f64("PREFERRED_MAX_FDV_LIQ", d_sig.preferred_max_fdv_liq)?,
            dq_penalty_per_missing: get_env_f64("DQ_PENALTY_PER_MISSING", d_sig.dq_penalty_per_missing)?,
            min_dq_for_actionable: min_dq,
            relative_strength_default: get_env_f64("RELATIVE_STRENGTH_DEFAULT", d_sig.relative_strength_default)?,
        };

        let scoring = ScoringConfig {
            weights: get_env_weights("FACTOR_WEIGHTS", d_score.weights)?,
            hygiene_penalty: get_env_i32("HYGIENE_PENALTY", d_score.hygiene_penalty)?,
            rug_risk_cap: get_env_i32("RUG_RISK_CAP", d_score.rug_risk_cap)?,
            min_dq_for_actionable: min_dq,
            dq_ceiling_max: get_env_i32("DQ_CEILING_MAX", d_score.dq_ceiling_max)?,
            risk_on_adjustment: get_env_i32("RISK_ON_ADJUSTMENT", d_score.risk_on_adjustment)?,
            risk_off_adjustment: get_env_i32("RISK_OFF_ADJUSTMENT", d_score.risk_off_adjustment)?,
            headsup_min: get_env_u8("HEADSUP_MIN", d_score.headsup_min)?,
            headsup_max: get_env_u8("HEADSUP_MAX", d_score.headsup_max)?,
            actionable_min: get_env_u8("ACTIONABLE_MIN", d_score.actionable_min)?,
            high_conviction_min: get_env_u8("HIGH_CONVICTION_MIN", d_score.high_conviction_min)?,
        };

        let entry = EntryConfig {
            min_age_hours: get_env_f64("MIN_AGE_HOURS", d_entry.min_age_hours)?,
            min_liquidity_usd: liq_actionable,
            min_volume_usd: vol_actionable,
            max_spread_pct: max_spread,
            max_impact_pct: max_impact,
            max_route_hops: max_hops,
            max_route_deviation_pct: max_deviation,
            short_bar_label: short_bar,
            long_bar_label: long_bar,
            min_short_momentum_pct: min_m1h,
            max_short_momentum_pct: max_m1h,
            min_long_momentum_pct: min_m24h,
            max_long_momentum_pct: max_m24h,
            min_dq_for_actionable: min_dq,
            young_token_hours: young_hours,
            min_confidence_young_risky: get_env_u8("MIN_CONFIDENCE_YOUNG_RISKY", d_entry.min_confidence_young_risky)?,
            upside_cap_pct: get_env_f64("UPSIDE_CAP_PCT", d_entry.upside_cap_pct)?,
            net_edge_k: get_env_f64("NET_EDGE_K", d_entry.net_edge_k)?,
            lag_penalty_pct: get_env_f64("LAG_PENALTY_PCT", d_entry.lag_penalty_pct)?,
        };

        let d_size = PositionSizerConfig::default();
        let d_regime = RegimeConfig::default();
        let d_throttle = ThrottleConfig::default();
        let d_dedupe = DedupeConfig::default();
        let d_cache = CacheConfig::default();
        let d_net = NetworkConfig::default();

        Ok(Config {
            signals,
            scoring,
            entry,
            sizing: PositionSizerConfig {
                portfolio_value_usd: get_env_f64("PORTFOLIO_VALUE_USD", d_size.portfolio_value_usd)?,
                liquidity_size_factor: get_env_f64("LIQUIDITY_SIZE_FACTOR", d_size.liquidity_size_factor)?,
                max_positions: get_env_usize("MAX_POSITIONS", d_size.max_positions)?,
                max_deployed_pct: get_env_f64("MAX_DEPLOYED_PCT", d_size.max_deployed_pct)?,
                default_deployed_pct: get_env_f64("DEFAULT_DEPLOYED_PCT", d_size.default_deployed_pct)?,
            },
            regime: RegimeConfig {
                reference_mint: get_env_string("REFERENCE_MINT", &d_regime.reference_mint)?,
                window_hours: get_env_i64("REGIME_WINDOW_HOURS", d_regime.window_hours)?,
                risk_on_change_pct: get_env_f64("RISK_ON_CHANGE_PCT", d_regime.risk_on_change_pct)?,
                risk_on_momentum_pct: get_env_f64("RISK_ON_MOMENTUM_PCT", d_regime.risk_on_momentum_pct)?,
                min_points: get_env_usize("REGIME_MIN_POINTS", d_regime.min_points)?,
            },
            throttle: ThrottleConfig {
                cooldown_high_conviction_mins: get_env_i64("COOLDOWN_HIGH_CONVICTION_MINS", d_throttle.cooldown_high_conviction_mins)?,
                cooldown_actionable_mins: get_env_i64("COOLDOWN_ACTIONABLE_MINS", d_throttle.cooldown_actionable_mins)?,
                cooldown_heads_up_mins: get_env_i64("COOLDOWN_HEADS_UP_MINS", d_throttle.cooldown_heads_up_mins)?,
                cooldown_watch_mins: get_env_i64("COOLDOWN_WATCH_MINS", d_throttle.cooldown_watch_mins)?,
                rate_window_mins: get_env_i64("THROTTLE_WINDOW_MINS", d_throttle.rate_window_mins)?,
                global_max_per_window: get_env_usize("GLOBAL_MAX_PER_WINDOW", d_throttle.global_max_per_window)?,
                high_conviction_max_per_window: get_env_usize("HIGH_CONVICTION_MAX_PER_WINDOW", d_throttle.high_conviction_max_per_window)?,
                actionable_max_per_window: get_env_usize("ACTIONABLE_MAX_PER_WINDOW", d_throttle.actionable_max_per_window)?,
                heads_up_max_per_window: get_env_usize("HEADS_UP_MAX_PER_WINDOW", d_throttle.heads_up_max_per_window)?,
                watch_max_per_window: get_env_usize("WATCH_MAX_PER_WINDOW", d_throttle.watch_max_per_window)?,
            },
            dedupe: DedupeConfig {
                ttl_secs: get_env_i64("DEDUPE_TTL_SECS", d_dedupe.ttl_secs)?,
                capacity: get_env_usize("DEDUPE_CAPACITY", d_dedupe.capacity)?,
            },
            cache: CacheConfig {
                signal_ttl_secs: get_env_i64("SIGNAL_CACHE_TTL_SECS", d_cache.signal_ttl_secs)?,
                market_ttl_secs: get_env_i64("MARKET_CACHE_TTL_SECS", d_cache.market_ttl_secs)?,
                metadata_path: get_env_path("METADATA_PATH"),
                portfolio_path: get_env_path("PORTFOLIO_PATH"),
                tracked_wallet: env::var("TRACKED_WALLET").ok().filter(|s| !s.trim().is_empty()),
            },
            network: NetworkConfig {
                udp_bind_address: get_env_ip("UDP_BIND_ADDRESS", d_net.udp_bind_address)?,
                ingest_bus_port: get_env_u16("INGEST_BUS_PORT", d_net.ingest_bus_port)?,
                publish_bus_port: get_env_u16("PUBLISH_BUS_PORT", d_net.publish_bus_port)?,
                publish_host: get_env_ip("PUBLISH_HOST", d_net.publish_host)?,
                queue_capacity: get_env_usize("QUEUE_CAPACITY", d_net.queue_capacity)?,
                metrics_port: get_env_u16("METRICS_PORT", d_net.metrics_port)?,
            },
            logging: LoggingConfig {
                audit_log_path: get_env_path("AUDIT_LOG_PATH"),
                log_level: get_env_string("LOG_LEVEL", "info")?,
            },
        })
    }

    /// Validate configuration values are within acceptable ranges
    pub fn validate(&self) -> Result<()> {
        self.signals.validate().context("Invalid signal configuration")?;
        self.scoring.validate().context("Invalid scoring configuration")?;
        self.entry.validate().context("Invalid entry configuration")?;
        self.sizing.validate().context("Invalid sizing configuration")?;
        self.regime.validate().context("Invalid regime configuration")?;
        self.throttle.validate().context("Invalid throttle configuration")?;

        if (self.signals.min_dq_for_actionable - self.scoring.min_dq_for_actionable).abs() > f64::EPSILON
            || (self.signals.min_dq_for_actionable - self.entry.min_dq_for_actionable).abs() > f64::EPSILON
        {
            bail!("MIN_DQ_FOR_ACTIONABLE differs between signal, scoring and entry sections");
        }

        // Dedupe
        if self.dedupe.ttl_secs <= 0 {
            bail!("DEDUPE_TTL_SECS must be > 0");
        }
        if self.dedupe.capacity == 0 {
            bail!("DEDUPE_CAPACITY must be > 0");
        }

        // Cache
        if self.cache.signal_ttl_secs <= 0 || self.cache.market_ttl_secs <= 0 {
            bail!("SIGNAL_CACHE_TTL_SECS and MARKET_CACHE_TTL_SECS must be > 0");
        }

        // Network
        if self.network.ingest_bus_port == 0 {
            bail!("INGEST_BUS_PORT must be > 0");
        }
        if self.network.publish_bus_port == 0 {
            bail!("PUBLISH_BUS_PORT must be > 0");
        }
        if self.network.ingest_bus_port == self.network.publish_bus_port
            && self.network.udp_bind_address == self.network.publish_host
        {
            bail!("INGEST_BUS_PORT and PUBLISH_BUS_PORT must be different");
        }
        if self.network.queue_capacity == 0 {
            bail!("QUEUE_CAPACITY must be > 0");
        }

        if self.logging.audit_log_path.is_none() {
            log::warn!("AUDIT_LOG_PATH is empty - alert audit log disabled");
        }

        Ok(())
    }
}

// Helper functions for environment variable parsing

fn get_env_string(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn get_env_parsed<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .ok()
            .with_context(|| format!("Invalid {} value: {:?}", key, raw)),
        _ => Ok(default),
    }
}

fn get_env_u8(key: &str, default: u8) -> Result<u8> {
    get_env_parsed(key, default)
}

fn get_env_u16(key: &str, default: u16) -> Result<u16> {
    get_env_parsed(key, default)
}

fn get_env_u32(key: &str, default: u32) -> Result<u32> {
    get_env_parsed(key, default)
}

fn get_env_i32(key: &str, default: i32) -> Result<i32> {
    get_env_parsed(key, default)
}

fn get_env_i64(key: &str, default: i64) -> Result<i64> {
    get_env_parsed(key, default)
}

fn get_env_usize(key: &str, default: usize) -> Result<usize> {
    get_env_parsed(key, default)
}

fn get_env_f64(key: &str, default: f64) -> Result<f64> {
    get_env_parsed(key, default)
}

fn get_env_ip(key: &str, default: IpAddr) -> Result<IpAddr> {
    get_env_parsed(key, default)
}

fn get_env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().filter(|s| !s.trim().is_empty()).map(PathBuf::from)
}

/// Knots as `x:y,x:y,...`. The override keeps the default curve's floor.
fn get_env_curve(key: &str, default: PiecewiseCurve) -> Result<PiecewiseCurve> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let knots = PiecewiseCurve::parse_knots(&raw).with_context(|| format!("Invalid {}", key))?;
            let curve = PiecewiseCurve::new(knots);
            Ok(match default.floor() {
                Some(below) => curve.with_floor(below),
                None => curve,
            })
        }
        _ => Ok(default),
    }
}

/// Ten comma-separated weights, S1..S10
fn get_env_weights(key: &str, default: [f64; 10]) -> Result<[f64; 10]> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            let parsed = raw
                .split(',')
                .map(|w| w.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("Invalid {} value: {:?}", key, raw))?;
            let weights: [f64; 10] = parsed
                .try_into()
                .map_err(|v: Vec<f64>| anyhow::anyhow!("{} needs 10 weights, got {}", key, v.len()))?;
            Ok(weights)
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_band_order() {
        let mut config = Config::default();
        config.scoring.headsup_max = 70;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_weights() {
        let mut config = Config::default();
        config.scoring.weights[0] = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_cooldown_order() {
        let mut config = Config::default();
        config.throttle.cooldown_watch_mins = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_curve() {
        let mut config = Config::default();
        config.signals.volatility_curve = PiecewiseCurve::new(vec![(0.0, 0.5), (5.0, 0.2)]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_same_ports() {
        let mut config = Config::default();
        config.network.ingest_bus_port = 45200;
        config.network.publish_bus_port = 45200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_positions() {
        let mut config = Config::default();
        config.sizing.max_positions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_helpers() {
        env::set_var("SIGNAL_ANALYTICS_TEST_F64", "2.5");
        env::set_var("SIGNAL_ANALYTICS_TEST_BAD", "abc");
        env::set_var("SIGNAL_ANALYTICS_TEST_CURVE", "0:0,10:1");
        env::set_var("SIGNAL_ANALYTICS_TEST_WEIGHTS", "0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1,0.1");

        assert_eq!(get_env_f64("SIGNAL_ANALYTICS_TEST_F64", 1.0).unwrap(), 2.5);
        assert_eq!(get_env_f64("SIGNAL_ANALYTICS_TEST_UNSET", 1.0).unwrap(), 1.0);
        assert!(get_env_u16("SIGNAL_ANALYTICS_TEST_BAD", 1).is_err());

        let curve = get_env_curve("SIGNAL_ANALYTICS_TEST_CURVE", SignalConfig::default_volatility_curve()).unwrap();
        assert_eq!(curve.knots().len(), 2);
        assert!((curve.eval(5.0) - 0.5).abs() < 1e-9);

        let weights = get_env_weights("SIGNAL_ANALYTICS_TEST_WEIGHTS", [0.0; 10]).unwrap();
        assert_eq!(weights[9], 0.1);

        env::set_var("SIGNAL_ANALYTICS_TEST_WEIGHTS", "0.5,0.5");
        assert!(get_env_weights("SIGNAL_ANALYTICS_TEST_WEIGHTS", [0.0; 10]).is_err());
    }

    #[test]
    fn test_curve_override_keeps_floor() {
        env::set_var("SIGNAL_ANALYTICS_TEST_LIQ_CURVE", "10000:0.2,100000:0.6,1000000:1.0");

        let curve = get_env_curve(
            "SIGNAL_ANALYTICS_TEST_LIQ_CURVE",
            SignalConfig::liquidity_curve_for(25_000.0, 150_000.0),
        )
        .unwrap();
        assert_eq!(curve.floor(), Some(0.0));
        assert_eq!(curve.eval(5_000.0), 0.0);
        assert!((curve.eval(10_000.0) - 0.2).abs() < 1e-9);
        assert!(curve.validate("liquidity").is_ok());

        // no floor on the default, none on the override
        let vol = get_env_curve("SIGNAL_ANALYTICS_TEST_LIQ_CURVE", SignalConfig::default_volatility_curve()).unwrap();
        assert_eq!(vol.floor(), None);
        assert!((vol.eval(5_000.0) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_network_addresses() {
        let net = NetworkConfig::default();
        assert_eq!(net.ingest_addr().port(), 45200);
        assert_eq!(net.publish_addr().to_string(), "127.0.0.1:45210");
    }
}
