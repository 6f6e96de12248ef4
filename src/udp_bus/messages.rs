//! 📨 Bus message definitions
//!
//! JSON records exchanged with the ingest side (market updates, commands) and
//! the delivery side (alerts, command replies). One datagram carries one
//! `BusMessage`.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision_engine::scoring::Band;

/// One OHLCV bar for a given interval label ("5m", "15m", ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume_usd: f64,
}

impl OhlcvBar {
    /// Close-over-open change in percent. `None` when the open is unusable.
    pub fn pct_change(&self) -> Option<f64> {
        if !(self.open > 0.0) || !self.close.is_finite() {
            return None;
        }
        Some((self.close / self.open - 1.0) * 100.0)
    }

    /// High-low range relative to the low, in percent.
    pub fn range_pct(&self) -> Option<f64> {
        if !(self.low > 0.0) || !self.high.is_finite() {
            return None;
        }
        Some((self.high - self.low) / self.low * 100.0)
    }
}

/// Swap route quality as reported by the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub ok: bool,
    pub hops: u32,
    pub deviation_pct: f64,
}

impl Default for RouteInfo {
    fn default() -> Self {
        Self { ok: false, hops: 0, deviation_pct: 0.0 }
    }
}

/// Snapshot of one token pair, as published by the ingest collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    #[serde(default)]
    pub pool_id: String,
    pub mint_base: String,
    #[serde(default)]
    pub mint_quote: String,
    #[serde(default)]
    pub symbol: String,
    pub price_usd: f64,
    #[serde(default)]
    pub liq_usd: f64,
    #[serde(default)]
    pub vol24h_usd: f64,
    #[serde(default)]
    pub spread_pct: f64,
    #[serde(default)]
    pub impact_1pct_pct: f64,
    #[serde(default)]
    pub age_hours: f64,
    #[serde(default)]
    pub route: RouteInfo,
    /// Interval label → bar. A missing label means "no data".
    #[serde(default)]
    pub bars: BTreeMap<String, OhlcvBar>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl MarketUpdate {
    pub fn bar(&self, label: &str) -> Option<&OhlcvBar> {
        self.bars.get(label)
    }

    /// Structural checks applied before an update reaches the scoring core.
    pub fn validate(&self) -> Result<()> {
        if self.mint_base.trim().is_empty() {
            bail!("market update has empty base mint");
        }
        for (name, value) in [
            ("price_usd", self.price_usd),
            ("liq_usd", self.liq_usd),
            ("vol24h_usd", self.vol24h_usd),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("market update {} has invalid {}: {}", self.mint_base, name, value);
            }
        }
        if !self.age_hours.is_finite() || self.age_hours < 0.0 {
            bail!("market update {} has invalid age_hours: {}", self.mint_base, self.age_hours);
        }
        Ok(())
    }

    /// Short display form of the base mint for log lines
    pub fn mint_short(&self) -> &str {
        mint_short(&self.mint_base)
    }
}

pub fn mint_short(mint: &str) -> &str {
    match mint.char_indices().nth(8) {
        Some((idx, _)) => &mint[..idx],
        None => mint,
    }
}

/// Token provenance record. Absence means unknown provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub mint: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub on_token_list: bool,
    #[serde(default)]
    pub top_holder_pct: f64,
    #[serde(default)]
    pub risky_authorities: bool,
    #[serde(default)]
    pub first_liquidity_ts: Option<DateTime<Utc>>,
    /// Fully diluted valuation, when the metadata source knows it
    #[serde(default)]
    pub fdv_usd: Option<f64>,
}

/// Terminal artifact handed to the delivery collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub mint: String,
    pub symbol: String,
    pub price_usd: f64,
    pub liq_usd: f64,
    pub vol24h_usd: f64,
    pub confidence: u8,
    pub band: Band,
    pub reasons: Vec<String>,
    pub suggested_size_usd: f64,
    pub risk_regime: String,
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time query or operator command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub correlation_id: String,
    pub command: String,
    #[serde(default)]
    pub args: serde_json::Value,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl CommandRequest {
    pub fn new(command: &str, args: serde_json::Value) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            command: command.to_string(),
            args,
            timestamp: Utc::now(),
        }
    }

    /// String argument by name, if present
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Reply to a `CommandRequest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandReply {
    pub correlation_id: String,
    pub status: ReplyStatus,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl CommandReply {
    pub fn success(correlation_id: &str, payload: serde_json::Value) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            status: ReplyStatus::Success,
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn error(correlation_id: &str, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            status: ReplyStatus::Error,
            payload: serde_json::json!({ "error": message.into() }),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }
}

/// Envelope for everything that travels over the bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BusMessage {
    MarketUpdate(MarketUpdate),
    Command(CommandRequest),
    Alert(Alert),
    CommandReply(CommandReply),
}

impl BusMessage {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BusMessage::MarketUpdate(_) => "market_update",
            BusMessage::Command(_) => "command",
            BusMessage::Alert(_) => "alert",
            BusMessage::CommandReply(_) => "command_reply",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update() -> MarketUpdate {
        MarketUpdate {
            pool_id: "pool".to_string(),
            mint_base: "TokenMint1111111111".to_string(),
            mint_quote: "USDC".to_string(),
            symbol: "TKN".to_string(),
            price_usd: 1.25,
            liq_usd: 200_000.0,
            vol24h_usd: 800_000.0,
            spread_pct: 0.5,
            impact_1pct_pct: 0.3,
            age_hours: 48.0,
            route: RouteInfo { ok: true, hops: 2, deviation_pct: 0.1 },
            bars: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_bar_pct_change() {
        let bar = OhlcvBar { open: 1.0, high: 1.1, low: 0.9, close: 1.05, volume_usd: 0.0 };
        assert!((bar.pct_change().unwrap() - 5.0).abs() < 1e-9);
        assert!((bar.range_pct().unwrap() - 22.2222222).abs() < 1e-6);

        let broken = OhlcvBar { open: 0.0, high: 0.0, low: 0.0, close: 1.0, volume_usd: 0.0 };
        assert!(broken.pct_change().is_none());
        assert!(broken.range_pct().is_none());
    }

    #[test]
    fn test_validate_rejects_negative_liquidity() {
        let mut update = sample_update();
        assert!(update.validate().is_ok());

        update.liq_usd = -1.0;
        assert!(update.validate().is_err());

        let mut update = sample_update();
        update.price_usd = f64::NAN;
        assert!(update.validate().is_err());

        let mut update = sample_update();
        update.mint_base = "  ".to_string();
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_market_update_defaults_missing_fields() {
        let raw = r#"{"type":"market_update","data":{"mint_base":"abc","price_usd":2.0}}"#;
        let msg = BusMessage::from_bytes(raw.as_bytes()).unwrap();
        match msg {
            BusMessage::MarketUpdate(update) => {
                assert_eq!(update.mint_base, "abc");
                assert_eq!(update.liq_usd, 0.0);
                assert!(update.bars.is_empty());
                assert!(!update.route.ok);
            }
            other => panic!("unexpected message {:?}", other.kind()),
        }
    }

    #[test]
    fn test_command_reply_error_payload() {
        let reply = CommandReply::error("corr-1", "Token not found or no signals available");
        assert!(!reply.is_success());
        assert_eq!(reply.payload["error"], "Token not found or no signals available");

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn test_mint_short() {
        assert_eq!(mint_short("So11111111111111111111111111111111111111112"), "So111111");
        assert_eq!(mint_short("abc"), "abc");
    }
}
