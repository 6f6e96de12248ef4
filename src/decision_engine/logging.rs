//! 📝 Alert Audit Logging
//!
//! Appends one CSV row per admission decision (sent, muted, throttled,
//! duplicate or failed delivery) for offline review of what the gating
//! layers did.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::decision_engine::scoring::Band;

/// What happened to an alert candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    Sent,
    Muted,
    Throttled,
    Duplicate,
    DeliveryFailed,
}

impl AlertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertOutcome::Sent => "SENT",
            AlertOutcome::Muted => "MUTED",
            AlertOutcome::Throttled => "THROTTLED",
            AlertOutcome::Duplicate => "DUPLICATE",
            AlertOutcome::DeliveryFailed => "DELIVERY_FAILED",
        }
    }
}

/// Audit log entry
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub mint: String,
    pub symbol: String,
    pub band: Band,
    pub confidence: u8,
    pub outcome: AlertOutcome,
    /// Free text, e.g. the throttle reason
    pub details: String,
    pub reasons: Vec<String>,
}

#[derive(Serialize)]
struct AuditRow<'a> {
    timestamp: String,
    mint: &'a str,
    symbol: &'a str,
    band: &'static str,
    confidence: u8,
    outcome: &'static str,
    details: &'a str,
    reasons: String,
}

impl AuditEntry {
    fn row(&self) -> AuditRow<'_> {
        AuditRow {
            timestamp: self.timestamp.to_rfc3339(),
            mint: &self.mint,
            symbol: &self.symbol,
            band: self.band.as_str(),
            confidence: self.confidence,
            outcome: self.outcome.as_str(),
            details: &self.details,
            reasons: self.reasons.join("; "),
        }
    }

    pub fn csv_header() -> [&'static str; 8] {
        ["timestamp", "mint", "symbol", "band", "confidence", "outcome", "details", "reasons"]
    }
}

/// CSV audit writer
pub struct AlertAuditLog {
    writer: Mutex<csv::Writer<File>>,
    entries_logged: Mutex<u64>,
}

impl AlertAuditLog {
    /// Open `log_path` for appending. A header is written only when the file
    /// is new or empty.
    pub fn new<P: AsRef<Path>>(log_path: P) -> Result<Self> {
        let path = log_path.as_ref();
        let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open audit log: {:?}", path))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(AuditEntry::csv_header())
                .context("Failed to write CSV header")?;
            writer.flush()?;
            info!("📝 Created new alert audit log: {:?}", path);
        } else {
            info!("📝 Opened existing alert audit log: {:?}", path);
        }

        Ok(Self {
            writer: Mutex::new(writer),
            entries_logged: Mutex::new(0),
        })
    }

    pub fn log(&self, entry: &AuditEntry) -> Result<()> {
        {
            let mut writer = self.writer.lock().unwrap();
            writer
                .serialize(entry.row())
                .context("Failed to write audit entry")?;
            writer.flush()?;
        }
        *self.entries_logged.lock().unwrap() += 1;

        debug!("📝 Audit: {} {} ({}) conf={} {}",
               entry.outcome.as_str(), entry.symbol, entry.band, entry.confidence, entry.details);
        Ok(())
    }

    pub fn entries_logged(&self) -> u64 {
        *self.entries_logged.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(outcome: AlertOutcome) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            mint: "MintAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
            symbol: "TEST".to_string(),
            band: Band::Actionable,
            confidence: 74,
            outcome,
            details: String::new(),
            reasons: vec!["Liq $200.0k".to_string(), "Vol $800.0k".to_string()],
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.csv");

        let log = AlertAuditLog::new(&path).unwrap();
        log.log(&entry(AlertOutcome::Sent)).unwrap();
        log.log(&AuditEntry { details: "cooldown 120s".to_string(), ..entry(AlertOutcome::Throttled) }).unwrap();
        assert_eq!(log.entries_logged(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,mint,symbol,band"));
        assert!(lines[1].contains(",actionable,74,SENT,"));
        assert!(lines[1].ends_with("Liq $200.0k; Vol $800.0k"));
        assert!(lines[2].contains("THROTTLED,cooldown 120s"));
    }

    #[test]
    fn test_reopen_appends_without_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts.csv");

        AlertAuditLog::new(&path).unwrap().log(&entry(AlertOutcome::Sent)).unwrap();
        AlertAuditLog::new(&path).unwrap().log(&entry(AlertOutcome::Duplicate)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().filter(|l| l.starts_with("timestamp,")).count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AlertOutcome::DeliveryFailed.as_str(), "DELIVERY_FAILED");
        assert_eq!(AlertOutcome::Muted.as_str(), "MUTED");
    }
}
