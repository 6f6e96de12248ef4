//! Alert Deduplication Module
//!
//! Suppresses repeats of the same alert content within a TTL window.
//!
//! Architecture:
//! - Key: `dedupe:{mint}:{sha256(reasons)}`, so a changed reason set for the
//!   same token counts as new content
//! - Backed by a `DedupeStore` doing atomic set-if-absent with TTL
//! - Fail-safe: if the store errors, the alert is treated as a duplicate
//!
//! Usage:
//! ```rust,ignore
//! let dedup = Deduplicator::in_memory(Duration::hours(6));
//! if dedup.is_duplicate(&alert) {
//!     debug!("Dropped duplicate alert");
//!     return;
//! }
//! ```

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::udp_bus::messages::Alert;

#[derive(Debug, Error)]
pub enum DedupeStoreError {
    #[error("dedupe store unavailable: {0}")]
    Unavailable(String),
}

/// Shared key-value state used for deduplication.
pub trait DedupeStore: Send + Sync {
    /// Set `key` unless a live entry exists. `Ok(true)` when newly set.
    fn set_if_absent(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Result<bool, DedupeStoreError>;

    fn remove(&self, key: &str) -> Result<(), DedupeStoreError>;
}

/// Process-local store: key → expiry, plus an expiry-ordered index. Expired
/// keys are dropped on insert; past `max_capacity` the keys closest to
/// expiry are evicted.
pub struct InMemoryDedupeStore {
    entries: Mutex<DedupeEntries>,
    max_capacity: usize,
}

#[derive(Default)]
struct DedupeEntries {
    expiries: HashMap<String, DateTime<Utc>>,
    by_expiry: BTreeSet<(DateTime<Utc>, String)>,
}

impl DedupeEntries {
    fn remove(&mut self, key: &str) {
        if let Some(expiry) = self.expiries.remove(key) {
            self.by_expiry.remove(&(expiry, key.to_string()));
        }
    }
}

impl InMemoryDedupeStore {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            entries: Mutex::new(DedupeEntries::default()),
            max_capacity: max_capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().expiries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupeStore for InMemoryDedupeStore {
    fn set_if_absent(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Result<bool, DedupeStoreError> {
        let mut entries = self.entries.lock().unwrap();

        if let Some(expiry) = entries.expiries.get(key) {
            if now < *expiry {
                return Ok(false);
            }
        }
        entries.remove(key);

        let expiry = now + ttl;
        entries.expiries.insert(key.to_string(), expiry);
        entries.by_expiry.insert((expiry, key.to_string()));

        let mut evicted = 0usize;
        while let Some((oldest, _)) = entries.by_expiry.first() {
            if *oldest > now && entries.expiries.len() <= self.max_capacity {
                break;
            }
            if let Some((_, stale)) = entries.by_expiry.pop_first() {
                entries.expiries.remove(&stale);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("🧹 Evicted {} dedupe keys", evicted);
        }
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<(), DedupeStoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Statistics for monitoring deduplication effectiveness
#[derive(Debug, Default, Clone)]
pub struct DeduplicationStats {
    pub total_checked: u64,
    pub duplicates_dropped: u64,
    pub unique_alerts: u64,
    pub store_errors: u64,
}

impl DeduplicationStats {
    /// Duplicate rate as percentage
    pub fn duplicate_rate(&self) -> f64 {
        if self.total_checked == 0 {
            0.0
        } else {
            (self.duplicates_dropped as f64 / self.total_checked as f64) * 100.0
        }
    }
}

pub struct Deduplicator {
    store: Arc<dyn DedupeStore>,
    ttl: Duration,
    stats: Mutex<DeduplicationStats>,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn DedupeStore>, ttl: Duration) -> Self {
        info!("🔁 Alert deduplicator: TTL {}s", ttl.num_seconds());
        Self {
            store,
            ttl,
            stats: Mutex::new(DeduplicationStats::default()),
        }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(InMemoryDedupeStore::new(10_000)), ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Content key for a token and its ordered reason list. Each reason is
    /// length-prefixed, so no split of one reason matches another list.
    pub fn dedupe_key(mint: &str, reasons: &[String]) -> String {
        let mut hasher = Sha256::new();
        for reason in reasons {
            hasher.update((reason.len() as u64).to_le_bytes());
            hasher.update(reason.as_bytes());
        }
        format!("dedupe:{}:{}", mint, hex::encode(hasher.finalize()))
    }

    pub fn is_duplicate(&self, alert: &Alert) -> bool {
        self.is_duplicate_at(&alert.mint, &alert.reasons, Utc::now())
    }

    /// `true` if identical content was seen within the TTL. Marks the content
    /// as seen otherwise.
    pub fn is_duplicate_at(&self, mint: &str, reasons: &[String], now: DateTime<Utc>) -> bool {
        let key = Self::dedupe_key(mint, reasons);
        let outcome = self.store.set_if_absent(&key, self.ttl, now);

        let mut stats = self.stats.lock().unwrap();
        stats.total_checked += 1;
        match outcome {
            Ok(true) => {
                stats.unique_alerts += 1;
                false
            }
            Ok(false) => {
                stats.duplicates_dropped += 1;
                true
            }
            Err(e) => {
                stats.store_errors += 1;
                stats.duplicates_dropped += 1;
                error!("❌ Dedupe check failed for {}, suppressing alert: {}", mint, e);
                true
            }
        }
    }

    /// Drop the seen-marker so the same content can be retried
    pub fn forget(&self, mint: &str, reasons: &[String]) {
        let key = Self::dedupe_key(mint, reasons);
        if let Err(e) = self.store.remove(&key) {
            error!("❌ Failed to clear dedupe key for {}: {}", mint, e);
        }
    }

    pub fn stats(&self) -> DeduplicationStats {
        self.stats.lock().unwrap().clone()
    }
}
