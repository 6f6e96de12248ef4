//! 🪙 Market / Signal Cache
//!
//! Lock-free per-mint caches with a fixed time-to-live. Expired entries are
//! treated as absent on read and swept by `purge_expired`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::debug;

use crate::decision_engine::signals::SignalResult;
use crate::udp_bus::messages::MarketUpdate;

/// Latest MarketUpdate per base mint
pub type MarketCache = TtlCache<MarketUpdate>;

/// Latest SignalResult per base mint
pub type SignalCache = TtlCache<SignalResult>;

#[derive(Clone)]
pub struct TtlCache<V: Clone> {
    entries: Arc<DashMap<String, (V, DateTime<Utc>)>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn insert(&self, key: &str, value: V) {
        self.insert_at(key, value, Utc::now());
    }

    pub fn insert_at(&self, key: &str, value: V, now: DateTime<Utc>) {
        self.entries.insert(key.to_string(), (value, now));
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Utc::now())
    }

    /// Value for `key` if it was stored less than one TTL before `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (value, stored_at) = entry.value();
        if now - *stored_at < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, (_, stored_at)| now - *stored_at < self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("🧹 Purged {} expired cache entries", removed);
        }
        removed
    }
}
