//! 🏷️ Token metadata and token-list lookups
//!
//! The scoring core only needs two fast reads per update: the provenance
//! record for a mint and the set of known-good mints. Both are traits so a
//! database-backed source can replace the in-memory store.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use dashmap::DashMap;
use log::info;

use crate::udp_bus::messages::TokenMetadata;

pub trait MetadataSource: Send + Sync {
    /// Provenance for `mint`; `None` means unknown
    fn get_metadata(&self, mint: &str) -> Option<TokenMetadata>;
}

pub trait TokenListSource: Send + Sync {
    /// Snapshot of known-good mints
    fn known_good(&self) -> Arc<HashSet<String>>;
}

#[derive(Default)]
pub struct InMemoryMetadataStore {
    metadata: DashMap<String, TokenMetadata>,
    known_good: Mutex<Arc<HashSet<String>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. Mints flagged `on_token_list` join the
    /// known-good set.
    pub fn upsert(&self, metadata: TokenMetadata) {
        if metadata.on_token_list {
            let mut guard = self.known_good.lock().unwrap();
            if !guard.contains(&metadata.mint) {
                let mut next = (**guard).clone();
                next.insert(metadata.mint.clone());
                *guard = Arc::new(next);
            }
        }
        self.metadata.insert(metadata.mint.clone(), metadata);
    }

    pub fn set_known_good<I: IntoIterator<Item = String>>(&self, mints: I) {
        let set: HashSet<String> = mints.into_iter().collect();
        info!("🏷️ Token list updated: {} known-good mints", set.len());
        *self.known_good.lock().unwrap() = Arc::new(set);
    }

    /// Seed from a JSON array of metadata records
    pub fn load_from_json_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read metadata file: {:?}", path))?;
        let records: Vec<TokenMetadata> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse metadata file: {:?}", path))?;

        let count = records.len();
        for record in records {
            self.upsert(record);
        }
        info!("🏷️ Loaded {} metadata records from {:?}", count, path);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

impl MetadataSource for InMemoryMetadataStore {
    fn get_metadata(&self, mint: &str) -> Option<TokenMetadata> {
        self.metadata.get(mint).map(|entry| entry.value().clone())
    }
}

impl TokenListSource for InMemoryMetadataStore {
    fn known_good(&self) -> Arc<HashSet<String>> {
        self.known_good.lock().unwrap().clone()
    }
}
