//! 🗄️ Feature caches
//!
//! Latest market snapshots and signal results keyed by base mint, plus the
//! metadata / token-list lookups the scoring core reads on every update.

pub mod market_cache;
pub mod metadata_cache;

pub use market_cache::{MarketCache, SignalCache, TtlCache};
pub use metadata_cache::{InMemoryMetadataStore, MetadataSource, TokenListSource};
