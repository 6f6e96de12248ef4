//! 📈 Signal Analytics - DEX signal scoring and alert gating
//!
//! Turns Solana DEX market snapshots into a bounded confidence score and
//! decides, through regime bias, entry gates, throttling and deduplication,
//! which of them become delivered alerts.

pub mod config;
pub mod decision_engine;
pub mod feature_cache;
pub mod metrics;
pub mod query;
pub mod service;
pub mod udp_bus;

pub use config::Config;
pub use service::{AlertSink, AnalyticsService, Collaborators, PipelineOutcome, ReplySink, SignalPipeline};
