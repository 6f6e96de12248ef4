pub mod signals;
pub mod scoring;
pub mod entry_gates;
pub mod position_sizer;
pub mod regime;
pub mod guardrails;
pub mod deduplicator;
pub mod logging;

// Re-export main types for convenience
pub use signals::{PiecewiseCurve, SignalCalculator, SignalConfig, SignalResult, RelativeStrength, ConstantRelativeStrength};
pub use scoring::{Band, ConfidenceScorer, ScoringConfig};
pub use entry_gates::{EntryConfig, EntryExitChecker, EntryGate};
pub use position_sizer::{PositionSizer, PositionSizerConfig};
pub use regime::{RegimeConfig, RegimeDetector, RegimeSnapshot};
pub use guardrails::{ThrottleConfig, ThrottleManager, ThrottleReason, ThrottleStats, ThrottleTicket};
pub use deduplicator::{DedupeStore, DedupeStoreError, Deduplicator, DeduplicationStats, InMemoryDedupeStore};
pub use logging::{AlertAuditLog, AlertOutcome, AuditEntry};
