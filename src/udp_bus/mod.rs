//! 📡 UDP Bus - Communication layer for the analytics service
//!
//! Handles all UDP-based messaging:
//! - Ingest Bus: market updates and commands → analytics worker
//! - Publish Bus: alerts and command replies → delivery front end

pub mod messages;
pub mod receiver;
pub mod sender;

pub use messages::{Alert, BusMessage, CommandReply, CommandRequest, MarketUpdate, OhlcvBar, ReplyStatus, RouteInfo, TokenMetadata};
pub use receiver::{BusReceiver, ReceiverStats};
pub use sender::{BusSender, SenderStats};
