//! 📻 Ingest Bus UDP Receiver
//!
//! Listens for JSON `BusMessage` datagrams (market updates and commands) and
//! forwards them, in arrival order, to a bounded channel for the analytics
//! worker.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Notify};

use crate::metrics;
use crate::udp_bus::messages::BusMessage;

/// Largest datagram accepted; a full MarketUpdate with bars fits easily.
const MAX_DATAGRAM: usize = 64 * 1024;

/// Statistics for received messages
#[derive(Debug, Clone, Default)]
pub struct ReceiverStats {
    pub total_received: u64,
    pub market_updates: u64,
    pub commands: u64,
    pub ignored: u64,
    pub parse_errors: u64,
}

/// UDP receiver for the ingest bus
pub struct BusReceiver {
    socket: Arc<UdpSocket>,
    channel_capacity: usize,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    total_received: Arc<AtomicU64>,
    market_update_count: Arc<AtomicU64>,
    command_count: Arc<AtomicU64>,
    ignored_count: Arc<AtomicU64>,
    parse_error_count: Arc<AtomicU64>,
}

impl BusReceiver {
    pub async fn bind(addr: SocketAddr, channel_capacity: usize) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind UDP socket for ingest bus on {}", addr))?;

        info!("📻 Ingest bus receiver bound to {}", socket.local_addr()?);

        Ok(Self {
            socket: Arc::new(socket),
            channel_capacity: channel_capacity.max(1),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(Notify::new()),
            total_received: Arc::new(AtomicU64::new(0)),
            market_update_count: Arc::new(AtomicU64::new(0)),
            command_count: Arc::new(AtomicU64::new(0)),
            ignored_count: Arc::new(AtomicU64::new(0)),
            parse_error_count: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Start receiving messages
    ///
    /// Returns the consumer end of the channel. When the channel is full the
    /// receive loop waits, which applies backpressure to the socket buffer.
    pub fn start(&self) -> mpsc::Receiver<BusMessage> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        self.running.store(true, Ordering::Relaxed);

        let socket = self.socket.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown.clone();
        let total_received = self.total_received.clone();
        let market_update_count = self.market_update_count.clone();
        let command_count = self.command_count.clone();
        let ignored_count = self.ignored_count.clone();
        let parse_error_count = self.parse_error_count.clone();

        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];

            info!("🎧 Started listening for ingest bus messages...");

            while running.load(Ordering::Relaxed) {
                let received = tokio::select! {
                    _ = shutdown.notified() => break,
                    received = socket.recv_from(&mut buf) => received,
                };

                match received {
                    Ok((len, addr)) => {
                        total_received.fetch_add(1, Ordering::Relaxed);
                        debug!("📨 Received {} bytes from {}", len, addr);

                        let Some(msg) = BusMessage::from_bytes(&buf[..len]) else {
                            parse_error_count.fetch_add(1, Ordering::Relaxed);
                            metrics::record_parse_error();
                            warn!("⚠️ Failed to parse bus message: {} bytes from {}", len, addr);
                            continue;
                        };

                        match &msg {
                            BusMessage::MarketUpdate(update) => {
                                market_update_count.fetch_add(1, Ordering::Relaxed);
                                debug!("📊 MarketUpdate: {} ({}) ${:.6}",
                                       update.symbol, update.mint_short(), update.price_usd);
                            }
                            BusMessage::Command(cmd) => {
                                command_count.fetch_add(1, Ordering::Relaxed);
                                info!("💬 Command: {} (corr={})", cmd.command, cmd.correlation_id);
                            }
                            other => {
                                ignored_count.fetch_add(1, Ordering::Relaxed);
                                debug!("↩️ Ignoring outbound-only message type {}", other.kind());
                                continue;
                            }
                        }

                        if let Err(e) = tx.send(msg).await {
                            warn!("⚠️ Failed to forward bus message: channel closed - {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("❌ UDP receive error: {}", e);
                    }
                }
            }

            info!("🛑 Ingest bus receiver stopped");
        });

        rx
    }

    /// Stop receiving. Dropping the sender half closes the worker's channel.
    pub fn stop(&self) {
        info!("🛑 Stopping ingest bus receiver...");
        self.running.store(false, Ordering::Relaxed);
        self.shutdown.notify_one();
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            total_received: self.total_received.load(Ordering::Relaxed),
            market_updates: self.market_update_count.load(Ordering::Relaxed),
            commands: self.command_count.load(Ordering::Relaxed),
            ignored: self.ignored_count.load(Ordering::Relaxed),
            parse_errors: self.parse_error_count.load(Ordering::Relaxed),
        }
    }

    pub fn print_stats(&self) {
        let stats = self.stats();
        info!("📊 Ingest Bus Statistics:");
        info!("   Total received: {}", stats.total_received);
        info!("   Market updates: {}", stats.market_updates);
        info!("   Commands: {}", stats.commands);
        info!("   Ignored: {}", stats.ignored);
        info!("   Parse errors: {}", stats.parse_errors);
    }
}
