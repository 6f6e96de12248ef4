//! 📤 Publish Bus UDP Sender
//!
//! Sends alerts and command replies as JSON datagrams to the delivery front
//! end. Sends are non-blocking so the analytics worker never waits on the
//! network.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::UdpSocket;

use crate::service::{AlertSink, ReplySink};
use crate::udp_bus::messages::{Alert, BusMessage, CommandReply};

#[derive(Debug, Clone, Default)]
pub struct SenderStats {
    pub alerts_sent: u64,
    pub replies_sent: u64,
    pub errors: u64,
}

pub struct BusSender {
    socket: Arc<UdpSocket>,
    target_addr: SocketAddr,
    alerts_sent: AtomicU64,
    replies_sent: AtomicU64,
    error_count: AtomicU64,
}

impl BusSender {
    /// Bind an ephemeral local port that sends to `target_addr`
    pub async fn new(target_addr: SocketAddr) -> Result<Self> {
        let bind_addr: SocketAddr = if target_addr.is_ipv4() {
            "0.0.0.0:0".parse()?
        } else {
            "[::]:0".parse()?
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .context("Failed to bind UDP socket for publish bus sender")?;

        info!("📡 Publish bus sender bound to {} → target {}", socket.local_addr()?, target_addr);

        Ok(Self {
            socket: Arc::new(socket),
            target_addr,
            alerts_sent: AtomicU64::new(0),
            replies_sent: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
        })
    }

    pub fn target_addr(&self) -> SocketAddr {
        self.target_addr
    }

    fn send_message(&self, message: &BusMessage) -> Result<()> {
        let bytes = message.to_bytes().context("Failed to encode bus message")?;

        match self.socket.try_send_to(&bytes, self.target_addr) {
            Ok(sent) => {
                if sent != bytes.len() {
                    warn!("⚠️ Partial send: {} of {} bytes for {}", sent, bytes.len(), message.kind());
                }
                Ok(())
            }
            Err(e) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                error!("❌ Failed to send {} to {}: {}", message.kind(), self.target_addr, e);
                Err(e).context("UDP send failed")
            }
        }
    }

    pub fn stats(&self) -> SenderStats {
        SenderStats {
            alerts_sent: self.alerts_sent.load(Ordering::Relaxed),
            replies_sent: self.replies_sent.load(Ordering::Relaxed),
            errors: self.error_count.load(Ordering::Relaxed),
        }
    }

    pub fn print_stats(&self) {
        let stats = self.stats();
        info!("📊 Publish Bus Statistics:");
        info!("   Alerts sent: {}", stats.alerts_sent);
        info!("   Replies sent: {}", stats.replies_sent);
        info!("   Errors: {}", stats.errors);
    }
}

impl AlertSink for BusSender {
    fn deliver(&self, alert: &Alert) -> Result<()> {
        self.send_message(&BusMessage::Alert(alert.clone()))?;
        self.alerts_sent.fetch_add(1, Ordering::Relaxed);
        debug!("📤 Sent alert {} for {} ({}, conf={})",
               alert.alert_id, alert.symbol, alert.band, alert.confidence);
        Ok(())
    }
}

impl ReplySink for BusSender {
    fn send_reply(&self, reply: &CommandReply) -> Result<()> {
        self.send_message(&BusMessage::CommandReply(reply.clone()))?;
        self.replies_sent.fetch_add(1, Ordering::Relaxed);
        debug!("📤 Sent reply corr={}", reply.correlation_id);
        Ok(())
    }
}
