//! Shared types for the engine server.
//!
//! This module defines:
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between sessions, asset actors and the hub

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use engine_core::Trade;
use tokio::sync::mpsc;

/// Identifier for a connected client.
///
/// This is intentionally opaque; we just guarantee uniqueness
/// over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out `ClientId`s.
#[derive(Debug)]
pub struct ClientIdAllocator {
    next: AtomicU64,
}

impl ClientIdAllocator {
    pub fn new() -> Self {
        ClientIdAllocator {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> ClientId {
        ClientId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ClientIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialized frames from the hub to one client's writer.
pub type OutboundTx = mpsc::Sender<String>;
pub type OutboundRx = mpsc::Receiver<String>;

/// Trades from all asset actors → hub.
pub type TradeTx = mpsc::UnboundedSender<Trade>;
pub type TradeRx = mpsc::UnboundedReceiver<Trade>;
