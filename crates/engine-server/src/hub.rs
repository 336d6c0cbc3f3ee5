//! Fan-out hub.
//!
//! A single task owns the registry of connected clients. It receives:
//! - trades from every asset actor, pushed to the buyer's and seller's
//!   connections and to `orders` subscribers,
//! - commands from sessions and the dispatcher (register, topic
//!   subscriptions, direct replies, topic broadcasts).
//!
//! Routing policy:
//! - `trade`  => every connection of the buyer and of the seller, plus
//!   every connection subscribed to `orders`. Each gets one copy.
//! - publish  => every connection subscribed to the topic.
//! - deliver  => the one named connection.
//!
//! Each client has a bounded outbound buffer. The hub never waits on it:
//! a full or closed buffer evicts the client. The hub holds the only
//! sender, so eviction also ends that client's writer.

use std::collections::{HashMap, HashSet};

use engine_core::Trade;
use engine_protocol::encode_trade;
use engine_protocol::wire_types::ENTITY_ORDERS;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::types::{ClientId, OutboundTx, TradeRx};

#[derive(Debug)]
pub enum HubCommand {
    Register {
        client_id: ClientId,
        user_id: Option<String>,
        tx: OutboundTx,
    },
    Unregister {
        client_id: ClientId,
    },
    Subscribe {
        client_id: ClientId,
        topic: String,
    },
    Unsubscribe {
        client_id: ClientId,
        topic: String,
    },
    Publish {
        topic: String,
        payload: String,
    },
    Deliver {
        client_id: ClientId,
        payload: String,
    },
    ClientCount(oneshot::Sender<usize>),
}

/// Handle used by sessions and the dispatcher to reach the hub task.
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubCommand>,
}

impl HubHandle {
    /// Spawn the hub task, consuming the shared trade channel.
    pub fn spawn(trade_rx: TradeRx) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_hub_loop(rx, trade_rx));
        HubHandle { tx }
    }

    pub fn register(&self, client_id: ClientId, user_id: Option<String>, tx: OutboundTx) {
        self.send(HubCommand::Register {
            client_id,
            user_id,
            tx,
        });
    }

    pub fn unregister(&self, client_id: ClientId) {
        self.send(HubCommand::Unregister { client_id });
    }

    pub fn subscribe(&self, client_id: ClientId, topic: impl Into<String>) {
        self.send(HubCommand::Subscribe {
            client_id,
            topic: topic.into(),
        });
    }

    pub fn unsubscribe(&self, client_id: ClientId, topic: impl Into<String>) {
        self.send(HubCommand::Unsubscribe {
            client_id,
            topic: topic.into(),
        });
    }

    pub fn publish(&self, topic: impl Into<String>, payload: String) {
        self.send(HubCommand::Publish {
            topic: topic.into(),
            payload,
        });
    }

    pub fn deliver(&self, client_id: ClientId, payload: String) {
        self.send(HubCommand::Deliver { client_id, payload });
    }

    /// Number of registered clients, after all earlier commands.
    pub async fn client_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        self.send(HubCommand::ClientCount(tx));
        rx.await.unwrap_or(0)
    }

    fn send(&self, cmd: HubCommand) {
        if self.tx.send(cmd).is_err() {
            warn!("hub task is gone, command dropped");
        }
    }
}

// -----------------------------------------------------------------------------
// Hub task
// -----------------------------------------------------------------------------

#[derive(Debug)]
struct ClientEntry {
    user_id: Option<String>,
    tx: OutboundTx,
    topics: HashSet<String>,
}

#[derive(Debug, Default)]
struct Hub {
    clients: HashMap<ClientId, ClientEntry>,
    by_user: HashMap<String, HashSet<ClientId>>,
}

async fn run_hub_loop(mut cmd_rx: mpsc::UnboundedReceiver<HubCommand>, mut trade_rx: TradeRx) {
    let mut hub = Hub::default();

    loop {
        tokio::select! {
            biased;
            Some(cmd) = cmd_rx.recv() => hub.handle(cmd),
            Some(trade) = trade_rx.recv() => hub.fan_out(&trade),
            else => break,
        }
    }

    info!("hub shutting down (all senders dropped)");
}

impl Hub {
    fn handle(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::Register {
                client_id,
                user_id,
                tx,
            } => {
                self.remove(client_id);
                if let Some(user) = &user_id {
                    self.by_user.entry(user.clone()).or_default().insert(client_id);
                }
                debug!(client = %client_id, user = ?user_id, "client registered");
                self.clients.insert(
                    client_id,
                    ClientEntry {
                        user_id,
                        tx,
                        topics: HashSet::new(),
                    },
                );
            }
            HubCommand::Unregister { client_id } => {
                if self.remove(client_id) {
                    debug!(client = %client_id, "client unregistered");
                }
            }
            HubCommand::Subscribe { client_id, topic } => {
                if let Some(entry) = self.clients.get_mut(&client_id) {
                    entry.topics.insert(topic);
                }
            }
            HubCommand::Unsubscribe { client_id, topic } => {
                if let Some(entry) = self.clients.get_mut(&client_id) {
                    entry.topics.remove(&topic);
                }
            }
            HubCommand::Publish { topic, payload } => {
                let targets: Vec<ClientId> = self
                    .clients
                    .iter()
                    .filter(|(_, entry)| entry.topics.contains(&topic))
                    .map(|(id, _)| *id)
                    .collect();
                for client_id in targets {
                    self.push(client_id, payload.clone());
                }
            }
            HubCommand::Deliver { client_id, payload } => {
                self.push(client_id, payload);
            }
            HubCommand::ClientCount(reply) => {
                let _ = reply.send(self.clients.len());
            }
        }
    }

    fn fan_out(&mut self, trade: &Trade) {
        let frame = match encode_trade(trade) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode trade");
                return;
            }
        };

        let mut targets: Vec<ClientId> = Vec::new();
        for user in [&trade.buyer_id, &trade.seller_id] {
            if let Some(ids) = self.by_user.get(user) {
                targets.extend(ids.iter().copied());
            }
        }
        targets.extend(
            self.clients
                .iter()
                .filter(|(_, entry)| entry.topics.contains(ENTITY_ORDERS))
                .map(|(id, _)| *id),
        );
        targets.sort_unstable();
        targets.dedup();

        if targets.is_empty() {
            debug!(
                buy = %trade.buy_order_id,
                sell = %trade.sell_order_id,
                "no connected recipient for trade"
            );
        }
        for client_id in targets {
            self.push(client_id, frame.clone());
        }
    }

    /// Non-blocking push. A client that cannot take the frame is evicted.
    fn push(&mut self, client_id: ClientId, frame: String) {
        let Some(entry) = self.clients.get(&client_id) else {
            return;
        };
        match entry.tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(client = %client_id, "outbound buffer full, evicting slow client");
                self.remove(client_id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client = %client_id, "outbound channel closed, removing client");
                self.remove(client_id);
            }
        }
    }

    fn remove(&mut self, client_id: ClientId) -> bool {
        let Some(entry) = self.clients.remove(&client_id) else {
            return false;
        };
        if let Some(user) = entry.user_id {
            if let Some(ids) = self.by_user.get_mut(&user) {
                ids.remove(&client_id);
                if ids.is_empty() {
                    self.by_user.remove(&user);
                }
            }
        }
        true
    }
}
