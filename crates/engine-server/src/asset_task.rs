//! Per-asset actor loop.
//!
//! Each task exclusively owns one `OrderBook` and processes messages one
//! at a time, so submissions and reads never interleave and the book
//! needs no locking.
//!
//! Two inbound channels:
//! - submissions: bounded, fire-and-forget from the caller's view. A full
//!   queue suspends the sender (backpressure, never a drop).
//! - queries: depth / snapshot requests, each carrying a oneshot reply.
//!
//! The loop is `biased` towards submissions. A caller that submits and
//! then queries always sees its own submissions applied.
//!
//! Trades are forwarded to the shared trade channel in execution order.

use std::sync::Arc;

use engine_core::{BookDepth, BookSnapshot, Matcher, Order, OrderBook};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::router::RouterError;
use crate::types::TradeTx;

const QUERY_QUEUE_CAPACITY: usize = 16;

enum AssetQuery {
    Depth(oneshot::Sender<BookDepth>),
    Snapshot(oneshot::Sender<BookSnapshot>),
}

/// Cloneable handle to one running asset actor.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    asset_id: Arc<str>,
    submit_tx: mpsc::Sender<Order>,
    query_tx: mpsc::Sender<AssetQuery>,
}

impl AssetHandle {
    /// Create an empty book for `asset_id` and spawn its actor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        asset_id: &str,
        matcher: Arc<dyn Matcher>,
        trade_tx: TradeTx,
        queue_capacity: usize,
    ) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(queue_capacity);
        let (query_tx, query_rx) = mpsc::channel(QUERY_QUEUE_CAPACITY);

        let book = OrderBook::with_matcher(asset_id, matcher);
        tokio::spawn(run_asset_loop(book, submit_rx, query_rx, trade_tx));

        AssetHandle {
            asset_id: Arc::from(asset_id),
            submit_tx,
            query_tx,
        }
    }

    /// Enqueue an order, waiting while the queue is full.
    pub async fn submit(&self, order: Order) -> Result<(), RouterError> {
        self.submit_tx
            .send(order)
            .await
            .map_err(|_| self.unavailable())
    }

    /// Round-trip a depth query through the actor.
    pub async fn depth(&self) -> Result<BookDepth, RouterError> {
        let (tx, rx) = oneshot::channel();
        self.query(AssetQuery::Depth(tx)).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Round-trip a snapshot query through the actor.
    pub async fn snapshot(&self) -> Result<BookSnapshot, RouterError> {
        let (tx, rx) = oneshot::channel();
        self.query(AssetQuery::Snapshot(tx)).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    async fn query(&self, query: AssetQuery) -> Result<(), RouterError> {
        self.query_tx
            .send(query)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RouterError {
        RouterError::AssetUnavailable(self.asset_id.to_string())
    }
}

async fn run_asset_loop(
    mut book: OrderBook,
    mut submit_rx: mpsc::Receiver<Order>,
    mut query_rx: mpsc::Receiver<AssetQuery>,
    trade_tx: TradeTx,
) {
    info!(asset = %book.asset_id(), "asset actor started");

    loop {
        tokio::select! {
            biased;
            Some(order) = submit_rx.recv() => apply(&mut book, order, &trade_tx),
            Some(query) = query_rx.recv() => answer(&book, query),
            else => break,
        }
    }

    info!(asset = %book.asset_id(), "asset actor stopped (all handles dropped)");
}

fn apply(book: &mut OrderBook, order: Order, trade_tx: &TradeTx) {
    let order_id = order.id.clone();
    match book.submit(order) {
        Ok(trades) => {
            debug!(
                asset = %book.asset_id(),
                order = %order_id,
                trades = trades.len(),
                buy_depth = book.buy_depth(),
                sell_depth = book.sell_depth(),
                "order applied"
            );
            for trade in trades {
                if trade_tx.send(trade).is_err() {
                    warn!(asset = %book.asset_id(), "trade channel closed, trade dropped");
                }
            }
        }
        Err(e) => {
            warn!(asset = %book.asset_id(), order = %order_id, error = %e, "order rejected by book");
        }
    }
}

fn answer(book: &OrderBook, query: AssetQuery) {
    // A dropped reply receiver just means the caller gave up.
    match query {
        AssetQuery::Depth(reply) => {
            let _ = reply.send(book.depth());
        }
        AssetQuery::Snapshot(reply) => {
            let _ = reply.send(book.snapshot());
        }
    }
}
