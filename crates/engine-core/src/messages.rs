//! Values produced by the matching engine.
//!
//! These are **transport-agnostic**: wire encoding lives in the
//! `engine-protocol` crate.

use rust_decimal::Decimal;

use crate::order::Order;
use crate::side::Side;

/// Trade event between a buyer and a seller.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub asset_id: String,

    pub buy_order_id: String,
    pub sell_order_id: String,

    pub buyer_id: String,
    pub seller_id: String,

    /// Matched quantity, always `> 0`.
    pub quantity: Decimal,

    /// Execution price: the resting order's limit price.
    pub price: Decimal,

    /// Creation time of the incoming (aggressing) order, in ns.
    pub timestamp_ns: u64,
}

impl Trade {
    /// Build the trade produced when `incoming` takes `quantity` from
    /// `resting`. Buyer and seller are assigned from the incoming side and
    /// the execution price is always the resting order's price.
    pub fn between(incoming: &Order, resting: &Order, quantity: Decimal) -> Self {
        let (buy, sell) = match incoming.side {
            Side::Buy => (incoming, resting),
            Side::Sell => (resting, incoming),
        };
        Trade {
            asset_id: incoming.asset_id.clone(),
            buy_order_id: buy.id.clone(),
            sell_order_id: sell.id.clone(),
            buyer_id: buy.user_id.clone(),
            seller_id: sell.user_id.clone(),
            quantity,
            price: resting.price,
            timestamp_ns: incoming.timestamp_ns,
        }
    }
}

/// Resting order counts on each side of one asset's book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookDepth {
    pub buy_depth: usize,
    pub sell_depth: usize,
}

/// Read-only copy of one asset's book, each side in priority order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BookSnapshot {
    pub asset_id: String,
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl BookSnapshot {
    pub fn depth(&self) -> BookDepth {
        BookDepth {
            buy_depth: self.bids.len(),
            sell_depth: self.asks.len(),
        }
    }
}
