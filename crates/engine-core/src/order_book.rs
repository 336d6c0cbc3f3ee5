//! Single-asset order book with price-time priority.
//!
//! - One instance per asset.
//! - Bids: highest price first, then earliest timestamp.
//! - Asks: lowest price first, then earliest timestamp.
//!
//! The book owns both sides and applies submissions through a
//! [`Matcher`]. The side-level operations the matcher needs
//! (`peek`/`pop`/`reduce`/`add`) live on a crate-private type, so callers
//! outside the book can read depth and snapshots but never reach into a
//! side directly.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::trace;

use crate::error::EngineError;
use crate::matcher::{BookView, Matcher, PriceTimeMatcher};
use crate::messages::{BookDepth, BookSnapshot, Trade};
use crate::order::Order;
use crate::priority_queue::PriorityQueue;
use crate::side::Side;

/// Highest price first; earlier timestamp breaks ties.
pub fn bid_priority(a: &Order, b: &Order) -> Ordering {
    b.price
        .cmp(&a.price)
        .then(a.timestamp_ns.cmp(&b.timestamp_ns))
}

/// Lowest price first; earlier timestamp breaks ties.
pub fn ask_priority(a: &Order, b: &Order) -> Ordering {
    a.price
        .cmp(&b.price)
        .then(a.timestamp_ns.cmp(&b.timestamp_ns))
}

/// The two sides of a book plus the ids currently resting on them.
#[derive(Debug, Clone)]
pub(crate) struct BookSides {
    bids: PriorityQueue<Order>,
    asks: PriorityQueue<Order>,
    resting_ids: HashSet<String>,
}

impl BookSides {
    pub(crate) fn new() -> Self {
        BookSides {
            bids: PriorityQueue::new(bid_priority),
            asks: PriorityQueue::new(ask_priority),
            resting_ids: HashSet::new(),
        }
    }

    fn side(&self, side: Side) -> &PriorityQueue<Order> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut PriorityQueue<Order> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn is_resting(&self, order_id: &str) -> bool {
        self.resting_ids.contains(order_id)
    }
}

impl BookView for BookSides {
    fn peek_best(&self, side: Side) -> Option<&Order> {
        self.side(side).peek()
    }

    fn pop_best(&mut self, side: Side) -> Option<Order> {
        let order = self.side_mut(side).pop()?;
        self.resting_ids.remove(&order.id);
        Some(order)
    }

    fn reduce_best(&mut self, side: Side, quantity: Decimal) {
        self.side_mut(side).update_head(|o| o.quantity -= quantity);
    }

    fn add(&mut self, order: Order) {
        self.resting_ids.insert(order.id.clone());
        self.side_mut(order.side).push(order);
    }
}

/// Single-asset order book.
#[derive(Debug, Clone)]
pub struct OrderBook {
    asset_id: String,
    sides: BookSides,
    matcher: Arc<dyn Matcher>,
}

impl OrderBook {
    /// Create an empty book using [`PriceTimeMatcher`].
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self::with_matcher(asset_id, Arc::new(PriceTimeMatcher))
    }

    /// Create an empty book with a specific matching policy.
    pub fn with_matcher(asset_id: impl Into<String>, matcher: Arc<dyn Matcher>) -> Self {
        OrderBook {
            asset_id: asset_id.into(),
            sides: BookSides::new(),
            matcher,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    /// Apply one incoming order.
    ///
    /// Matches it against the opposite side, rests any unmatched remainder
    /// on its own side (keeping the original timestamp), and returns the
    /// trades in execution order.
    pub fn submit(&mut self, mut order: Order) -> Result<Vec<Trade>, EngineError> {
        if order.asset_id != self.asset_id {
            return Err(EngineError::AssetMismatch {
                expected: self.asset_id.clone(),
                got: order.asset_id,
            });
        }
        order.validate()?;
        if self.sides.is_resting(&order.id) {
            return Err(EngineError::DuplicateOrderId(order.id));
        }

        let result = self.matcher.match_order(&order, &mut self.sides);

        if result.remaining_quantity > Decimal::ZERO {
            order.quantity = result.remaining_quantity;
            trace!(asset = %self.asset_id, order = %order.id, qty = %order.quantity, "resting");
            self.sides.add(order);
        }

        Ok(result.trades)
    }

    pub fn buy_depth(&self) -> usize {
        self.sides.bids.len()
    }

    pub fn sell_depth(&self) -> usize {
        self.sides.asks.len()
    }

    pub fn depth(&self) -> BookDepth {
        BookDepth {
            buy_depth: self.buy_depth(),
            sell_depth: self.sell_depth(),
        }
    }

    /// Best bid price, if any.
    pub fn best_bid_price(&self) -> Option<Decimal> {
        self.sides.bids.peek().map(|o| o.price)
    }

    /// Best ask price, if any.
    pub fn best_ask_price(&self) -> Option<Decimal> {
        self.sides.asks.peek().map(|o| o.price)
    }

    /// Copy of both sides in priority order.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            asset_id: self.asset_id.clone(),
            bids: self.sides.bids.to_sorted_vec(),
            asks: self.sides.asks.to_sorted_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, user: &str, side: Side, qty: Decimal, price: Decimal, ts: u64) -> Order {
        Order::new(id, user, "BTC", side, qty, price, ts)
    }

    #[test]
    fn full_fill_removes_both_sides() {
        let mut book = OrderBook::new("BTC");
        assert!(book.submit(order("s1", "u2", Side::Sell, dec!(1.0), dec!(100.0), 1)).unwrap().is_empty());

        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(100.0), 2)).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, dec!(1.0));
        assert_eq!(trades[0].price, dec!(100.0));
        assert_eq!(book.depth(), BookDepth { buy_depth: 0, sell_depth: 0 });
    }

    #[test]
    fn partial_fill_rests_remainder_with_original_timestamp() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u2", Side::Sell, dec!(1.0), dec!(100.0), 1)).unwrap();

        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(3.0), dec!(100.0), 7)).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, dec!(1.0));
        assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 0 });

        let snap = book.snapshot();
        assert_eq!(snap.bids[0].quantity, dec!(2.0));
        assert_eq!(snap.bids[0].timestamp_ns, 7);
    }

    #[test]
    fn price_mismatch_leaves_both_resting() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u2", Side::Sell, dec!(1.0), dec!(100.0), 1)).unwrap();
        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(90.0), 2)).unwrap();

        assert!(trades.is_empty());
        assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 1 });
        assert_eq!(book.best_bid_price(), Some(dec!(90.0)));
        assert_eq!(book.best_ask_price(), Some(dec!(100.0)));
    }

    #[test]
    fn earlier_timestamp_wins_regardless_of_arrival() {
        let mut book = OrderBook::new("BTC");
        // Later timestamp arrives first.
        book.submit(order("s_late", "u2", Side::Sell, dec!(1.0), dec!(100.0), 20)).unwrap();
        book.submit(order("s_early", "u3", Side::Sell, dec!(1.0), dec!(100.0), 10)).unwrap();

        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(100.0), 30)).unwrap();

        assert_eq!(trades[0].sell_order_id, "s_early");
    }

    #[test]
    fn rejects_wrong_asset_invalid_and_duplicate_orders() {
        let mut book = OrderBook::new("BTC");

        let eth = Order::new("e1", "u1", "ETH", Side::Buy, dec!(1.0), dec!(1.0), 1);
        assert!(matches!(book.submit(eth), Err(EngineError::AssetMismatch { .. })));

        assert!(matches!(
            book.submit(order("z", "u1", Side::Buy, dec!(0.0), dec!(100.0), 1)),
            Err(EngineError::InvalidQuantity(_))
        ));
        assert!(matches!(
            book.submit(order("z", "u1", Side::Buy, dec!(1.0), dec!(-5.0), 1)),
            Err(EngineError::InvalidPrice(_))
        ));

        book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(90.0), 1)).unwrap();
        assert_eq!(
            book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(91.0), 2)),
            Err(EngineError::DuplicateOrderId("b1".to_string()))
        );
        assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 0 });
    }

    #[test]
    fn filled_id_can_be_reused() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u2", Side::Sell, dec!(1.0), dec!(100.0), 1)).unwrap();
        book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(100.0), 2)).unwrap();

        assert!(book.submit(order("s1", "u2", Side::Sell, dec!(1.0), dec!(100.0), 3)).is_ok());
        assert_eq!(book.sell_depth(), 1);
    }

    #[test]
    fn self_orders_both_rest() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u1", Side::Sell, dec!(1.0), dec!(100.0), 1)).unwrap();
        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(1.0), dec!(100.0), 2)).unwrap();

        assert!(trades.is_empty());
        assert_eq!(book.depth(), BookDepth { buy_depth: 1, sell_depth: 1 });
    }

    #[test]
    fn fractional_fills_leave_no_dust() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u2", Side::Sell, dec!(0.3), dec!(100), 1)).unwrap();

        let t1 = book.submit(order("b1", "u1", Side::Buy, dec!(0.1), dec!(100), 2)).unwrap();
        let t2 = book.submit(order("b2", "u3", Side::Buy, dec!(0.2), dec!(100), 3)).unwrap();

        assert_eq!(t1[0].quantity, dec!(0.1));
        assert_eq!(t2[0].quantity, dec!(0.2));
        assert_eq!(book.depth(), BookDepth::default());
        assert!(book.snapshot().bids.is_empty());
    }

    #[test]
    fn tiny_remainder_rests_with_exact_quantity() {
        let mut book = OrderBook::new("BTC");
        book.submit(order("s1", "u2", Side::Sell, dec!(0.1), dec!(100), 1)).unwrap();
        book.submit(order("s2", "u2", Side::Sell, dec!(0.2), dec!(100), 2)).unwrap();

        let trades = book.submit(order("b1", "u1", Side::Buy, dec!(0.30000001), dec!(100), 3)).unwrap();

        assert_eq!(trades.len(), 2);
        let snap = book.snapshot();
        assert!(snap.asks.is_empty());
        assert_eq!(snap.bids[0].quantity, dec!(0.00000001));
    }
}
