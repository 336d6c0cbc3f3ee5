//! Matching algorithm, kept apart from the book it runs against.
//!
//! A [`Matcher`] sees the book only through [`BookView`], the minimal
//! capability set needed to consume the opposite side: look at the best
//! resting order, remove it, shrink it in place, or add an order back.
//!
//! [`PriceTimeMatcher`] is one loop for both sides: the incoming order
//! walks `side.opposite()` and stops as soon as
//! `side.crosses(limit, resting)` fails.

use std::fmt::Debug;

use rust_decimal::Decimal;
use tracing::debug;

use crate::messages::Trade;
use crate::order::Order;
use crate::side::Side;

/// What a matcher may do to a book.
pub trait BookView {
    /// Best resting order on `side`.
    fn peek_best(&self, side: Side) -> Option<&Order>;

    /// Remove the best resting order on `side`.
    fn pop_best(&mut self, side: Side) -> Option<Order>;

    /// Reduce the best resting order on `side` by `quantity`, leaving it
    /// at the head of its side. `quantity` is strictly less than the
    /// order's open quantity.
    fn reduce_best(&mut self, side: Side, quantity: Decimal);

    /// Rest an order on its own side.
    fn add(&mut self, order: Order);
}

/// Outcome of matching one incoming order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchResult {
    /// Trades in execution order.
    pub trades: Vec<Trade>,

    /// Quantity of the incoming order left unmatched.
    pub remaining_quantity: Decimal,
}

impl MatchResult {
    pub fn filled_quantity(&self) -> Decimal {
        self.trades.iter().map(|t| t.quantity).sum()
    }
}

/// Pluggable matching policy.
///
/// Implementations assume `incoming` has already been validated.
pub trait Matcher: Debug + Send + Sync {
    fn match_order(&self, incoming: &Order, book: &mut dyn BookView) -> MatchResult;
}

/// Price-time priority with self-trade prevention.
///
/// Execution happens at the resting order's price. The scan halts (it
/// does not skip) when the best resting order belongs to the incoming
/// order's owner.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceTimeMatcher;

impl Matcher for PriceTimeMatcher {
    fn match_order(&self, incoming: &Order, book: &mut dyn BookView) -> MatchResult {
        let contra = incoming.side.opposite();
        let mut trades = Vec::new();
        let mut remaining = incoming.quantity;

        while remaining > Decimal::ZERO {
            let Some(resting) = book.peek_best(contra) else {
                break;
            };

            if resting.user_id == incoming.user_id {
                debug!(
                    order = %incoming.id,
                    resting = %resting.id,
                    user = %incoming.user_id,
                    "self-trade prevented, halting match"
                );
                break;
            }

            if !incoming.side.crosses(incoming.price, resting.price) {
                break;
            }

            let resting_qty = resting.quantity;
            let match_qty = remaining.min(resting_qty);
            let trade = Trade::between(incoming, resting, match_qty);

            debug!(
                order = %incoming.id,
                side = %incoming.side,
                resting = %trade_counterparty(&trade, incoming.side),
                qty = %match_qty,
                price = %trade.price,
                "matched"
            );

            trades.push(trade);
            remaining -= match_qty;

            if match_qty == resting_qty {
                book.pop_best(contra);
            } else {
                book.reduce_best(contra, match_qty);
            }
        }

        if trades.is_empty() {
            debug!(order = %incoming.id, "order did not match anything");
        } else if remaining > Decimal::ZERO {
            debug!(order = %incoming.id, remaining = %remaining, "order partially filled");
        } else {
            debug!(order = %incoming.id, "order fully filled");
        }

        MatchResult {
            trades,
            remaining_quantity: remaining,
        }
    }
}

fn trade_counterparty(trade: &Trade, incoming: Side) -> &str {
    match incoming {
        Side::Buy => &trade.sell_order_id,
        Side::Sell => &trade.buy_order_id,
    }
}
