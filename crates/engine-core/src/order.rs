//! Limit order representation used inside the order book.
//!
//! An `Order` is immutable once submitted except for `quantity`, which
//! the matcher reduces as the order is partially filled. The timestamp
//! is the order's original creation time and is never refreshed, so a
//! partially filled remainder keeps its time priority.

use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::side::Side;

/// A single limit order.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    /// Caller-assigned identifier, unique per asset.
    pub id: String,
    pub user_id: String,
    pub asset_id: String,
    pub side: Side,

    /// Open (unfilled) quantity.
    pub quantity: Decimal,

    /// Limit price.
    pub price: Decimal,

    /// Creation time in nanoseconds since the Unix epoch (time priority).
    pub timestamp_ns: u64,
}

impl Order {
    /// Construct a limit order with an explicit timestamp.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        asset_id: impl Into<String>,
        side: Side,
        quantity: Decimal,
        price: Decimal,
        timestamp_ns: u64,
    ) -> Self {
        Order {
            id: id.into(),
            user_id: user_id.into(),
            asset_id: asset_id.into(),
            side,
            quantity,
            price,
            timestamp_ns,
        }
    }

    /// Check the order is fit to enter a book. Quantity and price must be
    /// positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.is_empty() {
            return Err(EngineError::MissingField("id"));
        }
        if self.user_id.is_empty() {
            return Err(EngineError::MissingField("user_id"));
        }
        if self.asset_id.is_empty() {
            return Err(EngineError::MissingField("asset_id"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidQuantity(self.quantity));
        }
        if self.price <= Decimal::ZERO {
            return Err(EngineError::InvalidPrice(self.price));
        }
        Ok(())
    }

    /// Get the current timestamp in nanoseconds since the Unix epoch.
    pub fn current_timestamp_ns() -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        now.as_secs()
            .saturating_mul(1_000_000_000)
            .saturating_add(now.subsec_nanos() as u64)
    }
}
