//! Error types for the core matching engine.
//!
//! Matching itself is infallible. These errors come from the guards in
//! front of it: an order that would break book invariants is rejected
//! with a reason instead of resting at a nonsensical price or size.

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Quantity is zero or negative.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    /// Price is zero or negative.
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),

    /// A required identifier is empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Order was routed to a book for a different asset.
    #[error("order for asset {got} submitted to book {expected}")]
    AssetMismatch { expected: String, got: String },

    /// An order with this id is already resting in the book.
    #[error("duplicate order id: {0}")]
    DuplicateOrderId(String),
}
