//! engine-core
//!
//! Pure matching engine logic:
//! - order and trade representation
//! - comparator-driven priority queue
//! - price-time matcher with self-trade prevention
//! - per-asset order book

pub mod side;
pub mod order;
pub mod messages;
pub mod priority_queue;
pub mod matcher;
pub mod order_book;
pub mod error;

pub use rust_decimal::Decimal;

pub use side::Side;
pub use order::Order;
pub use messages::{BookDepth, BookSnapshot, Trade};
pub use priority_queue::{Comparator, PriorityQueue};
pub use matcher::{BookView, MatchResult, Matcher, PriceTimeMatcher};
pub use order_book::{ask_priority, bid_priority, OrderBook};
pub use error::EngineError;
