//! Wire-level JSON shapes and constants.
//!
//! Client → server frames use a single envelope:
//!
//! ```text
//! {"type": "<operation>", "entity": "<orders|users>", "payload": {...}}
//! ```
//!
//! Server → client replies use:
//!
//! ```text
//! {"status": "ok|error", "entity": "...", "type": "...", "data": {...}}
//! ```
//!
//! Trade notifications reuse the client envelope shape with
//! `type = "trade"`, `entity = "orders"`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use engine_core::Side;

pub const ENTITY_ORDERS: &str = "orders";
pub const ENTITY_USERS: &str = "users";

pub const TYPE_TRADE: &str = "trade";

/// Inbound frame envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub entity: String,

    #[serde(default)]
    pub payload: Value,
}

/// Outbound push (trades, entity updates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub entity: String,
    pub payload: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Reply to a single client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResponse {
    pub status: ResponseStatus,
    pub entity: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WireSide {
    Buy,
    Sell,
}

impl From<Side> for WireSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => WireSide::Buy,
            Side::Sell => WireSide::Sell,
        }
    }
}

impl From<WireSide> for Side {
    fn from(side: WireSide) -> Self {
        match side {
            WireSide::Buy => Side::Buy,
            WireSide::Sell => Side::Sell,
        }
    }
}

/// Limit order as submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPayload {
    pub id: String,
    pub user_id: String,
    pub asset_id: String,
    pub side: WireSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,

    /// Defaults to the time the frame is decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePayload {
    pub asset_id: String,
    pub buy_order_id: String,
    pub sell_order_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetQuery {
    pub asset_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthPayload {
    pub asset_id: String,
    pub buy_depth: usize,
    pub sell_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookPayload {
    pub asset_id: String,
    pub bids: Vec<OrderPayload>,
    pub asks: Vec<OrderPayload>,
}
