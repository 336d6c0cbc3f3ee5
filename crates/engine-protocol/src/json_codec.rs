//! JSON encoding/decoding for WebSocket text frames.
//!
//! This module converts between:
//! - raw text frames (`&str` / `String`)
//! - logical requests ([`ClientRequest`]) and engine values
//!   (`engine_core::Order`, `Trade`, `BookDepth`, `BookSnapshot`)
//!
//! Decoding is two-step: [`parse_envelope`] checks the frame is JSON
//! with a `type`, then [`ClientRequest::from_envelope`] interprets the
//! payload for that `(entity, type)` pair. Callers keep the envelope so
//! an error reply can name the operation that failed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use engine_core::{BookDepth, BookSnapshot, Order, Trade};

use crate::users::{CreateUserParams, UpdateUserParams};
use crate::wire_types::{
    AssetQuery, BookPayload, ClientEnvelope, DepthPayload, Notification, OrderPayload,
    ResponseStatus, ServerResponse, TradePayload, UserIdQuery, ENTITY_ORDERS, ENTITY_USERS,
    TYPE_TRADE,
};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("unsupported entity: {0:?}")]
    UnsupportedEntity(String),

    #[error("unsupported operation {kind:?} for entity {entity:?}")]
    UnsupportedOperation { entity: String, kind: String },

    #[error("invalid {entity}/{kind} payload: {source}")]
    InvalidPayload {
        entity: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(String),
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    SubmitOrder(Order),
    Depth { asset_id: String },
    Book { asset_id: String },
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    CreateUser(CreateUserParams),
    UpdateUser(UpdateUserParams),
    DeleteUser(Uuid),
    GetUser(Uuid),
    ListUsers,
}

impl ClientRequest {
    /// Interpret an envelope's payload according to its entity and type.
    pub fn from_envelope(env: &ClientEnvelope) -> Result<Self, ProtocolError> {
        let kind = env.kind.as_str();
        match env.entity.as_str() {
            ENTITY_ORDERS => match kind {
                "order" | "create" => {
                    let payload: OrderPayload = payload_of(env)?;
                    Ok(ClientRequest::SubmitOrder(order_from_payload(payload)?))
                }
                "depth" => {
                    let q: AssetQuery = payload_of(env)?;
                    Ok(ClientRequest::Depth { asset_id: q.asset_id })
                }
                "book" => {
                    let q: AssetQuery = payload_of(env)?;
                    Ok(ClientRequest::Book { asset_id: q.asset_id })
                }
                "subscribe" => Ok(ClientRequest::Subscribe {
                    topic: ENTITY_ORDERS.to_string(),
                }),
                "unsubscribe" => Ok(ClientRequest::Unsubscribe {
                    topic: ENTITY_ORDERS.to_string(),
                }),
                _ => Err(unsupported(env)),
            },
            ENTITY_USERS => match kind {
                "create" => Ok(ClientRequest::CreateUser(payload_of(env)?)),
                "update" => Ok(ClientRequest::UpdateUser(payload_of(env)?)),
                "delete" => {
                    let q: UserIdQuery = payload_of(env)?;
                    Ok(ClientRequest::DeleteUser(q.user_id))
                }
                "get_by_id" => {
                    let q: UserIdQuery = payload_of(env)?;
                    Ok(ClientRequest::GetUser(q.user_id))
                }
                "get" => Ok(ClientRequest::ListUsers),
                "subscribe" => Ok(ClientRequest::Subscribe {
                    topic: ENTITY_USERS.to_string(),
                }),
                "unsubscribe" => Ok(ClientRequest::Unsubscribe {
                    topic: ENTITY_USERS.to_string(),
                }),
                _ => Err(unsupported(env)),
            },
            other => Err(ProtocolError::UnsupportedEntity(other.to_string())),
        }
    }
}

/// Parse a text frame into its envelope.
pub fn parse_envelope(text: &str) -> Result<ClientEnvelope, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse and interpret a text frame in one go.
pub fn decode_client_message(text: &str) -> Result<ClientRequest, ProtocolError> {
    ClientRequest::from_envelope(&parse_envelope(text)?)
}

// -----------------------------------------------------------------------------
// Encoders
// -----------------------------------------------------------------------------

/// Trade notification pushed to each counterparty.
pub fn encode_trade(trade: &Trade) -> Result<String, ProtocolError> {
    let note = Notification {
        kind: TYPE_TRADE.to_string(),
        entity: ENTITY_ORDERS.to_string(),
        payload: trade_to_payload(trade)?,
    };
    Ok(serde_json::to_string(&note)?)
}

/// Entity-update push to topic subscribers.
pub fn encode_notification<T: Serialize>(
    entity: &str,
    kind: &str,
    payload: &T,
) -> Result<String, ProtocolError> {
    let note = Notification {
        kind: kind.to_string(),
        entity: entity.to_string(),
        payload,
    };
    Ok(serde_json::to_string(&note)?)
}

pub fn encode_ok<T: Serialize>(entity: &str, kind: &str, data: &T) -> Result<String, ProtocolError> {
    encode_response(ResponseStatus::Ok, entity, kind, serde_json::to_value(data)?)
}

/// Error reply: `data` is `{"error": message}`.
pub fn encode_error(entity: &str, kind: &str, message: &str) -> Result<String, ProtocolError> {
    encode_response(
        ResponseStatus::Error,
        entity,
        kind,
        serde_json::json!({ "error": message }),
    )
}

fn encode_response(
    status: ResponseStatus,
    entity: &str,
    kind: &str,
    data: Value,
) -> Result<String, ProtocolError> {
    let resp = ServerResponse {
        status,
        entity: entity.to_string(),
        kind: kind.to_string(),
        data,
    };
    Ok(serde_json::to_string(&resp)?)
}

// -----------------------------------------------------------------------------
// Conversions
// -----------------------------------------------------------------------------

pub fn order_from_payload(payload: OrderPayload) -> Result<Order, ProtocolError> {
    let timestamp_ns = match payload.created_at {
        Some(at) => datetime_to_ns(at)?,
        None => Order::current_timestamp_ns(),
    };
    Ok(Order::new(
        payload.id,
        payload.user_id,
        payload.asset_id,
        payload.side.into(),
        payload.quantity,
        payload.price,
        timestamp_ns,
    ))
}

pub fn order_to_payload(order: &Order) -> Result<OrderPayload, ProtocolError> {
    Ok(OrderPayload {
        id: order.id.clone(),
        user_id: order.user_id.clone(),
        asset_id: order.asset_id.clone(),
        side: order.side.into(),
        quantity: order.quantity,
        price: order.price,
        created_at: Some(ns_to_datetime(order.timestamp_ns)?),
    })
}

pub fn trade_to_payload(trade: &Trade) -> Result<TradePayload, ProtocolError> {
    Ok(TradePayload {
        asset_id: trade.asset_id.clone(),
        buy_order_id: trade.buy_order_id.clone(),
        sell_order_id: trade.sell_order_id.clone(),
        buyer_id: trade.buyer_id.clone(),
        seller_id: trade.seller_id.clone(),
        quantity: trade.quantity,
        price: trade.price,
        timestamp: ns_to_datetime(trade.timestamp_ns)?,
    })
}

pub fn depth_to_payload(asset_id: &str, depth: BookDepth) -> DepthPayload {
    DepthPayload {
        asset_id: asset_id.to_string(),
        buy_depth: depth.buy_depth,
        sell_depth: depth.sell_depth,
    }
}

pub fn book_to_payload(snapshot: &BookSnapshot) -> Result<BookPayload, ProtocolError> {
    Ok(BookPayload {
        asset_id: snapshot.asset_id.clone(),
        bids: snapshot.bids.iter().map(order_to_payload).collect::<Result<_, _>>()?,
        asks: snapshot.asks.iter().map(order_to_payload).collect::<Result<_, _>>()?,
    })
}

fn datetime_to_ns(at: DateTime<Utc>) -> Result<u64, ProtocolError> {
    at.timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .ok_or_else(|| ProtocolError::InvalidTimestamp(at.to_rfc3339()))
}

fn ns_to_datetime(ns: u64) -> Result<DateTime<Utc>, ProtocolError> {
    let secs = i64::try_from(ns / 1_000_000_000)
        .map_err(|_| ProtocolError::InvalidTimestamp(ns.to_string()))?;
    let nanos = (ns % 1_000_000_000) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| ProtocolError::InvalidTimestamp(ns.to_string()))
}

fn payload_of<T: serde::de::DeserializeOwned>(env: &ClientEnvelope) -> Result<T, ProtocolError> {
    serde_json::from_value(env.payload.clone()).map_err(|source| ProtocolError::InvalidPayload {
        entity: env.entity.clone(),
        kind: env.kind.clone(),
        source,
    })
}

fn unsupported(env: &ClientEnvelope) -> ProtocolError {
    ProtocolError::UnsupportedOperation {
        entity: env.entity.clone(),
        kind: env.kind.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Side;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn decodes_order_submission() {
        let frame = json!({
            "type": "order",
            "entity": "orders",
            "payload": {
                "id": "b1",
                "user_id": "u1",
                "asset_id": "BTC",
                "side": "BUY",
                "quantity": 2.5,
                "price": 101.0,
                "created_at": "2024-01-01T00:00:00.000000001Z"
            }
        })
        .to_string();

        let order = match decode_client_message(&frame).unwrap() {
            ClientRequest::SubmitOrder(order) => order,
            other => panic!("expected order, got {other:?}"),
        };
        assert_eq!(order.id, "b1");
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.quantity, dec!(2.5));
        assert_eq!(order.timestamp_ns, 1_704_067_200_000_000_001);
    }

    #[test]
    fn fractional_quantities_decode_exactly() {
        let frame = r#"{"type":"create","entity":"orders","payload":
            {"id":"b2","user_id":"u3","asset_id":"BTC","side":"BUY","quantity":0.1,"price":100.25}}"#;

        let Ok(ClientRequest::SubmitOrder(order)) = decode_client_message(frame) else {
            panic!("expected order");
        };
        assert_eq!(order.quantity, dec!(0.1));
        assert_eq!(order.price, dec!(100.25));
    }

    #[test]
    fn missing_created_at_is_stamped_now() {
        let frame = r#"{"type":"create","entity":"orders","payload":
            {"id":"s1","user_id":"u2","asset_id":"ETH","side":"SELL","quantity":1,"price":5}}"#;
        let before = Order::current_timestamp_ns();

        let Ok(ClientRequest::SubmitOrder(order)) = decode_client_message(frame) else {
            panic!("expected order");
        };
        assert!(order.timestamp_ns >= before);
        assert_eq!(order.side, Side::Sell);
    }

    #[test]
    fn rejects_unknown_entity_and_operation() {
        let err = decode_client_message(r#"{"type":"get","entity":"widgets"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedEntity(e) if e == "widgets"));

        let err = decode_client_message(r#"{"type":"cancel","entity":"orders"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedOperation { .. }));

        assert!(matches!(
            decode_client_message("not json"),
            Err(ProtocolError::InvalidJson(_))
        ));
    }

    #[test]
    fn bad_order_payload_names_the_operation() {
        let frame = r#"{"type":"order","entity":"orders","payload":{"id":"x","side":"HOLD"}}"#;
        let err = decode_client_message(frame).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidPayload { ref entity, ref kind, .. } if entity == "orders" && kind == "order"
        ));
    }

    #[test]
    fn decodes_user_requests() {
        let id = Uuid::new_v4();
        let frame = json!({"type": "get_by_id", "entity": "users", "payload": {"user_id": id}}).to_string();
        assert_eq!(decode_client_message(&frame).unwrap(), ClientRequest::GetUser(id));

        assert_eq!(
            decode_client_message(r#"{"type":"get","entity":"users"}"#).unwrap(),
            ClientRequest::ListUsers
        );
        assert_eq!(
            decode_client_message(r#"{"type":"subscribe","entity":"users"}"#).unwrap(),
            ClientRequest::Subscribe { topic: "users".into() }
        );
    }

    #[test]
    fn trade_notification_shape() {
        let trade = Trade {
            asset_id: "BTC".into(),
            buy_order_id: "b1".into(),
            sell_order_id: "s1".into(),
            buyer_id: "u1".into(),
            seller_id: "u2".into(),
            quantity: dec!(1),
            price: dec!(100),
            timestamp_ns: 1_000_000_000,
        };

        let text = encode_trade(&trade).unwrap();
        let v: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(v["type"], "trade");
        assert_eq!(v["entity"], "orders");
        assert_eq!(v["payload"]["buyer_id"], "u1");
        assert_eq!(v["payload"]["seller_id"], "u2");
        assert_eq!(v["payload"]["price"], 100.0);
        assert_eq!(v["payload"]["timestamp"], "1970-01-01T00:00:01Z");
    }

    #[test]
    fn error_reply_carries_message() {
        let text = encode_error("orders", "order", "invalid price: 0").unwrap();
        let resp: ServerResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(resp.status, ResponseStatus::Error);
        assert_eq!(resp.data["error"], "invalid price: 0");
    }
}
