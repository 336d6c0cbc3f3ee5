//! engine-protocol
//!
//! Wire-level encoding/decoding for the matching engine's WebSocket
//! transport.
//!
//! This crate is responsible for turning text frames into logical
//! requests and engine values (`engine_core::Order` / `Trade`) back into
//! JSON notifications and replies.
//!
//! - [`wire_types`] : envelopes and payload shapes
//! - [`json_codec`] : decode requests, encode replies / notifications
//! - [`users`]      : user records for the user-service capability

pub mod wire_types;
pub mod json_codec;
pub mod users;

pub use json_codec::{
    ClientRequest,
    ProtocolError,
    decode_client_message,
    encode_error,
    encode_notification,
    encode_ok,
    encode_trade,
    parse_envelope,
};
