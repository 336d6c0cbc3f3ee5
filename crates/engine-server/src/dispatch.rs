//! Text frame → action.
//!
//! One `Dispatcher` is shared by every session. It decodes a frame,
//! performs it against the router, hub or user service, and sends the
//! reply back to the originating client through the hub.

use std::sync::Arc;

use engine_core::BookSnapshot;
use engine_protocol::json_codec::{book_to_payload, depth_to_payload};
use engine_protocol::wire_types::{ClientEnvelope, ENTITY_ORDERS, ENTITY_USERS};
use engine_protocol::{encode_error, encode_notification, encode_ok, parse_envelope, ClientRequest, ProtocolError};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::hub::HubHandle;
use crate::router::{OrderRouter, RouterError};
use crate::types::ClientId;
use crate::user_service::{UserService, UserServiceError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Users(#[from] UserServiceError),
}

#[derive(Clone)]
pub struct Dispatcher {
    router: OrderRouter,
    hub: HubHandle,
    users: Arc<dyn UserService>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("hub", &self.hub)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(router: OrderRouter, hub: HubHandle, users: Arc<dyn UserService>) -> Self {
        Dispatcher { router, hub, users }
    }

    /// Handle one inbound text frame from `client_id`.
    ///
    /// Every frame gets exactly one reply: `status ok` with the result,
    /// or `status error` naming what went wrong.
    pub async fn handle_text(&self, client_id: ClientId, text: &str) {
        let env = match parse_envelope(text) {
            Ok(env) => env,
            Err(e) => {
                debug!(client = %client_id, error = %e, "unparsable frame");
                self.reply_error(client_id, "", "", &e.to_string());
                return;
            }
        };

        match self.perform(client_id, &env).await {
            Ok(frame) => self.hub.deliver(client_id, frame),
            Err(e) => {
                debug!(client = %client_id, entity = %env.entity, kind = %env.kind, error = %e, "request failed");
                self.reply_error(client_id, &env.entity, &env.kind, &e.to_string());
            }
        }
    }

    async fn perform(&self, client_id: ClientId, env: &ClientEnvelope) -> Result<String, DispatchError> {
        let entity = env.entity.as_str();
        let kind = env.kind.as_str();

        let frame = match ClientRequest::from_envelope(env)? {
            ClientRequest::SubmitOrder(order) => {
                let ack = json!({ "order_id": order.id, "asset_id": order.asset_id });
                self.router.submit(order).await?;
                encode_ok(ENTITY_ORDERS, "accepted", &ack)?
            }
            ClientRequest::Depth { asset_id } => {
                let depth = self.router.book_depth(&asset_id).await?;
                encode_ok(entity, kind, &depth_to_payload(&asset_id, depth))?
            }
            ClientRequest::Book { asset_id } => {
                let snapshot = self
                    .router
                    .get_book(&asset_id)
                    .await?
                    .unwrap_or_else(|| BookSnapshot {
                        asset_id: asset_id.clone(),
                        ..BookSnapshot::default()
                    });
                encode_ok(entity, kind, &book_to_payload(&snapshot)?)?
            }
            ClientRequest::Subscribe { topic } => {
                self.hub.subscribe(client_id, topic.clone());
                encode_ok(entity, kind, &json!({ "topic": topic }))?
            }
            ClientRequest::Unsubscribe { topic } => {
                self.hub.unsubscribe(client_id, topic.clone());
                encode_ok(entity, kind, &json!({ "topic": topic }))?
            }
            ClientRequest::CreateUser(params) => {
                let user = self.users.create_user(params).await?;
                self.publish_users(kind, &user);
                encode_ok(entity, kind, &user)?
            }
            ClientRequest::UpdateUser(params) => {
                let user = self.users.update_user(params).await?;
                self.publish_users(kind, &user);
                encode_ok(entity, kind, &user)?
            }
            ClientRequest::DeleteUser(user_id) => {
                self.users.delete_user(user_id).await?;
                let gone = json!({ "user_id": user_id, "deleted": true });
                self.publish_users(kind, &gone);
                encode_ok(entity, kind, &gone)?
            }
            ClientRequest::GetUser(user_id) => {
                let user = self.users.get_user(user_id).await?;
                encode_ok(entity, kind, &user)?
            }
            ClientRequest::ListUsers => {
                let users = self.users.list_users().await?;
                encode_ok(entity, kind, &users)?
            }
        };
        Ok(frame)
    }

    fn publish_users<T: serde::Serialize>(&self, kind: &str, payload: &T) {
        match encode_notification(ENTITY_USERS, kind, payload) {
            Ok(frame) => self.hub.publish(ENTITY_USERS, frame),
            Err(e) => warn!(error = %e, "failed to encode user notification"),
        }
    }

    fn reply_error(&self, client_id: ClientId, entity: &str, kind: &str, message: &str) {
        match encode_error(entity, kind, message) {
            Ok(frame) => self.hub.deliver(client_id, frame),
            Err(e) => warn!(client = %client_id, error = %e, "failed to encode error reply"),
        }
    }
}
