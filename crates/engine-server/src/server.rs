//! HTTP listener and top-level server wiring.
//!
//! This module:
//! - builds the shared state (router, hub, dispatcher, user service),
//! - exposes `/ws?user_id=<id>` and upgrades it to a WebSocket,
//! - refuses upgrades once `max_clients` sessions are registered,
//! - serves until Ctrl-C.
//!
//! Per-connection logic lives in `session`, request handling in
//! `dispatch`.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::hub::HubHandle;
use crate::router::OrderRouter;
use crate::session;
use crate::types::{ClientIdAllocator, TradeRx, TradeTx};
use crate::user_service::{InMemoryUserService, UserService};

/// Everything a connection handler needs. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    router: OrderRouter,
    hub: HubHandle,
    dispatcher: Dispatcher,
    ids: Arc<ClientIdAllocator>,
    config: Arc<Config>,
}

impl AppState {
    /// Wire up the engine with the in-memory user service.
    ///
    /// Spawns the hub task, so it must be called inside a tokio runtime.
    pub fn new(config: Config) -> Self {
        Self::with_user_service(config, Arc::new(InMemoryUserService::new()))
    }

    pub fn with_user_service(config: Config, users: Arc<dyn UserService>) -> Self {
        let (trade_tx, trade_rx): (TradeTx, TradeRx) = mpsc::unbounded_channel();
        let router = OrderRouter::new(trade_tx, config.asset_queue_capacity);
        let hub = HubHandle::spawn(trade_rx);
        let dispatcher = Dispatcher::new(router.clone(), hub.clone(), users);

        AppState {
            router,
            hub,
            dispatcher,
            ids: Arc::new(ClientIdAllocator::new()),
            config: Arc::new(config),
        }
    }

    pub fn router(&self) -> &OrderRouter {
        &self.router
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }
}

/// The HTTP application: a single WebSocket route.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind, serve and block until shutdown.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, max_clients = config.max_clients, "listening");

    let state = AppState::new(config);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ConnectParams {
    user_id: Option<String>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let connected = state.hub.client_count().await;
    if connected >= state.config.max_clients {
        warn!(
            connected,
            max_clients = state.config.max_clients,
            "rejecting connection: max_clients reached"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections").into_response();
    }

    let client_id = state.ids.next_id();
    let user_id = params.user_id.filter(|u| !u.is_empty());
    let hub = state.hub.clone();
    let dispatcher = state.dispatcher.clone();
    let buffer = state.config.client_buffer;

    ws.on_upgrade(move |socket| {
        session::run_session(socket, client_id, user_id, hub, dispatcher, buffer)
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            // Without a signal handler, run until the process is killed.
            warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
