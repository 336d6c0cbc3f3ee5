//! engine-server
//!
//! Multi-client async WebSocket server for the matching engine: one actor
//! per asset, a router in front of them, and a hub fanning trades out to
//! connected clients.

pub mod config;
pub mod types;
pub mod asset_task;
pub mod router;
pub mod hub;
pub mod user_service;
pub mod dispatch;
pub mod server;

// internal, not re-exported
mod session;

pub use config::{Config, ConfigError};
pub use router::{OrderRouter, RouterError};
pub use user_service::{InMemoryUserService, UserService, UserServiceError};
