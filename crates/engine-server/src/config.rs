//! Configuration for the engine WebSocket server.
//!
//! Built once at startup and passed down explicitly. Defaults can be
//! overridden via environment variables:
//!
//! - `ENGINE_BIND_ADDR`            (default: "0.0.0.0")
//! - `ENGINE_PORT`                 (default: "8080")
//! - `ENGINE_MAX_CLIENTS`          (default: "1024")
//! - `ENGINE_ASSET_QUEUE_CAPACITY` (default: "100")
//! - `ENGINE_CLIENT_BUFFER`        (default: "256")

use std::env;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidEnv {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Bound of each asset actor's submission queue. A full queue blocks
    /// the submitting session.
    pub asset_queue_capacity: usize,

    /// Bound of each client's outbound buffer. A full buffer gets the
    /// client evicted.
    pub client_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            max_clients: 1024,
            asset_queue_capacity: 100,
            client_buffer: 256,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let bind_addr = env::var("ENGINE_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("ENGINE_PORT", defaults.port)?;
        let max_clients = read_env_or_default("ENGINE_MAX_CLIENTS", defaults.max_clients)?;
        let asset_queue_capacity =
            read_env_or_default("ENGINE_ASSET_QUEUE_CAPACITY", defaults.asset_queue_capacity)?;
        let client_buffer = read_env_or_default("ENGINE_CLIENT_BUFFER", defaults.client_buffer)?;

        let config = Config {
            bind_addr,
            port,
            max_clients,
            asset_queue_capacity,
            client_buffer,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the channels cannot be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Zero("max_clients"));
        }
        if self.asset_queue_capacity == 0 {
            return Err(ConfigError::Zero("asset_queue_capacity"));
        }
        if self.client_buffer == 0 {
            return Err(ConfigError::Zero("client_buffer"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.parse::<T>().map_err(|e| ConfigError::InvalidEnv {
            key,
            value: val.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
