//! Binary WebSocket server for the matching engine.

use engine_server::config::Config;
use engine_server::server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        max_clients = config.max_clients,
        asset_queue_capacity = config.asset_queue_capacity,
        client_buffer = config.client_buffer,
        "starting engine-server"
    );

    server::run(config).await
}
