//! Alert Receiver - Main Entry Point

use api::{init_logging, run_server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    init_logging(&config.log_level, config.json_logs)?;

    info!("=== Alert Receiver v{} ===", env!("CARGO_PKG_VERSION"));
    info!("{} receivers configured", config.receivers.len());

    run_server(config).await
}
