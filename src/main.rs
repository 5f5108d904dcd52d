use std::sync::Arc;

use tracing::{error, info, Level};

use coop_sync_server::config::ServerConfig;
use coop_sync_server::engine::SyncEngine;
use coop_sync_server::equipment::EquipmentMap;
use coop_sync_server::net::server::SyncServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Co-op Sync Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: {}:{}, mode={:?}",
        config.bind_address, config.port, config.settings.game_mode
    );

    // Equipment remap table, tolerant of a missing file
    let equipment_map = EquipmentMap::load_or_default(&config.equipment_map_path);

    // Shared engine instance
    let engine = Arc::new(SyncEngine::new(&config, equipment_map));
    let server = SyncServer::new(config, engine);

    // Shutdown signal handler
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    // Run server with graceful shutdown
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Server stopped");
    Ok(())
}
