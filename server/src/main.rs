use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::levels::LevelTracker;
use server::network::Server;
use server::registry::PlayerRegistry;
use server::seed::dummy_player;
use shared::get_timestamp;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    info!("Server starting...");

    let mut registry = PlayerRegistry::new();
    if config.seed_player {
        registry = registry.with_seed(dummy_player(get_timestamp()));
    }
    let registry = Arc::new(registry);
    let levels = Arc::new(LevelTracker::new(Arc::clone(&registry)));

    let server = match Server::bind(&config, registry, levels).await {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to bind server endpoints: {}", e);
            return Err(e);
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server task failed: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
