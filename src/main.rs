use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use corner_duel::config::ServerConfig;
use corner_duel::net::start_websocket_server;
use corner_duel::state::SharedDuelState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("corner_duel=info")),
        )
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            std::process::exit(1);
        }
    };

    info!(
        bind = %config.bind_addr,
        tick_ms = config.tick_ms,
        friction = config.environment.friction_coefficient(),
        radius = config.environment.turn_radius(),
        "starting corner duel server"
    );

    let state = Arc::new(Mutex::new(SharedDuelState::new(&config)));

    tokio::select! {
        result = start_websocket_server(Arc::clone(&state), config) => {
            if let Err(err) = result {
                error!(%err, "server stopped");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }
}
