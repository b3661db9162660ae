//! Tank client - plays pyTanks rounds with the example agent
//!
//! Connects to the server named by `SERVER_ADDR`, then runs the game loop
//! until the server closes the connection or the process is interrupted.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tank_client::config::{Config, LogFormat};
use tank_client::{Session, SimpleAgent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config);

    info!("Starting tank client");
    info!("Server endpoint: {}", config.endpoint());

    let report = Session::new(config, SimpleAgent::new()).run().await?;

    if let Some(state) = &report.final_state {
        info!(
            round_active = state.is_round_active,
            alive = state.my_tank.is_alive,
            kills = ?state.my_tank.kills,
            wins = ?state.my_tank.wins,
            "Final state"
        );
    }

    info!("Client shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(env_filter)
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(true)))
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_target(true)))
        .init();
}
