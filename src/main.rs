// src/main.rs
mod action_log;
mod api;
mod config;
mod geometry;
mod manifest;
mod model;
mod placement;
mod rearrangement;
mod retrieval;
mod sample;
mod search;
mod simulation;
mod space;
mod types;
mod waste;

use config::AppConfig;
use simulation::SimulationState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Loaded before the subscriber so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = dotenv {
        if !matches!(err, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            warn!(%err, "could not load .env");
        }
    }

    let app_config = AppConfig::from_env();
    let settings = &app_config.simulation;

    let state = if settings.seed_sample_data() {
        match sample::sample_state(settings.start_date(), settings.planner_config()) {
            Ok(state) => state,
            Err(err) => {
                error!(%err, "could not seed the demo station");
                std::process::exit(1);
            }
        }
    } else {
        SimulationState::new(settings.start_date(), settings.planner_config())
            .with_astronauts(sample::astronauts())
    };

    info!(
        date = %state.current_date,
        containers = state.containers.len(),
        items = state.items.len(),
        "stowage simulator starting"
    );

    if let Err(err) = api::start_api_server(app_config.api.clone(), state).await {
        error!(%err, "server stopped");
        std::process::exit(1);
    }
}
