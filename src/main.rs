//! Approach control simulator
//!
//! Entry point for the console simulator. It:
//! - loads configuration and static airport data
//! - runs the authoritative session loop on its own task
//! - reads controller directives from stdin and prints traffic to stdout

use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use approach_sim::app::AppState;
use approach_sim::config::Config;
use approach_sim::console::run_console;
use approach_sim::navdata::Airport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Static airport data
    let airport = match &config.airport_file {
        Some(path) => {
            info!(path = %path.display(), "Loading airport data");
            Airport::load(path)?
        }
        None => Airport::embedded_default()?,
    };

    info!("Starting approach control simulator");

    // Create application state and the session it drives
    let (state, session) = AppState::new(config, airport);
    info!(
        airport = %state.airport.icao,
        runways = state.airport.runways.len(),
        spawn_rate_per_min = state.config.spawn_rate_per_min,
        boundary_nm = state.config.boundary_nm,
        "Airspace loaded"
    );
    info!(session_id = %state.session.id, seed = state.seed, "Session created");

    // Subscribe before the session starts so the welcome line reaches the console
    let snapshot_rx = state.session.subscribe();
    let mut session_task = tokio::spawn(session.run());

    let console = run_console(
        state.session.clone(),
        snapshot_rx,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );

    let score = tokio::select! {
        result = &mut session_task => result?,
        result = console => {
            if let Err(e) = result {
                error!(error = %e, "Console failed");
            }
            let _ = state.session.shutdown().await;
            session_task.await?
        }
        _ = shutdown_signal() => {
            let _ = state.session.shutdown().await;
            session_task.await?
        }
    };

    info!(
        landings = score.landings,
        violation_secs = score.violation_secs,
        improper_exits = score.improper_exits,
        missed_approaches = score.missed_approaches,
        collision = score.collision,
        "Simulator shutdown complete"
    );

    // A pending stdin read sits on a blocking thread and would hold up runtime shutdown
    std::process::exit(0)
}

/// Initialize tracing/logging
///
/// Logs go to stderr so they do not interleave with the traffic display.
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
