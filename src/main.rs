mod api;
mod app;
mod clock;
mod config;
mod domain;
mod error;
mod logging;
mod middleware;
mod routes;
mod services;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;

use clock::SystemClock;
use services::{spawn_escalation_sweeper, TracingDispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = config::Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env)?;

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        missing_metadata = ?settings.missing_metadata_policy,
        "Starting dealer portal notification backend"
    );

    // Create application state
    let state = app::AppState::from_settings(
        settings.clone(),
        Arc::new(SystemClock),
        Arc::new(TracingDispatcher),
    );

    if settings.seed_defaults {
        state
            .notifications
            .seed_defaults()
            .context("failed to seed default templates and escalation rules")?;
    }

    // Background escalation sweep
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = spawn_escalation_sweeper(
        state.notifications.clone(),
        settings.escalation_sweep_interval(),
        shutdown_rx,
    );

    // Build application
    let app = app::create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.server_addr))?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send(true).ok();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Escalation sweeper did not stop cleanly");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
