// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! TrainQuest Wallet Server
//!
//! Registers player wallets, stores per-session game progress and executes
//! card trades, persisting everything to a single JSON file.

use std::net::SocketAddr;
use std::sync::Arc;
use trainquest::{
    config::Config,
    db::JsonFileStore,
    services::{Ledger, RouteService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting TrainQuest wallet server");

    // Load station catalog
    tracing::info!(path = %config.route_file.display(), "Loading route");
    let route = Arc::new(RouteService::load_from_file(&config.route_file)?);
    tracing::info!(
        train = %route.info().train_name,
        stations = route.len(),
        "Route loaded"
    );

    // Open the ledger file, creating it on first run
    let store = JsonFileStore::new(&config.data_file);
    store.initialize().await?;
    tracing::info!(path = %store.path().display(), "Ledger data file ready");

    let state = Arc::new(AppState {
        config: config.clone(),
        ledger: Ledger::new(store),
        route,
    });

    // Build router
    let app = trainquest::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("trainquest=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
