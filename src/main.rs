use anyhow::{Context, Result};
use axum::{extract::FromRef, Router};
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Settings;

// Declare modules
mod backend_api;
mod config;
mod error;
mod listing;
mod models;
mod pricing;
mod routes;
mod search;
mod trip;

// Define the application state struct
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    http_client: Arc<Client>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "rentals_rust=info,tower_http=info".into()))
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing rentals server...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!(backend = %s.backend_base_url, "Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    // One client for every backend call; picks up proxy and timeout from settings
    let http_client = backend_api::build_client(&settings).context("Failed to build shared reqwest client")?;
    tracing::info!("Shared HTTP client created.");

    let app_state = AppState {
        settings: Arc::new(settings),
        http_client: Arc::new(http_client),
    };

    let app: Router = routes::create_router(app_state.clone());

    let addr: SocketAddr = app_state.settings.server_address.parse().map_err(|e| {
        tracing::error!(
            "Invalid server address format in configuration ('{}'): {}",
            app_state.settings.server_address,
            e
        );
        anyhow::anyhow!("Invalid server address format: {}", app_state.settings.server_address)
    })?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
