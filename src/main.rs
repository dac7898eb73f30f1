// =============================================================================
// TW Stock Dashboard — Main Entry Point
// =============================================================================
//
// Serves the dashboard API: daily price history for a TWSE/TPEx ticker,
// technical indicators, rule-based signal text, Fibonacci levels and a chart
// description, all computed per request behind TTL caches.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod chart;
mod dashboard;
mod error;
mod fibonacci;
mod indicators;
mod market_data;
mod runtime_config;
mod signals;
mod types;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::DashboardConfig;

const DEFAULT_CONFIG_PATH: &str = "dashboard_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("TW stock dashboard starting up");

    let config_path =
        std::env::var("TWDASH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });

    if let Ok(addr) = std::env::var("TWDASH_BIND_ADDR") {
        config.bind_addr = addr;
    }

    info!(
        suffixes = ?config.market_suffixes,
        range = %config.history_range,
        price_ttl_s = config.price_cache_ttl_secs,
        name_ttl_s = config.name_cache_ttl_secs,
        "Configuration ready"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, &config_path)?);
    info!(entries = state.names.registry_len(), "Name registry ready");

    // ── 3. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.config.read().save(&state.config_path) {
        error!(error = %e, "Failed to save dashboard config on shutdown");
    }

    info!("TW stock dashboard shut down complete.");
    Ok(())
}
