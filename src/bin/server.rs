//! deepcouncil WebSocket server binary.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `DEEPCOUNCIL_MODEL` — default model identifier
//! - `DEEPCOUNCIL_API_KEY` — API credential (falls back to `OPENAI_API_KEY`)
//! - `DEEPCOUNCIL_BASE_URL` — OpenAI-compatible endpoint
//! - `DEEPCOUNCIL_SEARCH_URL` — SearXNG-style search endpoint
//! - `RUST_LOG` — Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;

use deepcouncil::clients::{CachingClientFactory, SearxClient};
use deepcouncil::config::EngineConfig;
use deepcouncil::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,deepcouncil=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);

    let config = EngineConfig::from_env();
    if config.api_key.is_empty() {
        tracing::warn!("no API key configured; runs will fail until one is provided per request");
    }

    let clients = Arc::new(CachingClientFactory::new(config.client_cache_capacity));
    let search = Arc::new(SearxClient::new(
        config.search_endpoint.clone(),
        config.search_max_results,
    )?);

    let app = app_router(AppState::new(config, clients, search));

    tracing::info!("deepcouncil server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET /health — liveness probe");
    tracing::info!("  GET /ws     — WebSocket query session");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
