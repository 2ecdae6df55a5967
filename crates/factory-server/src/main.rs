//! AI Agent Factory Server

use std::net::SocketAddr;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use factory_server::{create_mcp_router, create_router, AppState, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("agent_factory_server=info,factory_server=info,tower_http=info")
            }),
        )
        .with_target(true)
        .init();

    // Load config
    let config = Config::parse();
    let addr: SocketAddr = config.bind_addr.parse()?;

    if config.devin_key().is_none() {
        warn!("DEVIN_API_KEY not set - tasks must be copied into Devin by hand");
    }

    // Create shared state, restoring the snapshot if one is configured
    let state = AppState::from_config(config).await?;
    if let Some(path) = state.persistence_path() {
        info!(
            path = %path,
            prds = state.prd_count().await,
            agents = state.agent_count().await,
            "Snapshot persistence enabled"
        );
    }

    info!(
        addr = %addr,
        environment = %state.config.environment,
        "Starting AI Agent Factory server"
    );

    // REST API plus the MCP endpoint on the same listener
    let ct = CancellationToken::new();
    let router = create_router(state.clone()).merge(create_mcp_router(state, ct.clone()));

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {} (REST at /api/v1, MCP at /mcp)", addr);

    let shutdown = {
        let ct = ct.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            ct.cancel();
        }
    };

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!(error = %e, "HTTP server error");
    }

    Ok(())
}
