//! Service, health and metrics handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use chrono::Utc;

use crate::http::responses::{ConfigResponse, HealthResponse, WelcomeResponse};
use crate::state::AppState;

/// Welcome endpoint.
pub async fn root() -> impl IntoResponse {
    Json(WelcomeResponse {
        message: "AI Agent Factory API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: "/api/v1".to_string(),
        mcp: "/mcp".to_string(),
    })
}

/// Liveness check.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Detailed health with the integrations that are configured.
pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let services = BTreeMap::from([
        ("devin_api".to_string(), state.devin.is_some()),
        ("persistence".to_string(), state.persistence_path().is_some()),
        ("mcp_server".to_string(), true),
    ]);
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        environment: state.config.environment.clone(),
        services,
    })
}

/// Configuration status without secrets.
pub async fn config_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    Json(ConfigResponse {
        environment: config.environment.clone(),
        devin_api_url: config.devin_api_url.clone(),
        devin_api_configured: state.devin.is_some(),
        github_org: config.github_org.clone(),
        mcp_server_url: config.mcp_url(),
        persistence: state.persistence_path(),
        cors_origins: config.cors_origins.clone(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = crate::metrics::collect_metrics(&state).await;
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}
