//! HTTP server for the agent factory.
//!
//! Provides endpoints for:
//! - PRDs, roadmap, agents and Devin tasks (`/api/v1/...`)
//! - MCP cache bridge (`/api/v1/mcp/...`)
//! - Health check (`/health`, `/api/v1/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use factory_core::validation::MAX_UPLOAD_BYTES;

use crate::config::Config;
use crate::state::AppState;

pub mod error;
mod handlers;
pub mod responses;

#[cfg(test)]
mod tests;

/// Room for multipart boundaries and part headers around an upload.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_allows_any() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Routes served under `/api/v1`.
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // PRDs
        .route("/prds", get(handlers::list_prds).post(handlers::create_prd))
        .route(
            "/prds/upload",
            post(handlers::upload_prd)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/prds/ready-for-devin", get(handlers::list_ready_for_devin))
        .route("/prds/roadmap/overview", get(handlers::overview))
        .route("/prds/roadmap/prds", get(handlers::roadmap_prds))
        .route(
            "/prds/roadmap/prioritization-matrix",
            get(handlers::prioritization_matrix),
        )
        .route(
            "/prds/:id",
            get(handlers::get_prd)
                .put(handlers::update_prd)
                .delete(handlers::delete_prd),
        )
        .route("/prds/:id/markdown", get(handlers::get_markdown))
        .route(
            "/prds/:id/markdown/download",
            get(handlers::download_markdown),
        )
        .route(
            "/prds/:id/ready-for-devin",
            post(handlers::mark_ready_for_devin),
        )
        .route("/prds/:id/completion", get(handlers::get_completion))
        .route(
            "/prds/:id/guided-questions",
            get(handlers::get_guided_questions),
        )
        .route("/prds/:id/answer", post(handlers::answer_section))
        .route("/prds/:id/chat", post(handlers::chat))
        // Roadmap catalogs
        .route("/roadmap", get(handlers::roadmap))
        .route("/roadmap/categories", get(handlers::categories))
        .route("/roadmap/statuses", get(handlers::statuses))
        .route("/roadmap/priorities", get(handlers::priorities))
        // Agents
        .route(
            "/agents",
            get(handlers::list_agents).post(handlers::register_agent),
        )
        .route(
            "/agents/:id",
            get(handlers::get_agent)
                .put(handlers::update_agent)
                .delete(handlers::delete_agent),
        )
        .route("/agents/:id/health", get(handlers::agent_health))
        // Devin tasks
        .route(
            "/devin/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/devin/tasks/:id", get(handlers::get_task))
        .route("/devin/tasks/:id/prompt", get(handlers::get_prompt))
        .route("/devin/tasks/:id/execute", post(handlers::execute_task))
        .route("/devin/tasks/:id/complete", put(handlers::complete_task))
        .route("/devin/tasks/:id/cancel", post(handlers::cancel_task))
        // MCP bridge
        .route("/mcp/load-prd", post(handlers::load_prd))
        .route("/mcp/status", get(handlers::mcp_status))
        // Service
        .route("/health", get(handlers::api_health))
        .route("/config", get(handlers::config_status))
}

/// Create the HTTP router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .nest("/api/v1", api_routes())
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
