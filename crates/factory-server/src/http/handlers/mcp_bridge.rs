//! REST side of the MCP cache.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::http::error::ApiResult;
use crate::http::responses::{load_prd_response, LoadPrdRequest, LoadPrdResponse, McpStatusResponse};
use crate::service::McpBridge;
use crate::state::AppState;

pub async fn load_prd(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoadPrdRequest>,
) -> ApiResult<Json<LoadPrdResponse>> {
    let data = McpBridge::new(state).load_prd(&req.prd_id).await?;
    Ok(Json(load_prd_response(data)))
}

pub async fn mcp_status(State(state): State<Arc<AppState>>) -> Json<McpStatusResponse> {
    Json(McpBridge::new(state).status().await)
}
