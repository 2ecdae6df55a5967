//! Agent registry handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use factory_core::{Agent, AgentId, AgentRegistration, AgentUpdate};

use crate::http::error::ApiResult;
use crate::http::responses::{AgentHealthResponse, AgentListResponse, MessageResponse};
use crate::service::{AgentService, ListParams};
use crate::state::AppState;

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<AgentListResponse>> {
    let page = AgentService::new(state).list(&params).await?;
    Ok(Json(page.into()))
}

pub async fn register_agent(
    State(state): State<Arc<AppState>>,
    Json(reg): Json<AgentRegistration>,
) -> ApiResult<(StatusCode, Json<Agent>)> {
    let agent = AgentService::new(state).register(reg).await?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(AgentService::new(state).get(&AgentId::new(id)).await?))
}

pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<AgentUpdate>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(
        AgentService::new(state)
            .update(&AgentId::new(id), update)
            .await?,
    ))
}

pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    AgentService::new(state).delete(&AgentId::new(id)).await?;
    Ok(Json(MessageResponse {
        message: "Agent deleted successfully".to_string(),
    }))
}

pub async fn agent_health(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentHealthResponse>> {
    Ok(Json(
        AgentService::new(state)
            .check_health(&AgentId::new(id))
            .await?,
    ))
}
