//! Devin task handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use factory_core::{DevinTask, DevinTaskComplete, DevinTaskCreate, DevinTaskId};

use crate::http::error::ApiResult;
use crate::http::responses::{
    CompleteTaskResponse, DevinTaskListResponse, ExecuteResponse, PromptResponse,
};
use crate::service::{DevinService, ListParams};
use crate::state::AppState;

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<DevinTaskListResponse>> {
    let page = DevinService::new(state).list(&params).await?;
    Ok(Json(page.into()))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(create): Json<DevinTaskCreate>,
) -> ApiResult<(StatusCode, Json<DevinTask>)> {
    let task = DevinService::new(state).create(create).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DevinTask>> {
    Ok(Json(
        DevinService::new(state)
            .get(&DevinTaskId::new(id))
            .await?,
    ))
}

pub async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PromptResponse>> {
    Ok(Json(
        DevinService::new(state)
            .prompt(&DevinTaskId::new(id))
            .await?,
    ))
}

pub async fn execute_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExecuteResponse>> {
    Ok(Json(
        DevinService::new(state)
            .execute(&DevinTaskId::new(id))
            .await?,
    ))
}

pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(completion): Json<DevinTaskComplete>,
) -> ApiResult<Json<CompleteTaskResponse>> {
    Ok(Json(
        DevinService::new(state)
            .complete(&DevinTaskId::new(id), completion)
            .await?,
    ))
}

pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DevinTask>> {
    Ok(Json(
        DevinService::new(state)
            .cancel(&DevinTaskId::new(id))
            .await?,
    ))
}
