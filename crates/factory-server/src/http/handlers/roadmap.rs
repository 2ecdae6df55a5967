//! Roadmap handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};

use factory_core::roadmap::{self, PrioritizationMatrix, RoadmapOverview, RoadmapQuery};

use crate::http::error::ApiResult;
use crate::http::responses::{RoadmapPrdsResponse, RoadmapResponse};
use crate::service::PrdService;
use crate::state::AppState;

pub async fn overview(State(state): State<Arc<AppState>>) -> Json<RoadmapOverview> {
    Json(PrdService::new(state).roadmap_overview().await)
}

pub async fn roadmap_prds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoadmapQuery>,
) -> ApiResult<Json<RoadmapPrdsResponse>> {
    let prds = PrdService::new(state).roadmap_prds(&query).await?;
    Ok(Json(RoadmapPrdsResponse {
        total: prds.len(),
        prds,
    }))
}

pub async fn prioritization_matrix(
    State(state): State<Arc<AppState>>,
) -> Json<PrioritizationMatrix> {
    Json(PrdService::new(state).prioritization_matrix().await)
}

/// Catalogs plus every PRD.
pub async fn roadmap(State(state): State<Arc<AppState>>) -> Json<RoadmapResponse> {
    let catalogs = roadmap::catalogs();
    Json(RoadmapResponse {
        categories: catalogs.categories,
        statuses: catalogs.statuses,
        priorities: catalogs.priorities,
        prds: PrdService::new(state).all().await,
    })
}

pub async fn categories() -> Json<Vec<String>> {
    Json(roadmap::catalogs().categories)
}

pub async fn statuses() -> Json<Vec<String>> {
    Json(roadmap::catalogs().statuses)
}

pub async fn priorities() -> Json<Vec<String>> {
    Json(roadmap::catalogs().priorities)
}
