//! PRD handlers.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use factory_core::completion::{ChatReply, ChatRequest};
use factory_core::{Prd, PrdCreate, PrdId, PrdUpdate};

use crate::http::error::{ApiError, ApiResult};
use crate::http::responses::{
    AnswerRequest, AnswerResponse, CompletionResponse, GuidedQuestionsResponse, MarkReadyResponse,
    MarkdownResponse, MessageResponse, PrdListResponse, ReadyPrdsResponse,
};
use crate::service::{ListParams, PrdService};
use crate::state::AppState;

pub async fn list_prds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PrdListResponse>> {
    let page = PrdService::new(state).list(&params).await?;
    Ok(Json(page.into()))
}

pub async fn create_prd(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<PrdCreate>,
) -> ApiResult<(StatusCode, Json<Prd>)> {
    let prd = PrdService::new(state).create(fields).await?;
    Ok((StatusCode::CREATED, Json(prd)))
}

pub async fn get_prd(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Prd>> {
    Ok(Json(PrdService::new(state).get(&PrdId::new(id)).await?))
}

pub async fn update_prd(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PrdUpdate>,
) -> ApiResult<Json<Prd>> {
    Ok(Json(
        PrdService::new(state)
            .update(&PrdId::new(id), update)
            .await?,
    ))
}

pub async fn delete_prd(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    PrdService::new(state).delete(&PrdId::new(id)).await?;
    Ok(Json(MessageResponse {
        message: "PRD deleted successfully".to_string(),
    }))
}

/// Body length errors surface as 413, anything else as a bad request.
fn multipart_error(err: MultipartError, context: &str) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("{context}: {}", err.body_text()))
    } else {
        ApiError::BadRequest(format!("{context}: {err}"))
    }
}

/// Upload a markdown PRD as multipart field `file`.
pub async fn upload_prd(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Prd>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Invalid multipart body"))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("No filename provided".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read upload"))?;
        let prd = PrdService::new(state).upload(&filename, &bytes).await?;
        return Ok((StatusCode::CREATED, Json(prd)));
    }
    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

pub async fn get_markdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MarkdownResponse>> {
    Ok(Json(PrdService::new(state).markdown(&PrdId::new(id)).await?))
}

/// Export as a downloadable `.md` file.
pub async fn download_markdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let export = PrdService::new(state).markdown(&PrdId::new(id)).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export.filename.replace('"', "")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.markdown,
    ))
}

pub async fn list_ready_for_devin(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<ReadyPrdsResponse>> {
    let prds = PrdService::new(state).ready_for_devin().await;
    Ok(Json(ReadyPrdsResponse {
        message: format!("Found {} PRD(s) ready for Devin", prds.len()),
        count: prds.len(),
        prds,
    }))
}

pub async fn mark_ready_for_devin(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MarkReadyResponse>> {
    let prd = PrdService::new(state)
        .mark_ready(&PrdId::new(id))
        .await?;
    Ok(Json(MarkReadyResponse {
        message: "PRD marked as ready for Devin".to_string(),
        prd_id: prd.id.clone(),
        status: prd.status,
        prd,
    }))
}

pub async fn get_completion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompletionResponse>> {
    Ok(Json(
        PrdService::new(state)
            .completion(&PrdId::new(id))
            .await?,
    ))
}

pub async fn get_guided_questions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<GuidedQuestionsResponse>> {
    Ok(Json(
        PrdService::new(state)
            .guided_questions(&PrdId::new(id))
            .await?,
    ))
}

pub async fn answer_section(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let (prd, completion_percentage) = PrdService::new(state)
        .answer(&PrdId::new(id), &req.section, &req.content)
        .await?;
    Ok(Json(AnswerResponse {
        prd,
        completion_percentage,
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatReply>> {
    Ok(Json(
        PrdService::new(state)
            .chat(&PrdId::new(id), &req)
            .await?,
    ))
}
