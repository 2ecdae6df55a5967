use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::create_router;
use crate::state::AppState;

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_prd(state: &Arc<AppState>, title: &str) -> String {
    let (status, prd) = send(
        state,
        "POST",
        "/api/v1/prds",
        Some(json!({
            "title": title,
            "description": "Routes support tickets to the right team",
            "requirements": ["Classify tickets", "Assign owners"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    prd["id"].as_str().unwrap().to_string()
}

fn multipart_upload(filename: &str, content: &str) -> Request<Body> {
    let boundary = "factory-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/markdown\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri("/api/v1/prds/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let state = AppState::new();
    let (status, body) = send(&state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&state, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["devin_api"], false);
    assert_eq!(body["services"]["mcp_server"], true);
}

#[tokio::test]
async fn test_config_hides_key() {
    let state = AppState::new();
    let (status, body) = send(&state, "GET", "/api/v1/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["devin_api_configured"], false);
    assert!(body.get("devin_api_key").is_none());
}

#[tokio::test]
async fn test_prd_crud() {
    let state = AppState::new();
    let id = create_prd(&state, "Ticket Router").await;

    let (status, prd) = send(&state, "GET", &format!("/api/v1/prds/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prd["title"], "Ticket Router");
    assert_eq!(prd["status"], "queue");
    assert_eq!(prd["prd_type"], "agent");

    let (status, prd) = send(
        &state,
        "PUT",
        &format!("/api/v1/prds/{id}"),
        Some(json!({ "category": "features", "priority": "high" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(prd["category"], "features");

    let (status, list) = send(&state, "GET", "/api/v1/prds?limit=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["prds"][0]["id"], id.as_str());

    let (status, body) = send(&state, "DELETE", &format!("/api/v1/prds/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "PRD deleted successfully");

    let (status, body) = send(&state, "GET", &format!("/api/v1/prds/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("PRD not found"));
}

#[tokio::test]
async fn test_create_prd_validation_error() {
    let state = AppState::new();
    let (status, body) = send(
        &state,
        "POST",
        "/api/v1/prds",
        Some(json!({ "title": "", "description": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_prds_rejects_unknown_status() {
    let state = AppState::new();
    let (status, _) = send(&state, "GET", "/api/v1/prds?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&state, "GET", "/api/v1/prds?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_transition_is_conflict() {
    let state = AppState::new();
    let id = create_prd(&state, "Ticket Router").await;
    let (status, body) = send(
        &state,
        "PUT",
        &format!("/api/v1/prds/{id}"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Invalid state transition"));
}

#[tokio::test]
async fn test_upload_markdown() {
    let state = AppState::new();
    let content = "# Ticket Router\n\n## Description\nRoutes tickets.\n\n## Requirements\n- Classify\n- Assign\n";
    let response = create_router(state.clone())
        .oneshot(multipart_upload("ticket_router.md", content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let prd: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(prd["title"], "Ticket Router");
    assert_eq!(prd["original_filename"], "ticket_router.md");
    assert_eq!(prd["requirements"][0], "Classify");
}

#[tokio::test]
async fn test_upload_rejects_wrong_extension() {
    let state = AppState::new();
    let response = create_router(state)
        .oneshot(multipart_upload("ticket_router.pdf", "# Title"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_over_limit_is_payload_too_large() {
    let state = AppState::new();
    for size in [1_100_000, 3_000_000] {
        let content = "a".repeat(size);
        let response = create_router(state.clone())
            .oneshot(multipart_upload("big.md", &content))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE, "size {size}");
    }
    assert_eq!(state.prd_count().await, 0);
}

#[tokio::test]
async fn test_markdown_download_headers() {
    let state = AppState::new();
    let id = create_prd(&state, "Ticket Router").await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/prds/{id}/markdown/download"))
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/markdown"));
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"PRD_Ticket_Router_"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let markdown = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(markdown.contains("Ticket Router"));
}

#[tokio::test]
async fn test_completion_and_answer() {
    let state = AppState::new();
    let id = create_prd(&state, "Ticket Router").await;

    let (status, before) = send(&state, "GET", &format!("/api/v1/prds/{id}/completion"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["is_complete"], false);

    let (status, answered) = send(
        &state,
        "POST",
        &format!("/api/v1/prds/{id}/answer"),
        Some(json!({
            "section": "problem_statement",
            "content": "Tickets sit unassigned for hours"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        answered["prd"]["problem_statement"],
        "Tickets sit unassigned for hours"
    );
    assert!(
        answered["completion_percentage"].as_u64().unwrap()
            > before["completion_percentage"].as_u64().unwrap()
    );

    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/v1/prds/{id}/answer"),
        Some(json!({ "section": "not_a_section", "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_roadmap_routes() {
    let state = AppState::new();
    create_prd(&state, "Ticket Router").await;

    let (status, overview) = send(&state, "GET", "/api/v1/prds/roadmap/overview", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["total_prds"], 1);

    let (status, categories) = send(&state, "GET", "/api/v1/roadmap/categories", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(categories
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c == "infrastructure"));

    let (status, matrix) = send(
        &state,
        "GET",
        "/api/v1/prds/roadmap/prioritization-matrix",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(matrix["high_value_low_complexity"].is_array());
}

#[tokio::test]
async fn test_agent_crud_and_health_without_url() {
    let state = AppState::new();
    let (status, agent) = send(
        &state,
        "POST",
        "/api/v1/agents",
        Some(json!({ "name": "Ticket Bot", "description": "Sorts tickets" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(agent["status"], "pending");
    let id = agent["id"].as_str().unwrap().to_string();

    let (status, health) = send(&state, "GET", &format!("/api/v1/agents/{id}/health"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["health_status"], "unknown");

    let (status, updated) = send(
        &state,
        "PUT",
        &format!("/api/v1/agents/{id}"),
        Some(json!({ "status": "deployed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "deployed");

    let (status, body) = send(&state, "DELETE", &format!("/api/v1/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Agent deleted successfully");

    let (status, _) = send(&state, "GET", &format!("/api/v1/agents/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_devin_flow_without_api_key() {
    let state = AppState::new();
    let prd_id = create_prd(&state, "Ticket Router").await;

    let (status, _) = send(
        &state,
        "POST",
        &format!("/api/v1/prds/{prd_id}/ready-for-devin"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, ready) = send(&state, "GET", "/api/v1/prds/ready-for-devin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["count"], 1);

    let (status, task) = send(
        &state,
        "POST",
        "/api/v1/devin/tasks",
        Some(json!({
            "prd_id": prd_id,
            "title": "Build Ticket Router",
            "description": "Implement the router"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "pending");
    let task_id = task["id"].as_str().unwrap().to_string();

    let (status, prompt) = send(
        &state,
        "GET",
        &format!("/api/v1/devin/tasks/{task_id}/prompt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(prompt["formatted_for_copy"]
        .as_str()
        .unwrap()
        .contains("COPY THIS TO DEVIN AI"));

    let (status, executed) = send(
        &state,
        "POST",
        &format!("/api/v1/devin/tasks/{task_id}/execute"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed["status"], "in_devin");
    assert!(executed["note"]
        .as_str()
        .unwrap()
        .contains("No Devin API key configured"));

    let (_, prd) = send(&state, "GET", &format!("/api/v1/prds/{prd_id}"), None).await;
    assert_eq!(prd["status"], "in_progress");

    let (status, completed) = send(
        &state,
        "PUT",
        &format!("/api/v1/devin/tasks/{task_id}/complete"),
        Some(json!({ "devin_output": "done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["task"]["status"], "completed");
    assert_eq!(completed["agent"]["name"], "Ticket Router");

    let (_, prd) = send(&state, "GET", &format!("/api/v1/prds/{prd_id}"), None).await;
    assert_eq!(prd["status"], "completed");
    assert!(prd["github_repo_url"]
        .as_str()
        .unwrap()
        .ends_with("/ai-agents-ticket-router"));

    let (_, agents) = send(&state, "GET", "/api/v1/agents", None).await;
    assert_eq!(agents["total"], 1);
}

#[tokio::test]
async fn test_execute_queued_prd_and_reexecute_conflict() {
    let state = AppState::new();
    let prd_id = create_prd(&state, "Ticket Router").await;
    let (_, task) = send(
        &state,
        "POST",
        "/api/v1/devin/tasks",
        Some(json!({
            "prd_id": prd_id,
            "title": "Build Ticket Router",
            "description": "Implement the router"
        })),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();
    let execute = format!("/api/v1/devin/tasks/{task_id}/execute");

    let (status, _) = send(&state, "POST", &execute, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, prd) = send(&state, "GET", &format!("/api/v1/prds/{prd_id}"), None).await;
    assert_eq!(prd["status"], "in_progress");

    let (status, body) = send(&state, "POST", &execute, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, cancelled) = send(
        &state,
        "POST",
        &format!("/api/v1/devin/tasks/{task_id}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    let (_, prd) = send(&state, "GET", &format!("/api/v1/prds/{prd_id}"), None).await;
    assert_eq!(prd["status"], "failed");
}

#[tokio::test]
async fn test_complete_task_for_long_prd_title() {
    let state = AppState::new();
    let title = "T".repeat(150);
    let prd_id = create_prd(&state, &title).await;
    let (_, task) = send(
        &state,
        "POST",
        "/api/v1/devin/tasks",
        Some(json!({ "prd_id": prd_id, "title": "Build", "description": "Implement" })),
    )
    .await;
    let task_id = task["id"].as_str().unwrap();

    let (status, completed) = send(
        &state,
        "PUT",
        &format!("/api/v1/devin/tasks/{task_id}/complete"),
        Some(json!({ "agent_code": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["task"]["status"], "completed");
    assert_eq!(completed["agent"]["name"], "T".repeat(100));
}

#[tokio::test]
async fn test_list_prds_with_huge_skip() {
    let state = AppState::new();
    create_prd(&state, "Ticket Router").await;
    let (status, body) = send(
        &state,
        "GET",
        &format!("/api/v1/prds?skip={}", usize::MAX),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["prds"].as_array().unwrap().len(), 0);
    assert_eq!(body["has_next"], false);
}

#[tokio::test]
async fn test_devin_task_for_missing_prd() {
    let state = AppState::new();
    let (status, _) = send(
        &state,
        "POST",
        "/api/v1/devin/tasks",
        Some(json!({ "prd_id": "missing", "title": "T", "description": "D" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mcp_bridge_routes() {
    let state = AppState::new();
    let (status, _) = send(
        &state,
        "POST",
        "/api/v1/mcp/load-prd",
        Some(json!({ "prd_id": "missing" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = create_prd(&state, "Ticket Router").await;
    let (status, loaded) = send(
        &state,
        "POST",
        "/api/v1/mcp/load-prd",
        Some(json!({ "prd_id": id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["success"], true);
    assert_eq!(loaded["data"]["cache_size"], 1);

    let (status, mcp) = send(&state, "GET", "/api/v1/mcp/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mcp["cache_size"], 1);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let state = AppState::new();
    create_prd(&state, "Ticket Router").await;

    let request = Request::builder()
        .method("GET")
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("factory_prds_total{status=\"queue\"} 1"));
}
