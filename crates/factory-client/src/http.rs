//! HTTP client for the REST endpoints.

use reqwest::{multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use factory_core::api::{
    AgentHealthResponse, AgentListResponse, AnswerRequest, AnswerResponse, CompleteTaskResponse,
    CompletionResponse, ConfigResponse, DevinTaskListResponse, ErrorResponse, ExecuteResponse,
    GuidedQuestionsResponse, HealthResponse, LoadPrdRequest, LoadPrdResponse, MarkReadyResponse,
    MarkdownResponse, MessageResponse, McpStatusResponse, PromptResponse, PrdListResponse,
    ReadyPrdsResponse, RoadmapPrdsResponse, RoadmapResponse,
};
use factory_core::roadmap::{PrioritizationMatrix, RoadmapOverview};
use factory_core::{
    Agent, AgentId, AgentRegistration, AgentUpdate, ChatReply, ChatRequest, DevinTask,
    DevinTaskComplete, DevinTaskCreate, DevinTaskId, Prd, PrdCreate, PrdId, PrdUpdate,
    RoadmapQuery,
};

use crate::error::ClientError;
use crate::query::ListQuery;

/// HTTP client for the factory API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client for a server at `base_url`, e.g.
    /// `http://127.0.0.1:8000`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client that reuses an existing reqwest client.
    pub fn with_client(inner: reqwest::Client, base_url: &str) -> Self {
        Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "request");
        self.inner.request(method, url)
    }

    /// Turn a non-success response into a [`ClientError`], preferring the
    /// server's `{"error": ...}` body.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|body| body.error)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    text
                }
            });
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }

    async fn text(request: RequestBuilder) -> Result<String, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.text().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::json(self.request(Method::GET, path)).await
    }

    async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        Self::json(self.request(Method::GET, path).query(query)).await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Self::json(self.request(method, path).json(body)).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        Self::json(self.request(Method::POST, path)).await
    }

    async fn delete(&self, path: &str) -> Result<MessageResponse, ClientError> {
        Self::json(self.request(Method::DELETE, path)).await
    }

    // ------------------------------------------------------------------
    // Service
    // ------------------------------------------------------------------

    /// Check if the server is alive.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.request(Method::GET, "/health").send().await?;
        Ok(response.status().is_success())
    }

    /// Detailed health with configured integrations.
    pub async fn api_health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/api/v1/health").await
    }

    pub async fn config(&self) -> Result<ConfigResponse, ClientError> {
        self.get("/api/v1/config").await
    }

    /// Prometheus metrics text.
    pub async fn metrics(&self) -> Result<String, ClientError> {
        Self::text(self.request(Method::GET, "/metrics")).await
    }

    // ------------------------------------------------------------------
    // PRDs
    // ------------------------------------------------------------------

    pub async fn list_prds(&self, query: &ListQuery) -> Result<PrdListResponse, ClientError> {
        self.get_query("/api/v1/prds", query).await
    }

    pub async fn create_prd(&self, prd: &PrdCreate) -> Result<Prd, ClientError> {
        self.send_json(Method::POST, "/api/v1/prds", prd).await
    }

    pub async fn get_prd(&self, id: &PrdId) -> Result<Prd, ClientError> {
        self.get(&format!("/api/v1/prds/{id}")).await
    }

    pub async fn update_prd(&self, id: &PrdId, update: &PrdUpdate) -> Result<Prd, ClientError> {
        self.send_json(Method::PUT, &format!("/api/v1/prds/{id}"), update)
            .await
    }

    pub async fn delete_prd(&self, id: &PrdId) -> Result<MessageResponse, ClientError> {
        self.delete(&format!("/api/v1/prds/{id}")).await
    }

    /// Upload a markdown or text file as a new PRD.
    pub async fn upload_prd(&self, filename: &str, content: Vec<u8>) -> Result<Prd, ClientError> {
        let part = multipart::Part::bytes(content)
            .file_name(filename.to_string())
            .mime_str("text/markdown")?;
        let form = multipart::Form::new().part("file", part);
        Self::json(
            self.request(Method::POST, "/api/v1/prds/upload")
                .multipart(form),
        )
        .await
    }

    pub async fn prd_markdown(&self, id: &PrdId) -> Result<MarkdownResponse, ClientError> {
        self.get(&format!("/api/v1/prds/{id}/markdown")).await
    }

    /// Raw markdown as served by the download endpoint.
    pub async fn download_markdown(&self, id: &PrdId) -> Result<String, ClientError> {
        Self::text(self.request(Method::GET, &format!("/api/v1/prds/{id}/markdown/download")))
            .await
    }

    pub async fn ready_for_devin(&self) -> Result<ReadyPrdsResponse, ClientError> {
        self.get("/api/v1/prds/ready-for-devin").await
    }

    pub async fn mark_ready_for_devin(&self, id: &PrdId) -> Result<MarkReadyResponse, ClientError> {
        self.post_empty(&format!("/api/v1/prds/{id}/ready-for-devin"))
            .await
    }

    pub async fn completion(&self, id: &PrdId) -> Result<CompletionResponse, ClientError> {
        self.get(&format!("/api/v1/prds/{id}/completion")).await
    }

    pub async fn guided_questions(
        &self,
        id: &PrdId,
    ) -> Result<GuidedQuestionsResponse, ClientError> {
        self.get(&format!("/api/v1/prds/{id}/guided-questions"))
            .await
    }

    /// Write `content` into `section` of a PRD.
    pub async fn answer(
        &self,
        id: &PrdId,
        section: &str,
        content: &str,
    ) -> Result<AnswerResponse, ClientError> {
        let body = AnswerRequest {
            section: section.to_string(),
            content: content.to_string(),
        };
        self.send_json(Method::POST, &format!("/api/v1/prds/{id}/answer"), &body)
            .await
    }

    pub async fn chat(&self, id: &PrdId, request: &ChatRequest) -> Result<ChatReply, ClientError> {
        self.send_json(Method::POST, &format!("/api/v1/prds/{id}/chat"), request)
            .await
    }

    // ------------------------------------------------------------------
    // Roadmap
    // ------------------------------------------------------------------

    pub async fn roadmap_overview(&self) -> Result<RoadmapOverview, ClientError> {
        self.get("/api/v1/prds/roadmap/overview").await
    }

    pub async fn roadmap_prds(&self, query: &RoadmapQuery) -> Result<RoadmapPrdsResponse, ClientError> {
        self.get_query("/api/v1/prds/roadmap/prds", query).await
    }

    pub async fn prioritization_matrix(&self) -> Result<PrioritizationMatrix, ClientError> {
        self.get("/api/v1/prds/roadmap/prioritization-matrix")
            .await
    }

    pub async fn roadmap(&self) -> Result<RoadmapResponse, ClientError> {
        self.get("/api/v1/roadmap").await
    }

    pub async fn roadmap_categories(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/roadmap/categories").await
    }

    pub async fn roadmap_statuses(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/roadmap/statuses").await
    }

    pub async fn roadmap_priorities(&self) -> Result<Vec<String>, ClientError> {
        self.get("/api/v1/roadmap/priorities").await
    }

    // ------------------------------------------------------------------
    // Agents
    // ------------------------------------------------------------------

    pub async fn list_agents(&self, query: &ListQuery) -> Result<AgentListResponse, ClientError> {
        self.get_query("/api/v1/agents", query).await
    }

    pub async fn register_agent(&self, reg: &AgentRegistration) -> Result<Agent, ClientError> {
        self.send_json(Method::POST, "/api/v1/agents", reg).await
    }

    pub async fn get_agent(&self, id: &AgentId) -> Result<Agent, ClientError> {
        self.get(&format!("/api/v1/agents/{id}")).await
    }

    pub async fn update_agent(&self, id: &AgentId, update: &AgentUpdate) -> Result<Agent, ClientError> {
        self.send_json(Method::PUT, &format!("/api/v1/agents/{id}"), update)
            .await
    }

    pub async fn delete_agent(&self, id: &AgentId) -> Result<MessageResponse, ClientError> {
        self.delete(&format!("/api/v1/agents/{id}")).await
    }

    /// Probe the agent's health URL through the server.
    pub async fn agent_health(&self, id: &AgentId) -> Result<AgentHealthResponse, ClientError> {
        self.get(&format!("/api/v1/agents/{id}/health")).await
    }

    // ------------------------------------------------------------------
    // Devin tasks
    // ------------------------------------------------------------------

    pub async fn list_tasks(&self, query: &ListQuery) -> Result<DevinTaskListResponse, ClientError> {
        self.get_query("/api/v1/devin/tasks", query).await
    }

    pub async fn create_task(&self, create: &DevinTaskCreate) -> Result<DevinTask, ClientError> {
        self.send_json(Method::POST, "/api/v1/devin/tasks", create)
            .await
    }

    pub async fn get_task(&self, id: &DevinTaskId) -> Result<DevinTask, ClientError> {
        self.get(&format!("/api/v1/devin/tasks/{id}")).await
    }

    pub async fn task_prompt(&self, id: &DevinTaskId) -> Result<PromptResponse, ClientError> {
        self.get(&format!("/api/v1/devin/tasks/{id}/prompt")).await
    }

    pub async fn execute_task(&self, id: &DevinTaskId) -> Result<ExecuteResponse, ClientError> {
        self.post_empty(&format!("/api/v1/devin/tasks/{id}/execute"))
            .await
    }

    pub async fn complete_task(
        &self,
        id: &DevinTaskId,
        completion: &DevinTaskComplete,
    ) -> Result<CompleteTaskResponse, ClientError> {
        self.send_json(
            Method::PUT,
            &format!("/api/v1/devin/tasks/{id}/complete"),
            completion,
        )
        .await
    }

    pub async fn cancel_task(&self, id: &DevinTaskId) -> Result<DevinTask, ClientError> {
        self.post_empty(&format!("/api/v1/devin/tasks/{id}/cancel"))
            .await
    }

    // ------------------------------------------------------------------
    // MCP bridge
    // ------------------------------------------------------------------

    /// Load a PRD into the server's MCP cache.
    pub async fn mcp_load_prd(&self, id: &PrdId) -> Result<LoadPrdResponse, ClientError> {
        let body = LoadPrdRequest { prd_id: id.clone() };
        self.send_json(Method::POST, "/api/v1/mcp/load-prd", &body)
            .await
    }

    pub async fn mcp_status(&self) -> Result<McpStatusResponse, ClientError> {
        self.get("/api/v1/mcp/status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_core::{DeploymentMethod, PrdFields, PrdStatus};
    use factory_server::{create_router, AppState};
    use tokio::net::TcpListener;

    async fn spawn_server() -> ApiClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_router(AppState::new());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(&format!("http://{addr}/"))
    }

    fn ticket_router() -> PrdCreate {
        PrdFields::new("Ticket Router", "Routes support tickets")
            .with_requirements(["Classify tickets", "Assign owners"])
    }

    #[test]
    fn test_base_url_trimmed() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_health() {
        let client = spawn_server().await;
        assert!(client.health().await.unwrap());
        let health = client.api_health().await.unwrap();
        assert_eq!(health.status, "healthy");
    }

    #[tokio::test]
    async fn test_prd_lifecycle() {
        let client = spawn_server().await;
        let prd = client.create_prd(&ticket_router()).await.unwrap();
        assert_eq!(prd.status, PrdStatus::Queue);

        let list = client
            .list_prds(&ListQuery::new().prd_status(PrdStatus::Queue))
            .await
            .unwrap();
        assert_eq!(list.total, 1);

        let ready = client.mark_ready_for_devin(&prd.id).await.unwrap();
        assert_eq!(ready.status, PrdStatus::ReadyForDevin);

        let markdown = client.download_markdown(&prd.id).await.unwrap();
        assert!(markdown.contains("Ticket Router"));

        client.delete_prd(&prd.id).await.unwrap();
        let err = client.get_prd(&prd.id).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref msg) if msg.contains("PRD not found")));
    }

    #[tokio::test]
    async fn test_api_error_carries_server_message() {
        let client = spawn_server().await;
        let prd = client.create_prd(&ticket_router()).await.unwrap();
        let err = client
            .update_prd(&prd.id, &PrdUpdate::status(PrdStatus::Completed))
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("Invalid state transition"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_upload() {
        let client = spawn_server().await;
        let content = b"# Ticket Router\n\n## Requirements\n- Classify\n".to_vec();
        let prd = client.upload_prd("router.md", content).await.unwrap();
        assert_eq!(prd.fields.title, "Ticket Router");
        assert_eq!(prd.fields.original_filename.as_deref(), Some("router.md"));

        let err = client.upload_prd("router.exe", b"x".to_vec()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_devin_pipeline() {
        let client = spawn_server().await;
        let prd = client.create_prd(&ticket_router()).await.unwrap();
        client.mark_ready_for_devin(&prd.id).await.unwrap();

        let task = client
            .create_task(&DevinTaskCreate {
                prd_id: prd.id.clone(),
                title: prd.fields.title.clone(),
                description: prd.fields.description.clone(),
                requirements: prd.fields.requirements.clone(),
            })
            .await
            .unwrap();
        let prompt = client.task_prompt(&task.id).await.unwrap();
        assert!(prompt.prompt.contains("Ticket Router"));

        client.execute_task(&task.id).await.unwrap();
        let tasks = client
            .list_tasks(&ListQuery::new().prd_id(&prd.id))
            .await
            .unwrap();
        assert_eq!(tasks.total, 1);

        let done = client
            .complete_task(
                &task.id,
                &DevinTaskComplete {
                    deployment_method: DeploymentMethod::McpAutomatic,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let agent = done.agent.unwrap();
        assert_eq!(agent.prd_id.as_ref(), Some(&prd.id));

        let health = client.agent_health(&agent.id).await.unwrap();
        assert_eq!(health.agent_id, agent.id);
    }

    #[tokio::test]
    async fn test_mcp_bridge() {
        let client = spawn_server().await;
        let prd = client.create_prd(&ticket_router()).await.unwrap();
        let loaded = client.mcp_load_prd(&prd.id).await.unwrap();
        assert!(loaded.success);
        assert_eq!(client.mcp_status().await.unwrap().cache_size, 1);
    }
}
