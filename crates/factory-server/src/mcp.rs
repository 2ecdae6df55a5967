//! MCP (Model Context Protocol) server implementation.
//!
//! Provides MCP tools that hand PRDs to coding assistants:
//! - `list_available_prds` - List stored PRDs, optionally by status
//! - `get_prd_details` - Full PRD, from the MCP cache or the store
//! - `load_prd_data` - Load a PRD into the MCP cache
//! - `check_available_prds` - Summaries of cached PRDs
//! - `determine_repository_strategy` - Where agent code for a PRD type lives
//! - `create_agent_from_prd` - Register an agent for a PRD
//! - `update_agent_status` - Update an agent's status and URLs

use std::sync::Arc;

use axum::Router;
use rmcp::{
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use factory_core::devin::StrategyDescription;
use factory_core::{
    Agent, AgentId, AgentStatus, AgentUpdate, Prd, PrdId, PrdType, RepositoryStrategy,
};

use crate::service::mcp_bridge::{CachedPrdSummary, PrdSource};
use crate::service::{AgentService, ListParams, McpBridge, PrdService, ServiceError};
use crate::state::AppState;

/// MCP server for agent factory operations.
#[derive(Clone)]
pub struct FactoryMcpServer {
    state: Arc<AppState>,
    tool_router: rmcp::handler::server::router::tool::ToolRouter<Self>,
}

// ============================================================================
// Tool Parameter Types
// ============================================================================

/// Parameters for list_available_prds tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListPrdsParams {
    /// Optional status filter, e.g. `ready_for_devin`.
    #[serde(default)]
    pub status: Option<String>,
}

/// Parameters for tools that take a single PRD id.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PrdIdParams {
    /// The ID of the PRD.
    pub prd_id: String,
}

/// Parameters for determine_repository_strategy tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RepositoryStrategyParams {
    /// PRD type: `platform` or `agent` (default).
    #[serde(default)]
    pub prd_type: Option<String>,
}

/// Parameters for create_agent_from_prd tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateAgentParams {
    /// The ID of the PRD to build the agent from.
    pub prd_id: String,

    /// Name for the new agent.
    pub agent_name: String,

    /// Description of the agent.
    pub agent_description: String,

    /// Repository name for agent PRDs (optional).
    #[serde(default)]
    pub repository_name: Option<String>,
}

/// Parameters for update_agent_status tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UpdateAgentStatusParams {
    /// The ID of the agent to update.
    pub agent_id: String,

    /// New status: pending, deployed, running, stopped, failed or maintenance.
    pub status: String,

    /// GitHub repository URL (optional).
    #[serde(default)]
    pub repository_url: Option<String>,

    /// Deployment URL (optional).
    #[serde(default)]
    pub deployment_url: Option<String>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Result of list_available_prds.
#[derive(Debug, Serialize)]
pub struct PrdListResult {
    pub prds: Vec<Prd>,
    pub total: usize,
    pub message: String,
}

/// Result of get_prd_details.
#[derive(Debug, Serialize)]
pub struct PrdDetailsResult {
    pub prd: Prd,
    pub source: PrdSource,
    pub message: String,
}

/// Result of check_available_prds.
#[derive(Debug, Serialize)]
pub struct CachedPrdsResult {
    pub available_prds: Vec<CachedPrdSummary>,
    pub cache_size: usize,
    pub message: String,
}

/// Result of create_agent_from_prd.
#[derive(Debug, Serialize)]
pub struct CreateAgentResult {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub repository_strategy: RepositoryStrategy,
    pub repository_url: String,
    pub message: String,
}

/// Result of update_agent_status.
#[derive(Debug, Serialize)]
pub struct UpdateAgentResult {
    pub agent: Agent,
    pub message: String,
}

fn json_result<T: Serialize>(value: &T) -> CallToolResult {
    let response = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    CallToolResult::success(vec![Content::text(response)])
}

fn error_result(err: impl std::fmt::Display) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl FactoryMcpServer {
    /// Create a new MCP server with the given AppState.
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    /// List stored PRDs.
    #[tool(description = "List all PRDs available for agent creation. Optionally filter by status (e.g. ready_for_devin).")]
    async fn list_available_prds(
        &self,
        Parameters(params): Parameters<ListPrdsParams>,
    ) -> Result<CallToolResult, McpError> {
        let list = ListParams {
            status: params.status,
            limit: Some(factory_core::pagination::MAX_LIMIT),
            ..Default::default()
        };
        let page = match PrdService::new(self.state.clone()).list(&list).await {
            Ok(page) => page,
            Err(e) => return Ok(error_result(e)),
        };

        info!(prd_count = page.items.len(), "Listed PRDs via MCP");
        Ok(json_result(&PrdListResult {
            message: format!("Found {} PRDs", page.items.len()),
            total: page.total,
            prds: page.items,
        }))
    }

    /// Get one PRD, cache first.
    #[tool(description = "Get detailed information about a specific PRD by ID. Checks the MCP cache first, then the PRD store.")]
    async fn get_prd_details(
        &self,
        Parameters(params): Parameters<PrdIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = PrdId::new(params.prd_id);
        match McpBridge::new(self.state.clone()).prd_details(&id).await {
            Ok((prd, source)) => Ok(json_result(&PrdDetailsResult {
                message: format!("Retrieved PRD: {}", prd.fields.title),
                prd,
                source,
            })),
            Err(e) => Ok(error_result(e)),
        }
    }

    /// Load a PRD into the cache.
    #[tool(description = "Load PRD data from the AI Agent Factory into the MCP cache.")]
    async fn load_prd_data(
        &self,
        Parameters(params): Parameters<PrdIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = PrdId::new(params.prd_id);
        match McpBridge::new(self.state.clone()).load_prd(&id).await {
            Ok(data) => Ok(json_result(&crate::http::responses::load_prd_response(data))),
            Err(e) => Ok(error_result(e)),
        }
    }

    /// Summaries of cached PRDs.
    #[tool(description = "Check which PRDs are loaded in the MCP cache and available for processing.")]
    async fn check_available_prds(&self) -> Result<CallToolResult, McpError> {
        let available_prds = McpBridge::new(self.state.clone()).cached().await;
        let message = if available_prds.is_empty() {
            "No PRDs are currently loaded in the MCP cache. Load a PRD from the AI Agent Factory first."
                .to_string()
        } else {
            format!(
                "Found {} PRD(s) available for processing",
                available_prds.len()
            )
        };
        Ok(json_result(&CachedPrdsResult {
            cache_size: available_prds.len(),
            available_prds,
            message,
        }))
    }

    /// Repository strategy for a PRD type.
    #[tool(description = "Determine the repository strategy for a PRD type: platform PRDs use the main repository, agent PRDs get separate repositories.")]
    async fn determine_repository_strategy(
        &self,
        Parameters(params): Parameters<RepositoryStrategyParams>,
    ) -> Result<CallToolResult, McpError> {
        let prd_type: PrdType = match ListParams::parse(&params.prd_type) {
            Ok(prd_type) => prd_type.unwrap_or_default(),
            Err(e) => return Ok(error_result(e)),
        };
        let description: StrategyDescription = self.state.github.describe(prd_type);
        Ok(json_result(&description))
    }

    /// Register an agent for a PRD.
    #[tool(description = "Create a new AI agent record from a PRD. The repository URL follows the PRD type's repository strategy.")]
    async fn create_agent_from_prd(
        &self,
        Parameters(params): Parameters<CreateAgentParams>,
    ) -> Result<CallToolResult, McpError> {
        let id = PrdId::new(params.prd_id);
        let result = AgentService::new(self.state.clone())
            .create_from_prd(
                &id,
                &params.agent_name,
                &params.agent_description,
                params.repository_name.as_deref(),
            )
            .await;
        match result {
            Ok((agent, target)) => Ok(json_result(&CreateAgentResult {
                message: format!(
                    "Agent created successfully with {} strategy",
                    target.repository_strategy.as_str()
                ),
                agent_id: agent.id,
                agent_name: agent.name,
                repository_strategy: target.repository_strategy,
                repository_url: target.repository_url,
            })),
            Err(e) => Ok(error_result(e)),
        }
    }

    /// Update an agent's status and URLs.
    #[tool(description = "Update the status of an agent (e.g. mark it deployed) and optionally its repository and deployment URLs.")]
    async fn update_agent_status(
        &self,
        Parameters(params): Parameters<UpdateAgentStatusParams>,
    ) -> Result<CallToolResult, McpError> {
        let status: AgentStatus = match params.status.parse() {
            Ok(status) => status,
            Err(e) => return Ok(error_result(ServiceError::Core(e))),
        };
        let update = AgentUpdate {
            status: Some(status),
            repository_url: params.repository_url,
            deployment_url: params.deployment_url,
            ..Default::default()
        };
        match AgentService::new(self.state.clone())
            .update(&AgentId::new(params.agent_id), update)
            .await
        {
            Ok(agent) => Ok(json_result(&UpdateAgentResult {
                message: format!("Agent status updated to '{status}' successfully"),
                agent,
            })),
            Err(e) => Ok(error_result(e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for FactoryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: rmcp::model::Implementation {
                name: "agent-factory".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                website_url: None,
                icons: None,
            },
            instructions: Some(
                "AI Agent Factory MCP Server - PRDs for agent creation. \
                 Use list_available_prds or check_available_prds to find work, get_prd_details \
                 to read a PRD, create_agent_from_prd to register the agent, and \
                 update_agent_status once it is deployed."
                    .to_string(),
            ),
        }
    }
}

// ============================================================================
// HTTP Server Setup
// ============================================================================

/// Create an axum Router for the MCP HTTP server.
///
/// The MCP server is mounted at `/mcp` and uses Streamable HTTP transport.
pub fn create_mcp_router(state: Arc<AppState>, ct: CancellationToken) -> Router {
    let state_clone = state.clone();
    let service = StreamableHttpService::new(
        move || Ok(FactoryMcpServer::new(state_clone.clone())),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig {
            cancellation_token: ct,
            ..Default::default()
        },
    );

    info!("MCP server initialized with Streamable HTTP transport");

    Router::new().nest_service("/mcp", service)
}
