//! Wire types shared by the REST server and its client.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::Question;
use crate::pagination::Page;
use crate::roadmap::RoadmapEntry;
use crate::{
    Agent, AgentHealthStatus, AgentId, DevinTask, DevinTaskId, DevinTaskStatus, Prd, PrdId,
    PrdSection, PrdStatus,
};

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Plain acknowledgement, e.g. for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

macro_rules! list_response {
    ($name:ident, $field:ident, $item:ty) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            pub $field: Vec<$item>,
            pub total: usize,
            pub page: usize,
            pub size: usize,
            pub has_next: bool,
        }

        impl From<Page<$item>> for $name {
            fn from(page: Page<$item>) -> Self {
                Self {
                    $field: page.items,
                    total: page.total,
                    page: page.page,
                    size: page.size,
                    has_next: page.has_next,
                }
            }
        }
    };
}

list_response!(PrdListResponse, prds, Prd);
list_response!(AgentListResponse, agents, Agent);
list_response!(DevinTaskListResponse, tasks, DevinTask);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownResponse {
    pub prd_id: PrdId,
    pub markdown: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyPrdsResponse {
    pub message: String,
    pub count: usize,
    pub prds: Vec<Prd>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkReadyResponse {
    pub message: String,
    pub prd_id: PrdId,
    pub status: PrdStatus,
    pub prd: Prd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub prd_id: PrdId,
    pub completion_percentage: u8,
    pub missing_sections: Vec<PrdSection>,
    pub is_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidedQuestionsResponse {
    pub prd_id: PrdId,
    pub completion_percentage: u8,
    pub questions: Vec<Question>,
}

/// Answer for one PRD section. `section` accepts `problem_statement` or
/// `Problem Statement` spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub section: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub prd: Prd,
    pub completion_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapPrdsResponse {
    pub prds: Vec<RoadmapEntry>,
    pub total: usize,
}

/// Catalogs plus every PRD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapResponse {
    pub categories: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub prds: Vec<Prd>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHealthResponse {
    pub agent_id: AgentId,
    pub health_status: AgentHealthStatus,
    #[serde(default)]
    pub status_code: Option<u16>,
    pub checked_at: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub prompt: String,
    pub formatted_for_copy: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub message: String,
    pub task_id: DevinTaskId,
    pub status: DevinTaskStatus,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub session_url: Option<String>,
}

/// Result of completing a Devin task, with the agent registered from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteTaskResponse {
    pub task: DevinTask,
    #[serde(default)]
    pub agent: Option<Agent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPrdRequest {
    pub prd_id: PrdId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPrdData {
    pub prd_id: PrdId,
    pub prd_title: String,
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPrdResponse {
    pub success: bool,
    pub message: String,
    pub data: LoadPrdData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpStatusResponse {
    pub success: bool,
    pub message: String,
    pub url: String,
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    /// Which optional integrations are configured.
    pub services: BTreeMap<String, bool>,
}

/// Server configuration without secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub environment: String,
    pub devin_api_url: String,
    pub devin_api_configured: bool,
    pub github_org: String,
    pub mcp_server_url: String,
    pub persistence: Option<String>,
    pub cors_origins: Vec<String>,
}
