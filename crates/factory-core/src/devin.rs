//! Devin AI tasks: the hand-off unit between a PRD and the coding service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::render::slugify;
use crate::{CoreError, DevinTaskId, DevinTaskStatus, PrdId, PrdType};

/// Payload for creating a Devin task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevinTaskCreate {
    pub prd_id: PrdId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
}

/// How the agent produced by a completed task gets registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMethod {
    /// Register the agent automatically from the PRD.
    #[default]
    McpAutomatic,
    Manual,
    Api,
}

/// Payload for completing a Devin task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevinTaskComplete {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devin_output: Option<String>,
    #[serde(default)]
    pub deployment_method: DeploymentMethod,
    /// Set when Devin failed; the task and its PRD become `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// A Devin task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevinTask {
    pub id: DevinTaskId,
    pub prd_id: PrdId,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub devin_prompt: String,
    pub status: DevinTaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub devin_output: Option<String>,
    #[serde(default)]
    pub agent_code: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub session_url: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DevinTask {
    /// Create a `pending` task and generate its prompt.
    pub fn new(create: DevinTaskCreate) -> Result<Self, CoreError> {
        let title = create.title.trim().to_string();
        let description = create.description.trim().to_string();
        if title.is_empty() {
            return Err(CoreError::invalid("Task title cannot be empty"));
        }
        if title.chars().count() > 200 {
            return Err(CoreError::invalid("Task title too long (max 200 characters)"));
        }
        if description.is_empty() {
            return Err(CoreError::invalid("Task description cannot be empty"));
        }
        let requirements: Vec<String> = create
            .requirements
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();

        let id = DevinTaskId::generate();
        let devin_prompt = generate_prompt(&id, &create.prd_id, &title, &description, &requirements);
        let now = Utc::now();

        Ok(Self {
            id,
            prd_id: create.prd_id,
            title,
            description,
            requirements,
            devin_prompt,
            status: DevinTaskStatus::Pending,
            created_at: now,
            updated_at: now,
            devin_output: None,
            agent_code: None,
            session_id: None,
            session_url: None,
            error_message: None,
        })
    }

    fn invalid_transition(&self, to: DevinTaskStatus) -> CoreError {
        CoreError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Mark the task as handed to Devin. Only pending tasks can be executed.
    pub fn mark_in_devin(&mut self) -> Result<(), CoreError> {
        if self.status != DevinTaskStatus::Pending {
            return Err(self.invalid_transition(DevinTaskStatus::InDevin));
        }
        self.status = DevinTaskStatus::InDevin;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the Devin session created for this task.
    pub fn attach_session(&mut self, session_id: String, session_url: Option<String>) {
        self.session_id = Some(session_id);
        self.session_url = session_url;
        self.updated_at = Utc::now();
    }

    /// Finish the task. Returns the resulting status.
    pub fn complete(&mut self, completion: &DevinTaskComplete) -> Result<DevinTaskStatus, CoreError> {
        let next = if completion.error_message.is_some() {
            DevinTaskStatus::Failed
        } else {
            DevinTaskStatus::Completed
        };
        if self.status.is_terminal() {
            return Err(self.invalid_transition(next));
        }
        self.status = next;
        self.devin_output = completion.devin_output.clone();
        self.agent_code = completion.agent_code.clone();
        self.error_message = completion.error_message.clone();
        self.updated_at = Utc::now();
        Ok(next)
    }

    /// Cancel a task that has not finished yet.
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.status.is_terminal() {
            return Err(self.invalid_transition(DevinTaskStatus::Cancelled));
        }
        self.status = DevinTaskStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Build the instruction prompt handed to Devin AI.
pub fn generate_prompt(
    task_id: &DevinTaskId,
    prd_id: &PrdId,
    title: &str,
    description: &str,
    requirements: &[String],
) -> String {
    let requirement_lines = requirements
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Devin AI Task: {title}

## Task ID: {task_id}
## PRD ID: {prd_id}

## Objective
Create a fully functional AI agent based on the following requirements:

## Description
{description}

## Requirements
{requirement_lines}

## Implementation Instructions

### 1. Agent Architecture
- Create a modular, scalable agent architecture
- Implement proper error handling and logging
- Include health check endpoints

### 2. Core Functionality
- Implement the main agent logic based on requirements
- Add input validation and sanitization
- Implement logging and monitoring

### 3. API Endpoints
- Create RESTful API endpoints with proper HTTP status codes
- Add request/response validation

### 4. Deployment
- Create a Dockerfile for containerization
- Configure environment variables
- Implement health checks

### 5. Testing
- Add unit tests for core functionality
- Include integration and API endpoint tests

### 6. Documentation
- Create a README with setup and deployment instructions
- Document API endpoints and include usage examples

## Deliverables
1. Complete agent codebase
2. Dockerfile for deployment
3. Comprehensive tests
4. Documentation
5. Deployment configuration

## Success Criteria
- Agent is fully functional and deployed
- All requirements are implemented
- Tests pass with good coverage
- Documentation is complete

Please create this agent and provide the complete codebase ready for deployment."
    )
}

/// Wrap a prompt in copy markers for manual pasting into Devin.
pub fn format_for_copy(prompt: &str) -> String {
    format!("\n--- COPY THIS TO DEVIN AI ---\n\n{prompt}\n\n--- END COPY ---\n")
}

/// Where the code for a new agent lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryStrategy {
    /// Platform PRDs: a folder under `agents/` in the main repository.
    MainRepository,
    /// Agent PRDs: a dedicated `ai-agents-<name>` repository.
    SeparateRepository,
}

impl RepositoryStrategy {
    pub fn for_prd_type(prd_type: PrdType) -> Self {
        match prd_type {
            PrdType::Platform => Self::MainRepository,
            PrdType::Agent => Self::SeparateRepository,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainRepository => "main_repository",
            Self::SeparateRepository => "separate_repository",
        }
    }
}

/// A resolved repository location for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTarget {
    pub repository_strategy: RepositoryStrategy,
    pub repository_name: String,
    pub repository_url: String,
}

/// Human readable description of a strategy, with `{agent_name}` templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescription {
    pub prd_type: PrdType,
    pub repository_strategy: RepositoryStrategy,
    pub repository_url_template: String,
    pub instructions: String,
    pub message: String,
}

/// GitHub coordinates used to derive repository URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubLayout {
    /// Owner URL, e.g. `https://github.com/thedoctorJJ`.
    pub owner_url: String,
    /// Name of the main platform repository.
    pub main_repository: String,
}

impl Default for GithubLayout {
    fn default() -> Self {
        Self::new("thedoctorJJ")
    }
}

impl GithubLayout {
    pub fn new(owner: &str) -> Self {
        Self {
            owner_url: format!("https://github.com/{}", owner.trim_matches('/')),
            main_repository: "ai-agent-factory".to_string(),
        }
    }

    /// Resolve where an agent named `agent_name` should live.
    pub fn resolve(
        &self,
        prd_type: PrdType,
        agent_name: &str,
        repository_name: Option<&str>,
    ) -> RepositoryTarget {
        let slug = slugify(agent_name);
        match RepositoryStrategy::for_prd_type(prd_type) {
            RepositoryStrategy::MainRepository => RepositoryTarget {
                repository_strategy: RepositoryStrategy::MainRepository,
                repository_name: self.main_repository.clone(),
                repository_url: format!(
                    "{}/{}/tree/main/agents/{}",
                    self.owner_url, self.main_repository, slug
                ),
            },
            RepositoryStrategy::SeparateRepository => {
                let name = repository_name
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .unwrap_or_else(|| format!("ai-agents-{slug}"));
                RepositoryTarget {
                    repository_strategy: RepositoryStrategy::SeparateRepository,
                    repository_url: format!("{}/{}", self.owner_url, name),
                    repository_name: name,
                }
            }
        }
    }

    pub fn describe(&self, prd_type: PrdType) -> StrategyDescription {
        let repository_strategy = RepositoryStrategy::for_prd_type(prd_type);
        let (template, instructions, message) = match repository_strategy {
            RepositoryStrategy::MainRepository => (
                format!(
                    "{}/{}/tree/main/agents/{{agent_name}}",
                    self.owner_url, self.main_repository
                ),
                "Add agent code to the main repository in /agents/{agent_name}/ folder",
                "Platform PRDs use the main repository structure",
            ),
            RepositoryStrategy::SeparateRepository => (
                format!("{}/ai-agents-{{agent_name}}", self.owner_url),
                "Create a separate GitHub repository with naming pattern: ai-agents-{agent_name}",
                "Agent PRDs use separate repositories",
            ),
        };
        StrategyDescription {
            prd_type,
            repository_strategy,
            repository_url_template: template,
            instructions: instructions.to_string(),
            message: message.to_string(),
        }
    }
}
