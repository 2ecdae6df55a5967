//! Registered agents produced from PRDs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{validate_agent_registration, validate_agent_update};
use crate::{AgentHealthStatus, AgentId, AgentStatus, CoreError, DevinTaskId, PrdId};

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Payload for registering an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_id: Option<PrdId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devin_task_id: Option<DevinTaskId>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub configuration: BTreeMap<String, Value>,
}

impl AgentRegistration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            purpose: String::new(),
            version: default_version(),
            tools: Vec::new(),
            prompts: Vec::new(),
            repository_url: None,
            deployment_url: None,
            health_check_url: None,
            prd_id: None,
            devin_task_id: None,
            capabilities: Vec::new(),
            configuration: BTreeMap::new(),
        }
    }
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub description: String,
    pub purpose: String,
    pub version: String,
    pub tools: Vec<String>,
    pub prompts: Vec<String>,
    pub status: AgentStatus,
    pub repository_url: Option<String>,
    pub deployment_url: Option<String>,
    pub health_check_url: Option<String>,
    pub prd_id: Option<PrdId>,
    pub devin_task_id: Option<DevinTaskId>,
    pub capabilities: Vec<String>,
    pub configuration: BTreeMap<String, Value>,
    pub last_health_check: Option<DateTime<Utc>>,
    pub health_status: AgentHealthStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    /// Validate a registration and create a `pending` agent from it.
    pub fn register(mut reg: AgentRegistration) -> Result<Self, CoreError> {
        validate_agent_registration(&mut reg)?;
        let now = Utc::now();
        Ok(Self {
            id: AgentId::generate(),
            name: reg.name,
            description: reg.description,
            purpose: reg.purpose,
            version: reg.version,
            tools: reg.tools,
            prompts: reg.prompts,
            status: AgentStatus::Pending,
            repository_url: reg.repository_url,
            deployment_url: reg.deployment_url,
            health_check_url: reg.health_check_url,
            prd_id: reg.prd_id,
            devin_task_id: reg.devin_task_id,
            capabilities: reg.capabilities,
            configuration: reg.configuration,
            last_health_check: None,
            health_status: AgentHealthStatus::Unknown,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update after validating it.
    pub fn apply_update(&mut self, mut update: AgentUpdate) -> Result<(), CoreError> {
        validate_agent_update(&mut update)?;

        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(version) = update.version {
            self.version = version;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(url) = update.repository_url {
            self.repository_url = Some(url);
        }
        if let Some(url) = update.deployment_url {
            self.deployment_url = Some(url);
        }
        if let Some(url) = update.health_check_url {
            self.health_check_url = Some(url);
        }
        if let Some(capabilities) = update.capabilities {
            self.capabilities = capabilities;
        }
        if let Some(configuration) = update.configuration {
            self.configuration = configuration;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record the outcome of a health probe.
    pub fn record_health(&mut self, status: AgentHealthStatus) {
        let now = Utc::now();
        self.health_status = status;
        self.last_health_check = Some(now);
        self.updated_at = now;
    }
}

/// Partial update payload for an agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<BTreeMap<String, Value>>,
}
