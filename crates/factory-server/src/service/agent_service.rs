//! Agent registry operations.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use factory_core::api::AgentHealthResponse;
use factory_core::validation::MAX_CAPABILITY_CHARS;
use factory_core::{
    Agent, AgentHealthStatus, AgentId, AgentRegistration, AgentStatus, AgentUpdate, CoreError,
    DevinTaskId, GithubLayout, Page, Prd, RepositoryTarget,
};

use crate::service::{ListParams, ServiceResult};
use crate::state::AppState;

/// Number of PRD requirements copied into an agent's capabilities.
const CAPABILITIES_FROM_REQUIREMENTS: usize = 5;

/// Registration for an agent generated from a PRD, plus where its code lives.
pub(crate) fn registration_from_prd(
    github: &GithubLayout,
    environment: &str,
    prd: &Prd,
    name: &str,
    description: &str,
    repository_name: Option<&str>,
    devin_task_id: Option<DevinTaskId>,
) -> (AgentRegistration, RepositoryTarget) {
    let target = github.resolve(prd.fields.prd_type, name, repository_name);

    let mut reg = AgentRegistration::new(name, description);
    reg.purpose = format!("AI agent created from PRD: {}", prd.fields.title);
    reg.repository_url = Some(target.repository_url.clone());
    reg.prd_id = Some(prd.id.clone());
    reg.devin_task_id = devin_task_id;
    reg.capabilities = prd
        .fields
        .requirements
        .iter()
        .take(CAPABILITIES_FROM_REQUIREMENTS)
        .map(|r| r.chars().take(MAX_CAPABILITY_CHARS).collect())
        .collect();
    reg.configuration = BTreeMap::from([
        (
            "environment".to_string(),
            Value::String(environment.to_string()),
        ),
        (
            "repository_strategy".to_string(),
            Value::String(target.repository_strategy.as_str().to_string()),
        ),
        (
            "repository_name".to_string(),
            Value::String(target.repository_name.clone()),
        ),
        (
            "prd_type".to_string(),
            Value::String(prd.fields.prd_type.to_string()),
        ),
    ]);
    (reg, target)
}

/// Agent operations.
pub struct AgentService {
    state: Arc<AppState>,
}

impl AgentService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Page<Agent>> {
        let pagination = params.pagination()?;
        let status: Option<AgentStatus> = ListParams::parse(&params.status)?;
        let prd_id = params.prd_id_filter();

        let mut agents: Vec<Agent> = self
            .state
            .agents
            .read()
            .await
            .values()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .filter(|a| {
                prd_id.map_or(true, |id| a.prd_id.as_ref().is_some_and(|p| p.as_str() == id))
            })
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pagination.apply(agents))
    }

    pub async fn register(&self, reg: AgentRegistration) -> ServiceResult<Agent> {
        let agent = Agent::register(reg)?;
        self.state
            .agents
            .write()
            .await
            .insert(agent.id.clone(), agent.clone());
        self.state.persist().await;

        info!(agent_id = %agent.id, name = %agent.name, "Agent registered");
        Ok(agent)
    }

    pub async fn get(&self, id: &AgentId) -> ServiceResult<Agent> {
        self.state
            .agents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::AgentNotFound(id.to_string()).into())
    }

    pub async fn update(&self, id: &AgentId, update: AgentUpdate) -> ServiceResult<Agent> {
        let agent = {
            let mut agents = self.state.agents.write().await;
            let agent = agents
                .get_mut(id)
                .ok_or_else(|| CoreError::AgentNotFound(id.to_string()))?;
            agent.apply_update(update)?;
            agent.clone()
        };
        self.state.persist().await;

        info!(agent_id = %id, status = %agent.status, "Agent updated");
        Ok(agent)
    }

    pub async fn delete(&self, id: &AgentId) -> ServiceResult<()> {
        if self.state.agents.write().await.remove(id).is_none() {
            return Err(CoreError::AgentNotFound(id.to_string()).into());
        }
        self.state.persist().await;

        info!(agent_id = %id, "Agent deleted");
        Ok(())
    }

    /// Probe the agent's health endpoint and record the result.
    pub async fn check_health(&self, id: &AgentId) -> ServiceResult<AgentHealthResponse> {
        let agent = self.get(id).await?;

        let (health_status, status_code, message) = match &agent.health_check_url {
            None => (
                AgentHealthStatus::Unknown,
                None,
                "No health check URL configured".to_string(),
            ),
            Some(url) => {
                let result = self
                    .state
                    .http
                    .get(url)
                    .timeout(self.state.config.health_check_timeout())
                    .send()
                    .await;
                match result {
                    Ok(response) => {
                        let code = response.status().as_u16();
                        let status = AgentHealthStatus::from_http_status(code);
                        (status, Some(code), format!("Health endpoint returned {code}"))
                    }
                    Err(e) => {
                        warn!(agent_id = %id, url = %url, error = %e, "Agent health check failed");
                        (
                            AgentHealthStatus::Unhealthy,
                            None,
                            format!("Health check request failed: {e}"),
                        )
                    }
                }
            }
        };

        let checked_at = {
            let mut agents = self.state.agents.write().await;
            let agent = agents
                .get_mut(id)
                .ok_or_else(|| CoreError::AgentNotFound(id.to_string()))?;
            agent.record_health(health_status);
            agent.last_health_check.unwrap_or_else(Utc::now)
        };
        self.state.persist().await;

        info!(agent_id = %id, health_status = %health_status, "Agent health checked");
        Ok(AgentHealthResponse {
            agent_id: id.clone(),
            health_status,
            status_code,
            checked_at,
            message,
        })
    }

    /// Register an agent for a stored PRD and point the PRD at its repository.
    pub async fn create_from_prd(
        &self,
        prd_id: &factory_core::PrdId,
        name: &str,
        description: &str,
        repository_name: Option<&str>,
    ) -> ServiceResult<(Agent, RepositoryTarget)> {
        let (agent, target) = {
            let mut prds = self.state.prds.write().await;
            let prd = prds
                .get_mut(prd_id)
                .ok_or_else(|| CoreError::PrdNotFound(prd_id.to_string()))?;
            let (reg, target) = registration_from_prd(
                &self.state.github,
                &self.state.config.environment,
                prd,
                name,
                description,
                repository_name,
                None,
            );
            let agent = Agent::register(reg)?;

            prd.github_repo_url = Some(target.repository_url.clone());
            prd.updated_at = Utc::now();
            self.state
                .agents
                .write()
                .await
                .insert(agent.id.clone(), agent.clone());
            (agent, target)
        };
        self.state.persist().await;

        info!(
            agent_id = %agent.id,
            prd_id = %prd_id,
            strategy = target.repository_strategy.as_str(),
            "Agent created from PRD"
        );
        Ok((agent, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceError;
    use factory_core::{PrdFields, PrdType, RepositoryStrategy};

    async fn seed_prd(state: &Arc<AppState>, prd_type: PrdType) -> Prd {
        let prd = Prd::new(
            PrdFields::new("Ticket Bot", "Sorts tickets")
                .with_type(prd_type)
                .with_requirements(["a", "b", "c", "d", "e", "f"]),
        )
        .unwrap();
        state.prds.write().await.insert(prd.id.clone(), prd.clone());
        prd
    }

    #[test]
    fn test_registration_from_prd() {
        let prd = Prd::new(
            PrdFields::new("Ticket Bot", "Sorts tickets")
                .with_requirements(["a", "b", "c", "d", "e", "f"]),
        )
        .unwrap();
        let (reg, target) = registration_from_prd(
            &GithubLayout::default(),
            "production",
            &prd,
            "Ticket Bot",
            "Sorts tickets",
            None,
            Some(DevinTaskId::new("task-1")),
        );
        assert_eq!(reg.capabilities, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(reg.purpose, "AI agent created from PRD: Ticket Bot");
        assert_eq!(target.repository_strategy, RepositoryStrategy::SeparateRepository);
        assert_eq!(
            reg.repository_url.as_deref(),
            Some("https://github.com/thedoctorJJ/ai-agents-ticket-bot")
        );
        assert_eq!(reg.configuration["environment"], "production");
        assert_eq!(reg.devin_task_id, Some(DevinTaskId::new("task-1")));
    }

    #[tokio::test]
    async fn test_register_list_update_delete() {
        let state = AppState::new();
        let svc = AgentService::new(state);

        let agent = svc
            .register(AgentRegistration::new("Ticket Bot", "Sorts tickets"))
            .await
            .unwrap();
        let page = svc.list(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let updated = svc
            .update(
                &agent.id,
                AgentUpdate {
                    status: Some(AgentStatus::Deployed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.status, AgentStatus::Deployed);

        let page = svc
            .list(&ListParams {
                status: Some("pending".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        svc.delete(&agent.id).await.unwrap();
        let err = svc.get(&agent.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::AgentNotFound(_))));
    }

    #[tokio::test]
    async fn test_health_without_url_is_unknown() {
        let svc = AgentService::new(AppState::new());
        let agent = svc
            .register(AgentRegistration::new("Ticket Bot", "Sorts tickets"))
            .await
            .unwrap();
        let health = svc.check_health(&agent.id).await.unwrap();
        assert_eq!(health.health_status, AgentHealthStatus::Unknown);
        assert!(svc.get(&agent.id).await.unwrap().last_health_check.is_some());
    }

    #[tokio::test]
    async fn test_health_unreachable_is_unhealthy() {
        let svc = AgentService::new(AppState::new());
        // Bind and drop a listener to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut reg = AgentRegistration::new("Ticket Bot", "Sorts tickets");
        reg.health_check_url = Some(format!("http://127.0.0.1:{port}/health"));
        let agent = svc.register(reg).await.unwrap();

        let health = svc.check_health(&agent.id).await.unwrap();
        assert_eq!(health.health_status, AgentHealthStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_create_from_platform_prd() {
        let state = AppState::new();
        let prd = seed_prd(&state, PrdType::Platform).await;
        let svc = AgentService::new(state.clone());

        let (agent, target) = svc
            .create_from_prd(&prd.id, "Ops Agent", "Watches deploys", None)
            .await
            .unwrap();
        assert_eq!(target.repository_strategy, RepositoryStrategy::MainRepository);
        assert_eq!(
            target.repository_url,
            "https://github.com/thedoctorJJ/ai-agent-factory/tree/main/agents/ops-agent"
        );
        assert_eq!(agent.prd_id.as_ref(), Some(&prd.id));
        assert_eq!(
            state.prds.read().await[&prd.id].github_repo_url.as_deref(),
            Some(target.repository_url.as_str())
        );
    }

    #[tokio::test]
    async fn test_create_from_missing_prd() {
        let svc = AgentService::new(AppState::new());
        let err = svc
            .create_from_prd(&factory_core::PrdId::new("nope"), "A", "B", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::PrdNotFound(_))));
    }
}
