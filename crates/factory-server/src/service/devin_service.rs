//! Devin task pipeline: create, execute, complete, cancel.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use factory_core::api::{CompleteTaskResponse, ExecuteResponse, PromptResponse};
use factory_core::devin::format_for_copy;
use factory_core::validation::MAX_AGENT_NAME_CHARS;
use factory_core::{
    Agent, CoreError, DeploymentMethod, DevinTask, DevinTaskComplete, DevinTaskCreate,
    DevinTaskId, DevinTaskStatus, Page, Prd, PrdStatus,
};

use crate::service::agent_service::registration_from_prd;
use crate::service::{ListParams, ServiceResult};
use crate::state::AppState;

/// PRD statuses a task walks its PRD through when executed.
const EXECUTE_PATH: &[PrdStatus] = &[PrdStatus::ReadyForDevin, PrdStatus::InProgress];
const COMPLETE_PATH: &[PrdStatus] = &[
    PrdStatus::ReadyForDevin,
    PrdStatus::InProgress,
    PrdStatus::Completed,
];
const FAIL_PATH: &[PrdStatus] = &[
    PrdStatus::ReadyForDevin,
    PrdStatus::InProgress,
    PrdStatus::Failed,
];

/// Walk `prd` along `path`, skipping steps it is already past. The PRD must
/// end on the last step.
fn advance(prd: &mut Prd, path: &[PrdStatus]) -> Result<(), CoreError> {
    let Some(&target) = path.last() else {
        return Ok(());
    };
    let start = prd.status;
    for &step in path {
        if prd.status != step && prd.status.can_transition_to(step) {
            prd.transition(step)?;
        }
    }
    if prd.status != target {
        prd.status = start;
        return Err(CoreError::InvalidStateTransition {
            from: start.to_string(),
            to: target.to_string(),
        });
    }
    Ok(())
}

/// Marks a task as being executed until dropped.
struct ExecuteClaim<'a> {
    executing: &'a Mutex<HashSet<DevinTaskId>>,
    id: DevinTaskId,
}

impl<'a> ExecuteClaim<'a> {
    fn acquire(
        executing: &'a Mutex<HashSet<DevinTaskId>>,
        id: &DevinTaskId,
    ) -> Result<Self, CoreError> {
        let mut set = executing.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.clone()) {
            return Err(CoreError::TaskBusy(id.to_string()));
        }
        Ok(Self {
            executing,
            id: id.clone(),
        })
    }
}

impl Drop for ExecuteClaim<'_> {
    fn drop(&mut self) {
        self.executing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

/// Devin task operations.
pub struct DevinService {
    state: Arc<AppState>,
}

impl DevinService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list(&self, params: &ListParams) -> ServiceResult<Page<DevinTask>> {
        let pagination = params.pagination()?;
        let status: Option<DevinTaskStatus> = ListParams::parse(&params.status)?;
        let prd_id = params.prd_id_filter();

        let mut tasks: Vec<DevinTask> = self
            .state
            .devin_tasks
            .read()
            .await
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .filter(|t| prd_id.map_or(true, |id| t.prd_id.as_str() == id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pagination.apply(tasks))
    }

    pub async fn create(&self, create: DevinTaskCreate) -> ServiceResult<DevinTask> {
        if !self.state.prds.read().await.contains_key(&create.prd_id) {
            return Err(CoreError::PrdNotFound(create.prd_id.to_string()).into());
        }
        let task = DevinTask::new(create)?;
        self.state
            .devin_tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        self.state.persist().await;

        info!(task_id = %task.id, prd_id = %task.prd_id, "Devin task created");
        Ok(task)
    }

    pub async fn get(&self, id: &DevinTaskId) -> ServiceResult<DevinTask> {
        self.state
            .devin_tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::DevinTaskNotFound(id.to_string()).into())
    }

    pub async fn prompt(&self, id: &DevinTaskId) -> ServiceResult<PromptResponse> {
        let task = self.get(id).await?;
        Ok(PromptResponse {
            formatted_for_copy: format_for_copy(&task.devin_prompt),
            prompt: task.devin_prompt,
        })
    }

    /// Hand a pending task to Devin and move its PRD to `in_progress`.
    ///
    /// The Devin API is called without holding any lock; nothing changes if
    /// the call fails. Concurrent executes of one task are rejected before a
    /// second session is opened.
    pub async fn execute(&self, id: &DevinTaskId) -> ServiceResult<ExecuteResponse> {
        let _claim = ExecuteClaim::acquire(&self.state.executing, id)?;
        let prompt = {
            let prds = self.state.prds.read().await;
            let tasks = self.state.devin_tasks.read().await;
            let task = tasks
                .get(id)
                .ok_or_else(|| CoreError::DevinTaskNotFound(id.to_string()))?;
            task.clone().mark_in_devin()?;
            let prd = prds
                .get(&task.prd_id)
                .ok_or_else(|| CoreError::PrdNotFound(task.prd_id.to_string()))?;
            advance(&mut prd.clone(), EXECUTE_PATH)?;
            task.devin_prompt.clone()
        };

        let session = match &self.state.devin {
            Some(client) => Some(client.create_session(&prompt).await?),
            None => None,
        };

        let task = {
            let mut prds = self.state.prds.write().await;
            let mut tasks = self.state.devin_tasks.write().await;
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| CoreError::DevinTaskNotFound(id.to_string()))?;
            let prd = prds
                .get_mut(&task.prd_id)
                .ok_or_else(|| CoreError::PrdNotFound(task.prd_id.to_string()))?;

            let mut next_prd = prd.clone();
            advance(&mut next_prd, EXECUTE_PATH)?;
            task.mark_in_devin()?;
            *prd = next_prd;
            if let Some(session) = &session {
                task.attach_session(session.session_id.clone(), session.url.clone());
            }
            task.clone()
        };
        self.state.persist().await;

        info!(
            task_id = %id,
            prd_id = %task.prd_id,
            session_id = task.session_id.as_deref().unwrap_or("-"),
            "Devin task executed"
        );

        let note = match &task.session_url {
            Some(url) => format!("Devin AI is working on this task. Follow progress at {url}"),
            None if session.is_some() => "Devin AI is working on this task.".to_string(),
            None => format!(
                "No Devin API key configured. Copy the prompt from /api/v1/devin/tasks/{id}/prompt into Devin AI."
            ),
        };
        Ok(ExecuteResponse {
            message: "Task submitted to Devin AI successfully".to_string(),
            task_id: task.id,
            status: task.status,
            note: Some(note),
            session_url: task.session_url,
        })
    }

    /// Record Devin's result. A successful `mcp_automatic` completion also
    /// registers an agent from the PRD.
    pub async fn complete(
        &self,
        id: &DevinTaskId,
        completion: DevinTaskComplete,
    ) -> ServiceResult<CompleteTaskResponse> {
        let (task, agent) = {
            let mut prds = self.state.prds.write().await;
            let mut agents = self.state.agents.write().await;
            let mut tasks = self.state.devin_tasks.write().await;

            let task = tasks
                .get_mut(id)
                .ok_or_else(|| CoreError::DevinTaskNotFound(id.to_string()))?;
            let mut next_task = task.clone();
            let status = next_task.complete(&completion)?;

            let mut next_prd = None;
            let mut agent: Option<Agent> = None;
            match prds.get(&task.prd_id) {
                Some(prd) => {
                    let mut prd = prd.clone();
                    let path = if status == DevinTaskStatus::Failed {
                        FAIL_PATH
                    } else {
                        COMPLETE_PATH
                    };
                    advance(&mut prd, path)?;

                    if status == DevinTaskStatus::Completed
                        && completion.deployment_method == DeploymentMethod::McpAutomatic
                    {
                        let name: String =
                            prd.fields.title.chars().take(MAX_AGENT_NAME_CHARS).collect();
                        let (reg, target) = registration_from_prd(
                            &self.state.github,
                            &self.state.config.environment,
                            &prd,
                            &name,
                            &prd.fields.description,
                            None,
                            Some(task.id.clone()),
                        );
                        agent = Some(Agent::register(reg)?);
                        prd.github_repo_url = Some(target.repository_url);
                    }
                    next_prd = Some(prd);
                }
                None => warn!(task_id = %id, prd_id = %task.prd_id, "Completed task has no PRD"),
            }

            *task = next_task;
            if let Some(prd) = next_prd {
                prds.insert(prd.id.clone(), prd);
            }
            if let Some(agent) = &agent {
                agents.insert(agent.id.clone(), agent.clone());
            }
            (task.clone(), agent)
        };
        self.state.persist().await;

        info!(
            task_id = %id,
            status = %task.status,
            agent_id = agent.as_ref().map(|a| a.id.as_str()).unwrap_or("-"),
            "Devin task completed"
        );
        Ok(CompleteTaskResponse { task, agent })
    }

    /// Cancel an unfinished task. A PRD already in progress is marked failed.
    pub async fn cancel(&self, id: &DevinTaskId) -> ServiceResult<DevinTask> {
        let task = {
            let mut prds = self.state.prds.write().await;
            let mut tasks = self.state.devin_tasks.write().await;
            let task = tasks
                .get_mut(id)
                .ok_or_else(|| CoreError::DevinTaskNotFound(id.to_string()))?;
            task.cancel()?;
            if let Some(prd) = prds.get_mut(&task.prd_id) {
                if prd.status == PrdStatus::InProgress {
                    prd.transition(PrdStatus::Failed)?;
                }
            }
            task.clone()
        };
        self.state.persist().await;

        info!(task_id = %id, "Devin task cancelled");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::config::Config;
    use crate::devin::{DevinApi, DevinError, DevinSession};
    use crate::service::ServiceError;
    use factory_core::{AgentStatus, PrdFields};

    struct FakeDevin {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl DevinApi for FakeDevin {
        async fn create_session(&self, prompt: &str) -> Result<DevinSession, DevinError> {
            assert!(prompt.starts_with("# Devin AI Task:"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DevinError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(DevinSession {
                session_id: "devin-1".into(),
                url: Some("https://app.devin.ai/sessions/1".into()),
            })
        }
    }

    /// Blocks inside `create_session` until released.
    struct HeldDevin {
        calls: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DevinApi for HeldDevin {
        async fn create_session(&self, _prompt: &str) -> Result<DevinSession, DevinError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.notify_one();
            self.release.notified().await;
            Ok(DevinSession {
                session_id: "devin-held".into(),
                url: None,
            })
        }
    }

    async fn seed(state: &Arc<AppState>) -> (Prd, DevinTask) {
        let prd = Prd::new(
            PrdFields::new("Ticket Bot", "Sorts tickets").with_requirements(["Classify tickets"]),
        )
        .unwrap();
        state.prds.write().await.insert(prd.id.clone(), prd.clone());
        let task = DevinService::new(state.clone())
            .create(DevinTaskCreate {
                prd_id: prd.id.clone(),
                title: "Build Ticket Bot".into(),
                description: "Sorts tickets".into(),
                requirements: prd.fields.requirements.clone(),
            })
            .await
            .unwrap();
        (prd, task)
    }

    #[test]
    fn test_advance_paths() {
        let mut prd = Prd::new(PrdFields::new("T", "D")).unwrap();
        advance(&mut prd, EXECUTE_PATH).unwrap();
        assert_eq!(prd.status, PrdStatus::InProgress);
        advance(&mut prd, EXECUTE_PATH).unwrap();
        advance(&mut prd, COMPLETE_PATH).unwrap();
        assert_eq!(prd.status, PrdStatus::Completed);

        let err = advance(&mut prd, EXECUTE_PATH).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStateTransition { .. }));
        assert_eq!(prd.status, PrdStatus::Completed);
    }

    #[tokio::test]
    async fn test_create_requires_prd() {
        let svc = DevinService::new(AppState::new());
        let err = svc
            .create(DevinTaskCreate {
                prd_id: factory_core::PrdId::new("missing"),
                title: "T".into(),
                description: "D".into(),
                requirements: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::PrdNotFound(_))));
    }

    #[tokio::test]
    async fn test_execute_without_client() {
        let state = AppState::new();
        let (prd, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());

        let resp = svc.execute(&task.id).await.unwrap();
        assert_eq!(resp.status, DevinTaskStatus::InDevin);
        assert!(resp.note.unwrap().contains("No Devin API key"));
        assert_eq!(state.prds.read().await[&prd.id].status, PrdStatus::InProgress);

        // A second execute is rejected.
        let err = svc.execute(&task.id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_with_client_attaches_session() {
        let fake = Arc::new(FakeDevin {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let state = AppState::with_config(Config::default(), Some(fake.clone()));
        let (_, task) = seed(&state).await;
        let svc = DevinService::new(state);

        let resp = svc.execute(&task.id).await.unwrap();
        assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            resp.session_url.as_deref(),
            Some("https://app.devin.ai/sessions/1")
        );
        assert_eq!(
            svc.get(&task.id).await.unwrap().session_id.as_deref(),
            Some("devin-1")
        );
    }

    #[tokio::test]
    async fn test_execute_api_failure_changes_nothing() {
        let fake = Arc::new(FakeDevin {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let state = AppState::with_config(Config::default(), Some(fake));
        let (prd, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());

        let err = svc.execute(&task.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Devin(_)));
        assert_eq!(svc.get(&task.id).await.unwrap().status, DevinTaskStatus::Pending);
        assert_eq!(state.prds.read().await[&prd.id].status, PrdStatus::Queue);
    }

    #[tokio::test]
    async fn test_concurrent_execute_opens_one_session() {
        let held = Arc::new(HeldDevin {
            calls: AtomicUsize::new(0),
            started: Notify::new(),
            release: Notify::new(),
        });
        let state = AppState::with_config(Config::default(), Some(held.clone()));
        let (_, task) = seed(&state).await;

        let first = {
            let state = state.clone();
            let id = task.id.clone();
            tokio::spawn(async move { DevinService::new(state).execute(&id).await })
        };
        held.started.notified().await;

        let svc = DevinService::new(state.clone());
        let err = svc.execute(&task.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::TaskBusy(_))));

        held.release.notify_one();
        let resp = first.await.unwrap().unwrap();
        assert_eq!(resp.status, DevinTaskStatus::InDevin);
        assert_eq!(held.calls.load(Ordering::SeqCst), 1);
        assert!(state.executing.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_truncates_long_title_for_agent_name() {
        let state = AppState::new();
        let prd = Prd::new(PrdFields::new("T".repeat(150), "Sorts tickets")).unwrap();
        state.prds.write().await.insert(prd.id.clone(), prd.clone());
        let svc = DevinService::new(state.clone());
        let task = svc
            .create(DevinTaskCreate {
                prd_id: prd.id.clone(),
                title: "Build".into(),
                description: "Sorts tickets".into(),
                requirements: vec![],
            })
            .await
            .unwrap();

        let resp = svc
            .complete(
                &task.id,
                DevinTaskComplete {
                    agent_code: Some("x".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.task.status, DevinTaskStatus::Completed);
        assert_eq!(resp.agent.unwrap().name, "T".repeat(100));
    }

    #[tokio::test]
    async fn test_complete_registers_agent() {
        let state = AppState::new();
        let (prd, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());
        svc.execute(&task.id).await.unwrap();

        let resp = svc
            .complete(
                &task.id,
                DevinTaskComplete {
                    agent_code: Some("fn main() {}".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.task.status, DevinTaskStatus::Completed);
        let agent = resp.agent.unwrap();
        assert_eq!(agent.status, AgentStatus::Pending);
        assert_eq!(agent.devin_task_id.as_ref(), Some(&task.id));
        assert_eq!(agent.capabilities, vec!["Classify tickets"]);

        let prd = state.prds.read().await[&prd.id].clone();
        assert_eq!(prd.status, PrdStatus::Completed);
        assert_eq!(prd.github_repo_url, agent.repository_url);
        assert_eq!(state.agent_count().await, 1);
    }

    #[tokio::test]
    async fn test_complete_with_error_fails_prd() {
        let state = AppState::new();
        let (prd, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());

        let resp = svc
            .complete(
                &task.id,
                DevinTaskComplete {
                    error_message: Some("build broke".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(resp.task.status, DevinTaskStatus::Failed);
        assert!(resp.agent.is_none());
        assert_eq!(state.prds.read().await[&prd.id].status, PrdStatus::Failed);
        assert_eq!(state.agent_count().await, 0);
    }

    #[tokio::test]
    async fn test_manual_completion_skips_agent() {
        let state = AppState::new();
        let (_, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());

        let resp = svc
            .complete(
                &task.id,
                DevinTaskComplete {
                    deployment_method: DeploymentMethod::Manual,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(resp.agent.is_none());
        assert!(svc.complete(&task.id, DevinTaskComplete::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_cancel_in_progress() {
        let state = AppState::new();
        let (prd, task) = seed(&state).await;
        let svc = DevinService::new(state.clone());
        svc.execute(&task.id).await.unwrap();

        let cancelled = svc.cancel(&task.id).await.unwrap();
        assert_eq!(cancelled.status, DevinTaskStatus::Cancelled);
        assert_eq!(state.prds.read().await[&prd.id].status, PrdStatus::Failed);
        assert!(svc.cancel(&task.id).await.is_err());
    }

    #[tokio::test]
    async fn test_prompt_is_wrapped_for_copy() {
        let state = AppState::new();
        let (_, task) = seed(&state).await;
        let prompt = DevinService::new(state).prompt(&task.id).await.unwrap();
        assert!(prompt.prompt.starts_with("# Devin AI Task: Build Ticket Bot"));
        assert!(prompt.formatted_for_copy.contains("--- COPY THIS TO DEVIN AI ---"));
    }
}
