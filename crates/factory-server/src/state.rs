//! Shared application state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use factory_core::{Agent, AgentId, DevinTask, DevinTaskId, GithubLayout, Prd, PrdId};

use crate::config::Config;
use crate::devin::{DevinApi, DevinError, HttpDevinClient};
use crate::store::{Snapshot, SnapshotStore, StoreError};

/// Errors while building the state at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to build Devin client: {0}")]
    Devin(#[from] DevinError),
}

/// Shared application state.
///
/// Locks are always taken in the order `prds`, `agents`, `devin_tasks`,
/// `mcp_cache`.
pub struct AppState {
    pub config: Config,

    /// Repository layout derived from the configured GitHub owner.
    pub github: GithubLayout,

    /// PRDs indexed by id.
    pub prds: RwLock<HashMap<PrdId, Prd>>,

    /// Registered agents indexed by id.
    pub agents: RwLock<HashMap<AgentId, Agent>>,

    /// Devin tasks indexed by id.
    pub devin_tasks: RwLock<HashMap<DevinTaskId, DevinTask>>,

    /// PRDs loaded for MCP clients.
    pub mcp_cache: RwLock<HashMap<PrdId, Prd>>,

    /// Devin API client, present when an API key is configured.
    pub devin: Option<Arc<dyn DevinApi>>,

    /// Client for agent health probes.
    pub http: reqwest::Client,

    /// Devin tasks with an execute request in flight.
    pub(crate) executing: std::sync::Mutex<HashSet<DevinTaskId>>,

    store: Option<SnapshotStore>,

    /// Held from taking a snapshot until it is written, so an older snapshot
    /// never replaces a newer one.
    persist_lock: Mutex<()>,
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Arc<Self> {
        Self::with_config(Config::default(), None)
    }

    /// State for `config` using the given Devin client. Nothing is loaded
    /// from the snapshot file.
    pub fn with_config(config: Config, devin: Option<Arc<dyn DevinApi>>) -> Arc<Self> {
        let store = config.data_file.clone().map(SnapshotStore::new);
        Arc::new(Self {
            github: GithubLayout::new(&config.github_org),
            config,
            prds: RwLock::new(HashMap::new()),
            agents: RwLock::new(HashMap::new()),
            devin_tasks: RwLock::new(HashMap::new()),
            mcp_cache: RwLock::new(HashMap::new()),
            devin,
            http: reqwest::Client::new(),
            executing: std::sync::Mutex::new(HashSet::new()),
            store,
            persist_lock: Mutex::new(()),
        })
    }

    /// Build the state for the server binary: create the Devin client when a
    /// key is set and restore the snapshot file when one is configured.
    pub async fn from_config(config: Config) -> Result<Arc<Self>, StartupError> {
        let devin: Option<Arc<dyn DevinApi>> = match config.devin_key() {
            Some(key) => Some(Arc::new(HttpDevinClient::new(
                &config.devin_api_url,
                key,
                config.devin_timeout(),
            )?)),
            None => None,
        };

        let state = Self::with_config(config, devin);
        if let Some(store) = &state.store {
            let snapshot = store.load().await?;
            info!(
                path = %store.path().display(),
                prds = snapshot.prds.len(),
                agents = snapshot.agents.len(),
                devin_tasks = snapshot.devin_tasks.len(),
                "Snapshot loaded"
            );
            state.restore(snapshot).await;
        }
        Ok(state)
    }

    /// Replace the stored entities with a snapshot.
    pub async fn restore(&self, snapshot: Snapshot) {
        let mut prds = self.prds.write().await;
        let mut agents = self.agents.write().await;
        let mut tasks = self.devin_tasks.write().await;
        *prds = snapshot.prds.into_iter().map(|p| (p.id.clone(), p)).collect();
        *agents = snapshot
            .agents
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        *tasks = snapshot
            .devin_tasks
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();
    }

    /// Copy of every stored entity.
    pub async fn snapshot(&self) -> Snapshot {
        let prds = self.prds.read().await;
        let agents = self.agents.read().await;
        let tasks = self.devin_tasks.read().await;
        Snapshot {
            prds: prds.values().cloned().collect(),
            agents: agents.values().cloned().collect(),
            devin_tasks: tasks.values().cloned().collect(),
        }
    }

    /// Write the snapshot file, if one is configured.
    ///
    /// Callers must not hold any entity lock. Failures are logged and the
    /// in-memory state stays authoritative.
    pub async fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.snapshot().await;
        if let Err(e) = store.save(&snapshot).await {
            warn!(error = %e, "Failed to write snapshot");
        }
    }

    pub fn persistence_path(&self) -> Option<String> {
        self.store
            .as_ref()
            .map(|s| s.path().display().to_string())
    }

    /// Get the number of PRDs.
    pub async fn prd_count(&self) -> usize {
        self.prds.read().await.len()
    }

    /// Get the number of registered agents.
    pub async fn agent_count(&self) -> usize {
        self.agents.read().await.len()
    }
}
