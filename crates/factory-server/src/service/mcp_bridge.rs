//! PRD cache handed to MCP clients.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use factory_core::api::{LoadPrdData, McpStatusResponse};
use factory_core::{CoreError, Prd, PrdId, PrdStatus};

use crate::service::ServiceResult;
use crate::state::AppState;

/// Where a PRD returned to an MCP client came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdSource {
    Cache,
    Store,
}

/// Short description of a cached PRD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPrdSummary {
    pub id: PrdId,
    pub title: String,
    pub description: String,
    pub status: PrdStatus,
    pub created_at: DateTime<Utc>,
}

/// MCP cache operations.
pub struct McpBridge {
    state: Arc<AppState>,
}

impl McpBridge {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Copy a stored PRD into the cache.
    pub async fn load_prd(&self, id: &PrdId) -> ServiceResult<LoadPrdData> {
        // Holding `prds` keeps a concurrent delete from running before the
        // insert, so a deleted PRD is never cached again.
        let prds = self.state.prds.read().await;
        let prd = prds
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::PrdNotFound(id.to_string()))?;

        let mut cache = self.state.mcp_cache.write().await;
        cache.insert(prd.id.clone(), prd.clone());
        drop(prds);
        let data = LoadPrdData {
            prd_id: prd.id,
            prd_title: prd.fields.title,
            cache_size: cache.len(),
        };

        info!(prd_id = %id, cache_size = data.cache_size, "PRD loaded into MCP cache");
        Ok(data)
    }

    /// Look a PRD up in the cache, falling back to the store and caching it.
    pub async fn prd_details(&self, id: &PrdId) -> ServiceResult<(Prd, PrdSource)> {
        if let Some(prd) = self.state.mcp_cache.read().await.get(id) {
            return Ok((prd.clone(), PrdSource::Cache));
        }
        let prds = self.state.prds.read().await;
        let prd = prds
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::PrdNotFound(id.to_string()))?;
        self.state
            .mcp_cache
            .write()
            .await
            .insert(prd.id.clone(), prd.clone());
        Ok((prd, PrdSource::Store))
    }

    /// Summaries of every cached PRD, newest first.
    pub async fn cached(&self) -> Vec<CachedPrdSummary> {
        let mut summaries: Vec<CachedPrdSummary> = self
            .state
            .mcp_cache
            .read()
            .await
            .values()
            .map(|p| CachedPrdSummary {
                id: p.id.clone(),
                title: p.fields.title.clone(),
                description: p.fields.description.clone(),
                status: p.status,
                created_at: p.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub async fn cache_size(&self) -> usize {
        self.state.mcp_cache.read().await.len()
    }

    pub async fn status(&self) -> McpStatusResponse {
        McpStatusResponse {
            success: true,
            message: "MCP server is available".to_string(),
            url: self.state.config.mcp_url(),
            cache_size: self.cache_size().await,
        }
    }
}
