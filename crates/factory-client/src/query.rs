//! Query builders for the list endpoints.

use serde::Serialize;

use factory_core::{AgentStatus, DevinTaskStatus, PrdId, PrdStatus, PrdType};

/// `skip`/`limit` window plus the optional filters shared by the list
/// endpoints. Filters a given endpoint does not know are ignored by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prd_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prd_id: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Page `page` (1-based) of `size` items.
    pub fn page(self, page: usize, size: usize) -> Self {
        self.skip(page.saturating_sub(1) * size).limit(size)
    }

    pub fn prd_status(mut self, status: PrdStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn agent_status(mut self, status: AgentStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn task_status(mut self, status: DevinTaskStatus) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn prd_type(mut self, prd_type: PrdType) -> Self {
        self.prd_type = Some(prd_type.to_string());
        self
    }

    pub fn prd_id(mut self, prd_id: &PrdId) -> Self {
        self.prd_id = Some(prd_id.to_string());
        self
    }
}
