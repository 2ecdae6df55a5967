//! Application services shared by the REST handlers and the MCP server.

use serde::Deserialize;
use thiserror::Error;

use factory_core::{CoreError, Pagination};

use crate::devin::DevinError;

pub mod agent_service;
pub mod devin_service;
pub mod mcp_bridge;
pub mod prd_service;

pub use agent_service::AgentService;
pub use devin_service::DevinService;
pub use mcp_bridge::McpBridge;
pub use prd_service::PrdService;

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Devin(#[from] DevinError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Query string shared by the list endpoints. Filters are kept as strings
/// and parsed by each service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub prd_type: Option<String>,
    #[serde(default)]
    pub prd_id: Option<String>,
}

impl ListParams {
    pub fn pagination(&self) -> Result<Pagination, CoreError> {
        Pagination::new(self.skip, self.limit)
    }

    /// Parse a filter value; blank values mean no filter.
    pub fn parse<T>(value: &Option<String>) -> Result<Option<T>, CoreError>
    where
        T: std::str::FromStr<Err = CoreError>,
    {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .transpose()
    }

    pub fn prd_id_filter(&self) -> Option<&str> {
        self.prd_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factory_core::PrdStatus;

    #[test]
    fn test_parse_filter() {
        let status: Option<PrdStatus> =
            ListParams::parse(&Some("ready_for_devin".into())).unwrap();
        assert_eq!(status, Some(PrdStatus::ReadyForDevin));

        let blank: Option<PrdStatus> = ListParams::parse(&Some("  ".into())).unwrap();
        assert!(blank.is_none());

        assert!(ListParams::parse::<PrdStatus>(&Some("bogus".into())).is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        let params = ListParams {
            limit: Some(0),
            ..Default::default()
        };
        assert!(params.pagination().is_err());
        assert_eq!(ListParams::default().pagination().unwrap().limit, 100);
    }
}
