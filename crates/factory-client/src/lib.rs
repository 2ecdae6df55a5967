//! Client library for the AI Agent Factory API.
//!
//! Provides a typed HTTP client for every `/api/v1` endpoint of the factory
//! server, plus query builders for the list and roadmap endpoints.

pub mod error;
pub mod http;
pub mod query;

pub use error::ClientError;
pub use factory_core::RoadmapQuery;
pub use http::ApiClient;
pub use query::ListQuery;
