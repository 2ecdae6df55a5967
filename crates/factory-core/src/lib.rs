//! AI Agent Factory Core Domain Types
//!
//! This crate contains pure domain types and algorithms with no dependencies on:
//! - Network/HTTP
//! - Storage
//! - Runtime specifics
//!
//! It covers the PRD pipeline (PRDs, agents, Devin tasks), the markdown
//! importer, completeness scoring, the roadmap, and markdown export.

pub mod agent;
pub mod api;
pub mod completion;
pub mod devin;
pub mod error;
pub mod ids;
pub mod markdown;
pub mod pagination;
pub mod prd;
pub mod render;
pub mod roadmap;
pub mod status;
pub mod validation;

// Re-export commonly used types
pub use agent::{Agent, AgentRegistration, AgentUpdate};
pub use completion::{ChatReply, ChatRequest, CompletionReport, Question};
pub use devin::{
    DeploymentMethod, DevinTask, DevinTaskComplete, DevinTaskCreate, GithubLayout,
    RepositoryStrategy, RepositoryTarget,
};
pub use error::CoreError;
pub use ids::{AgentId, DevinTaskId, PrdId};
pub use pagination::{Page, Pagination};
pub use prd::{Prd, PrdFields, PrdSection, PrdUpdate, SectionKind, SectionRef};
pub use roadmap::{RoadmapEntry, RoadmapFilter, RoadmapQuery};
pub use status::{
    AgentHealthStatus, AgentStatus, DevinTaskStatus, PrdEffort, PrdPriority, PrdStatus, PrdType,
};

/// Payload for creating a PRD.
pub type PrdCreate = PrdFields;
