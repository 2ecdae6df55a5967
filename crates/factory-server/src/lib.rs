//! AI Agent Factory Server Library
//!
//! This crate provides the factory backend: the REST API over PRDs, agents
//! and Devin tasks, the MCP server for coding assistants, snapshot
//! persistence and the Devin client.

pub mod config;
pub mod devin;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod service;
pub mod state;
pub mod store;

pub use config::Config;
pub use http::create_router;
pub use mcp::{create_mcp_router, FactoryMcpServer};
pub use state::AppState;
