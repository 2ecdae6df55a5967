//! HTTP request and response types.
//!
//! Bodies shared with the client live in `factory_core::api`; this module
//! adds the server-only ones.

use serde::Serialize;

pub use factory_core::api::*;

// ============================================================================
// Service types
// ============================================================================

/// Response for `GET /`.
#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
    pub version: String,
    pub docs: String,
    pub mcp: String,
}

// ============================================================================
// MCP types
// ============================================================================

/// Load confirmation, mirroring the MCP tool output.
pub fn load_prd_response(data: LoadPrdData) -> LoadPrdResponse {
    LoadPrdResponse {
        success: true,
        message: format!("PRD '{}' loaded into MCP cache", data.prd_title),
        data,
    }
}
