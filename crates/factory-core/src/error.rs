//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the agent factory.
#[derive(Debug, Error)]
pub enum CoreError {
    /// PRD not found.
    #[error("PRD not found: {0}")]
    PrdNotFound(String),

    /// Agent not found.
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Devin task not found.
    #[error("Devin task not found: {0}")]
    DevinTaskNotFound(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// A string did not name any variant of an enumeration.
    #[error("Unknown {kind}: '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// Another request is already executing this Devin task.
    #[error("Devin task is already being executed: {0}")]
    TaskBusy(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded content exceeds the size limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Shorthand for building an [`CoreError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::PrdNotFound(_) | Self::AgentNotFound(_) | Self::DevinTaskNotFound(_)
        )
    }
}
