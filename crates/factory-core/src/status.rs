//! Status and classification enums for PRDs, agents and Devin tasks.
//!
//! Every enum serializes as a lowercase snake_case string, matching the JSON
//! the dashboard consumes, and parses back from the same string.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(CoreError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Kind of PRD: a standalone agent or a change to the platform itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdType {
    #[default]
    Agent,
    Platform,
}

string_enum!(PrdType, "PRD type", {
    Agent => "agent",
    Platform => "platform",
});

/// Position of a PRD in the delivery pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdStatus {
    /// File received, not yet normalized.
    Uploaded,
    /// Being rewritten into the standard template.
    Standardizing,
    /// Waiting for a human pass.
    Review,
    /// Accepted and waiting to be scheduled.
    #[default]
    Queue,
    /// Approved for hand-off to Devin AI.
    ReadyForDevin,
    /// A Devin task is working on it.
    InProgress,
    /// Devin finished and an agent was produced.
    Completed,
    /// The Devin task failed.
    Failed,
    /// Archived after completion.
    Processed,
}

string_enum!(PrdStatus, "PRD status", {
    Uploaded => "uploaded",
    Standardizing => "standardizing",
    Review => "review",
    Queue => "queue",
    ReadyForDevin => "ready_for_devin",
    InProgress => "in_progress",
    Completed => "completed",
    Failed => "failed",
    Processed => "processed",
});

impl PrdStatus {
    /// Statuses reachable from this one in a single step.
    pub fn allowed_transitions(&self) -> &'static [PrdStatus] {
        use PrdStatus::*;
        match self {
            Uploaded => &[Standardizing, Review, Queue],
            Standardizing => &[Review, Queue, Failed],
            Review => &[Queue, ReadyForDevin],
            Queue => &[ReadyForDevin, Review],
            ReadyForDevin => &[InProgress, Queue],
            InProgress => &[Completed, Failed],
            Completed => &[Processed],
            Failed => &[Queue, ReadyForDevin],
            Processed => &[],
        }
    }

    /// Returns true if moving to `next` is permitted. Staying put is always allowed.
    pub fn can_transition_to(&self, next: PrdStatus) -> bool {
        *self == next || self.allowed_transitions().contains(&next)
    }

    /// Validate a transition, returning the target status on success.
    pub fn transition_to(&self, next: PrdStatus) -> Result<PrdStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStateTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// Returns true if no further transitions exist.
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

/// Roadmap priority of a PRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdPriority {
    Low,
    Medium,
    High,
    Critical,
}

string_enum!(PrdPriority, "PRD priority", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

/// Effort estimate of a PRD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrdEffort {
    Small,
    Medium,
    Large,
    Epic,
}

string_enum!(PrdEffort, "effort estimate", {
    Small => "small",
    Medium => "medium",
    Large => "large",
    Epic => "epic",
});

/// Lifecycle status of a registered agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    #[default]
    Pending,
    Deployed,
    Running,
    Stopped,
    Failed,
    Maintenance,
}

string_enum!(AgentStatus, "agent status", {
    Pending => "pending",
    Deployed => "deployed",
    Running => "running",
    Stopped => "stopped",
    Failed => "failed",
    Maintenance => "maintenance",
});

/// Result of the most recent health probe against an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentHealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
    Degraded,
}

string_enum!(AgentHealthStatus, "agent health status", {
    Healthy => "healthy",
    Unhealthy => "unhealthy",
    Unknown => "unknown",
    Degraded => "degraded",
});

impl AgentHealthStatus {
    /// Classify an HTTP status code returned by an agent's health endpoint.
    pub fn from_http_status(code: u16) -> Self {
        match code {
            200..=299 => Self::Healthy,
            500..=599 => Self::Unhealthy,
            _ => Self::Degraded,
        }
    }
}

/// Status of a Devin task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevinTaskStatus {
    /// Created, prompt generated, not yet handed to Devin.
    #[default]
    Pending,
    /// Handed to Devin and awaiting completion.
    InDevin,
    Completed,
    Failed,
    Cancelled,
}

string_enum!(DevinTaskStatus, "Devin task status", {
    Pending => "pending",
    InDevin => "in_devin",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl DevinTaskStatus {
    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the task is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}
