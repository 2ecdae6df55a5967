//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::collections::HashMap;
use std::fmt::Write;
use std::hash::Hash;
use std::sync::Arc;

use factory_core::{AgentStatus, DevinTaskStatus, PrdStatus};

use crate::state::AppState;

/// Collect all metrics from AppState and format as Prometheus text.
pub async fn collect_metrics(state: &Arc<AppState>) -> String {
    let mut output = String::new();

    collect_prd_metrics(state, &mut output).await;
    collect_agent_metrics(state, &mut output).await;
    collect_devin_task_metrics(state, &mut output).await;
    collect_mcp_metrics(state, &mut output).await;

    output
}

/// Write one gauge family with a sample per status, zeros included.
fn write_status_gauge<S>(
    output: &mut String,
    name: &str,
    help: &str,
    all: &[S],
    counts: &HashMap<S, u64>,
) where
    S: Copy + Eq + Hash + std::fmt::Display,
{
    if !output.is_empty() {
        writeln!(output).ok();
    }
    writeln!(output, "# HELP {name} {help}").ok();
    writeln!(output, "# TYPE {name} gauge").ok();
    for status in all {
        let count = counts.get(status).copied().unwrap_or(0);
        writeln!(output, "{name}{{status=\"{status}\"}} {count}").ok();
    }
}

fn count_by<S, I>(statuses: I) -> HashMap<S, u64>
where
    S: Eq + Hash,
    I: IntoIterator<Item = S>,
{
    let mut counts = HashMap::new();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }
    counts
}

/// Collect PRD metrics by status.
async fn collect_prd_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = count_by(state.prds.read().await.values().map(|p| p.status));
    write_status_gauge(
        output,
        "factory_prds_total",
        "Number of PRDs by status",
        PrdStatus::ALL,
        &counts,
    );
}

/// Collect agent metrics by status.
async fn collect_agent_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = count_by(state.agents.read().await.values().map(|a| a.status));
    write_status_gauge(
        output,
        "factory_agents_total",
        "Number of registered agents by status",
        AgentStatus::ALL,
        &counts,
    );
}

/// Collect Devin task metrics by status.
async fn collect_devin_task_metrics(state: &Arc<AppState>, output: &mut String) {
    let counts = count_by(state.devin_tasks.read().await.values().map(|t| t.status));
    write_status_gauge(
        output,
        "factory_devin_tasks_total",
        "Number of Devin tasks by status",
        DevinTaskStatus::ALL,
        &counts,
    );
}

async fn collect_mcp_metrics(state: &Arc<AppState>, output: &mut String) {
    let size = state.mcp_cache.read().await.len();
    writeln!(output).ok();
    writeln!(
        output,
        "# HELP factory_mcp_cache_size Number of PRDs loaded into the MCP cache"
    )
    .ok();
    writeln!(output, "# TYPE factory_mcp_cache_size gauge").ok();
    writeln!(output, "factory_mcp_cache_size {size}").ok();
}
