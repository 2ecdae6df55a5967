//! HTTP request handlers.

mod agents;
mod devin;
mod health;
mod mcp_bridge;
mod prds;
mod roadmap;

pub use agents::{agent_health, delete_agent, get_agent, list_agents, register_agent, update_agent};
pub use devin::{cancel_task, complete_task, create_task, execute_task, get_prompt, get_task, list_tasks};
pub use health::{api_health, config_status, health_check, metrics_handler, root};
pub use mcp_bridge::{load_prd, mcp_status};
pub use prds::{
    answer_section, chat, create_prd, delete_prd, download_markdown, get_completion,
    get_guided_questions, get_markdown, get_prd, list_prds, list_ready_for_devin,
    mark_ready_for_devin, update_prd, upload_prd,
};
pub use roadmap::{categories, overview, prioritization_matrix, priorities, roadmap, roadmap_prds, statuses};
