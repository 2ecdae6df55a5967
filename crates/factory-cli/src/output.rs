//! Terminal output helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

use factory_core::{Agent, DevinTask, Prd, RoadmapEntry};

pub fn print_prd(prd: &Prd) {
    let f = &prd.fields;
    println!("  ID:          {}", prd.id);
    println!("  Title:       {}", f.title);
    println!("  Type:        {}", f.prd_type);
    println!("  Status:      {}", prd.status);
    println!("  Created:     {}", format_timestamp(&prd.created_at));
    if let Some(url) = &prd.github_repo_url {
        println!("  Repository:  {url}");
    }
    println!("  Description: {}", f.description);

    if !f.requirements.is_empty() {
        println!("  Requirements:");
        for req in &f.requirements {
            println!("    - {req}");
        }
    }
}

pub fn print_agent(agent: &Agent) {
    println!("  ID:          {}", agent.id);
    println!("  Name:        {}", agent.name);
    println!("  Status:      {}", agent.status);
    println!("  Health:      {}", agent.health_status);
    if let Some(url) = &agent.repository_url {
        println!("  Repository:  {url}");
    }
    if let Some(url) = &agent.deployment_url {
        println!("  Deployment:  {url}");
    }
    if let Some(checked) = &agent.last_health_check {
        println!("  Checked:     {}", format_timestamp(checked));
    }
}

pub fn print_task(task: &DevinTask) {
    println!("  ID:          {}", task.id);
    println!("  PRD:         {}", task.prd_id);
    println!("  Title:       {}", task.title);
    println!("  Status:      {}", task.status);
    println!("  Updated:     {}", format_timestamp(&task.updated_at));
    if let Some(url) = &task.session_url {
        println!("  Session:     {url}");
    }
    if let Some(err) = &task.error_message {
        println!("  Error:       {err}");
    }
}

pub fn print_roadmap(entries: &[RoadmapEntry]) {
    println!(
        "{:<8}  {:<15}  {:<15}  {:<6}  {:>4}  {}",
        "SCORE", "CATEGORY", "STATUS", "EFFORT", "DONE", "TITLE"
    );
    println!("{}", "-".repeat(80));
    for entry in entries {
        println!(
            "{:<8.2}  {:<15}  {:<15}  {:<6}  {:>3}%  {}",
            entry.priority_score,
            entry.category,
            entry.status.as_str(),
            entry.effort_estimate.as_str(),
            entry.completion_percentage,
            entry.title
        );
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// `mm:ss` since a watch started.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "02:05");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(format_timestamp(&ts), "2025-03-14 09:26:53");
    }
}
