//! AI Agent Factory CLI - Command line interface for the factory API.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};

use factory_client::{ApiClient, ListQuery};
use factory_core::completion::completion;
use factory_core::markdown::import_markdown;
use factory_core::roadmap::SortOrder;
use factory_core::validation::validate_upload;
use factory_core::{
    AgentId, AgentStatus, DeploymentMethod, DevinTaskComplete, DevinTaskCreate, DevinTaskId,
    DevinTaskStatus, Prd, PrdId, PrdStatus, PrdType, RoadmapQuery,
};

mod output;

use output::{print_agent, print_prd, print_roadmap, print_task};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// AI Agent Factory CLI - PRD to agent pipeline tool
#[derive(Parser)]
#[command(name = "factory")]
#[command(about = "CLI for the AI Agent Factory", long_about = None)]
struct Cli {
    /// Factory API address
    #[arg(short, long, env = "FACTORY_API_URL", default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List PRDs
    #[command(name = "list-prds")]
    ListPrds {
        /// Filter by status, e.g. ready_for_devin
        #[arg(short, long)]
        status: Option<PrdStatus>,

        /// Filter by PRD type (agent or platform)
        #[arg(short = 't', long = "type")]
        prd_type: Option<PrdType>,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Page size
        #[arg(long, default_value_t = 20)]
        size: usize,
    },

    /// Show one PRD
    #[command(name = "get-prd")]
    GetPrd {
        /// PRD ID
        id: String,
    },

    /// Upload a markdown or text file to the server
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// Parse a markdown file locally, then create the PRD
    Import {
        /// Markdown file to import
        file: PathBuf,

        /// Only show what would be created
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a PRD
    #[command(name = "delete-prd")]
    DeletePrd {
        /// PRD ID
        id: String,
    },

    /// Mark a PRD ready for Devin, or list ready PRDs when no ID is given
    Ready {
        /// PRD ID
        id: Option<String>,
    },

    /// Export a PRD as markdown
    Export {
        /// PRD ID
        id: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show guided questions for missing sections
    Questions {
        /// PRD ID
        id: String,
    },

    /// Answer one PRD section
    Answer {
        /// PRD ID
        id: String,

        /// Section name, e.g. problem_statement
        section: String,

        /// Section content; list sections take one item per line
        content: String,
    },

    /// List registered agents
    #[command(name = "list-agents")]
    ListAgents {
        /// Filter by status
        #[arg(short, long)]
        status: Option<AgentStatus>,

        /// Only agents built from this PRD
        #[arg(long)]
        prd_id: Option<String>,
    },

    /// Delete an agent
    #[command(name = "delete-agent")]
    DeleteAgent {
        /// Agent ID
        id: String,
    },

    /// Probe an agent's health URL
    #[command(name = "agent-health")]
    AgentHealth {
        /// Agent ID
        id: String,
    },

    /// List Devin tasks
    #[command(name = "list-tasks")]
    ListTasks {
        /// Filter by status
        #[arg(short, long)]
        status: Option<DevinTaskStatus>,
    },

    /// Create a Devin task from a PRD
    #[command(name = "create-task")]
    CreateTask {
        /// PRD ID
        prd_id: String,
    },

    /// Hand a task to Devin
    Execute {
        /// Task ID
        id: String,

        /// Print the copy-ready prompt as well
        #[arg(long)]
        show_prompt: bool,
    },

    /// Record the result of a Devin task
    Complete {
        /// Task ID
        id: String,

        /// Devin's output summary
        #[arg(long)]
        output: Option<String>,

        /// Mark the task failed with this message
        #[arg(long)]
        error: Option<String>,

        /// Register the agent yourself instead of automatically
        #[arg(long)]
        manual: bool,
    },

    /// Cancel a Devin task
    Cancel {
        /// Task ID
        id: String,
    },

    /// Poll a task until it finishes
    Watch {
        /// Task ID
        id: String,

        /// Seconds between polls
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Give up after this many seconds
        #[arg(long, default_value_t = 1800)]
        timeout: u64,
    },

    /// Show the roadmap
    Roadmap {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by status
        #[arg(long)]
        status: Option<PrdStatus>,

        /// Sort field: priority_score, business_value, technical_complexity, created_at, title
        #[arg(long, default_value = "priority_score")]
        sort_by: String,

        /// Sort ascending
        #[arg(long)]
        asc: bool,
    },

    /// Show the value/complexity prioritization matrix
    Matrix,

    /// Load a PRD into the server's MCP cache
    #[command(name = "mcp-load")]
    McpLoad {
        /// PRD ID
        prd_id: String,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> CliResult {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url);

    match cli.command {
        Commands::ListPrds {
            status,
            prd_type,
            page,
            size,
        } => {
            let mut query = ListQuery::new().page(page, size);
            if let Some(status) = status {
                query = query.prd_status(status);
            }
            if let Some(prd_type) = prd_type {
                query = query.prd_type(prd_type);
            }
            list_prds(&client, &query).await?;
        }
        Commands::GetPrd { id } => {
            let prd = client.get_prd(&PrdId::new(id)).await?;
            print_prd(&prd);
        }
        Commands::Upload { file } => {
            let filename = file_name(&file)?;
            let content = std::fs::read(&file)?;
            let prd = client.upload_prd(&filename, content).await?;
            println!("PRD uploaded:");
            print_prd(&prd);
        }
        Commands::Import { file, dry_run } => {
            import(&client, &file, dry_run).await?;
        }
        Commands::DeletePrd { id } => {
            let resp = client.delete_prd(&PrdId::new(id)).await?;
            println!("{}", resp.message);
        }
        Commands::Ready { id: Some(id) } => {
            let resp = client.mark_ready_for_devin(&PrdId::new(id)).await?;
            println!("{} ({})", resp.message, resp.prd_id);
        }
        Commands::Ready { id: None } => {
            let resp = client.ready_for_devin().await?;
            println!("{}", resp.message);
            for prd in resp.prds {
                println!("  {}  {}", prd.id, prd.fields.title);
            }
        }
        Commands::Export { id, output } => {
            let id = PrdId::new(id);
            match output {
                Some(path) => {
                    let markdown = client.download_markdown(&id).await?;
                    std::fs::write(&path, markdown)?;
                    println!("Exported to {}", path.display());
                }
                None => {
                    let export = client.prd_markdown(&id).await?;
                    println!("{}", export.markdown);
                }
            }
        }
        Commands::Questions { id } => {
            questions(&client, &PrdId::new(id)).await?;
        }
        Commands::Answer {
            id,
            section,
            content,
        } => {
            let resp = client.answer(&PrdId::new(id), &section, &content).await?;
            println!(
                "Section '{}' saved. Completion: {}%",
                section, resp.completion_percentage
            );
        }
        Commands::ListAgents { status, prd_id } => {
            let mut query = ListQuery::new().limit(factory_core::pagination::MAX_LIMIT);
            if let Some(status) = status {
                query = query.agent_status(status);
            }
            if let Some(prd_id) = prd_id {
                query = query.prd_id(&PrdId::new(prd_id));
            }
            list_agents(&client, &query).await?;
        }
        Commands::DeleteAgent { id } => {
            let resp = client.delete_agent(&AgentId::new(id)).await?;
            println!("{}", resp.message);
        }
        Commands::AgentHealth { id } => {
            let resp = client.agent_health(&AgentId::new(id)).await?;
            let code = resp
                .status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{}  {}  (HTTP {})  {}",
                resp.agent_id, resp.health_status, code, resp.message
            );
        }
        Commands::ListTasks { status } => {
            let mut query = ListQuery::new().limit(factory_core::pagination::MAX_LIMIT);
            if let Some(status) = status {
                query = query.task_status(status);
            }
            list_tasks(&client, &query).await?;
        }
        Commands::CreateTask { prd_id } => {
            let prd = client.get_prd(&PrdId::new(prd_id)).await?;
            let task = client.create_task(&task_from_prd(&prd)).await?;
            println!("Task created:");
            print_task(&task);
        }
        Commands::Execute { id, show_prompt } => {
            let id = DevinTaskId::new(id);
            let resp = client.execute_task(&id).await?;
            println!("{} ({})", resp.message, resp.status);
            if let Some(note) = resp.note {
                println!("{note}");
            }
            if show_prompt {
                let prompt = client.task_prompt(&id).await?;
                println!("{}", prompt.formatted_for_copy);
            }
        }
        Commands::Complete {
            id,
            output,
            error,
            manual,
        } => {
            let completion = DevinTaskComplete {
                devin_output: output,
                error_message: error,
                deployment_method: if manual {
                    DeploymentMethod::Manual
                } else {
                    DeploymentMethod::McpAutomatic
                },
                ..Default::default()
            };
            let resp = client
                .complete_task(&DevinTaskId::new(id), &completion)
                .await?;
            println!("Task {}:", resp.task.status);
            print_task(&resp.task);
            if let Some(agent) = resp.agent {
                println!("Agent registered:");
                print_agent(&agent);
            }
        }
        Commands::Cancel { id } => {
            let task = client.cancel_task(&DevinTaskId::new(id)).await?;
            println!("Task cancelled:");
            print_task(&task);
        }
        Commands::Watch {
            id,
            interval,
            timeout,
        } => {
            watch(
                &client,
                &DevinTaskId::new(id),
                Duration::from_secs(interval.max(1)),
                Duration::from_secs(timeout),
            )
            .await?;
        }
        Commands::Roadmap {
            category,
            status,
            sort_by,
            asc,
        } => {
            let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
            let mut query = RoadmapQuery::new().sort(&sort_by, order);
            if let Some(category) = category {
                query = query.category(category);
            }
            if let Some(status) = status {
                query = query.status(status);
            }
            let resp = client.roadmap_prds(&query).await?;
            println!("Roadmap ({}):", resp.total);
            print_roadmap(&resp.prds);
        }
        Commands::Matrix => {
            let matrix = client.prioritization_matrix().await?;
            for (label, entries) in [
                ("High value / low complexity", &matrix.high_value_low_complexity),
                ("High value / high complexity", &matrix.high_value_high_complexity),
                ("Low value / low complexity", &matrix.low_value_low_complexity),
                ("Low value / high complexity", &matrix.low_value_high_complexity),
            ] {
                println!("{label} ({}):", entries.len());
                print_roadmap(entries);
                println!();
            }
        }
        Commands::McpLoad { prd_id } => {
            let resp = client.mcp_load_prd(&PrdId::new(prd_id)).await?;
            println!("{} (cache size: {})", resp.message, resp.data.cache_size);
        }
        Commands::Health => {
            health(&client).await?;
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("Not a file: {}", path.display()).into())
}

/// Build a Devin task payload from a stored PRD.
fn task_from_prd(prd: &Prd) -> DevinTaskCreate {
    DevinTaskCreate {
        prd_id: prd.id.clone(),
        title: prd.fields.title.clone(),
        description: prd.fields.description.clone(),
        requirements: prd.fields.requirements.clone(),
    }
}

async fn list_prds(client: &ApiClient, query: &ListQuery) -> CliResult {
    let resp = client.list_prds(query).await?;

    println!("PRDs ({} of {}, page {}):", resp.prds.len(), resp.total, resp.page);
    println!("{:<36}  {:<15}  {:<8}  {}", "ID", "STATUS", "TYPE", "TITLE");
    println!("{}", "-".repeat(80));

    for prd in resp.prds {
        println!(
            "{:<36}  {:<15}  {:<8}  {}",
            prd.id.as_str(),
            prd.status.as_str(),
            prd.fields.prd_type.as_str(),
            prd.fields.title
        );
    }
    if resp.has_next {
        println!("(more: --page {})", resp.page + 1);
    }

    Ok(())
}

async fn import(client: &ApiClient, file: &Path, dry_run: bool) -> CliResult {
    let filename = file_name(file)?;
    let bytes = std::fs::read(file)?;
    let upload = validate_upload(&filename, &bytes)?;

    let (fields, filled) = import_markdown(&upload.content, Some(&upload.filename));
    let report = completion(&fields);
    // Runs the same validation the server applies.
    let preview = Prd::new(fields.clone())?;

    println!("Title:       {}", preview.fields.title);
    println!("Type:        {}", preview.fields.prd_type);
    println!("Requirements: {}", preview.fields.requirements.len());
    println!("Completion:  {}%", report.completion_percentage);
    if !filled.is_empty() {
        let names: Vec<&str> = filled.iter().map(|s| s.label()).collect();
        println!("Placeholders: {}", names.join(", "));
    }
    if !report.missing_sections.is_empty() {
        let names: Vec<&str> = report.missing_sections.iter().map(|s| s.label()).collect();
        println!("Missing:     {}", names.join(", "));
    }

    if dry_run {
        println!("Dry run: nothing created");
        return Ok(());
    }

    let prd = client.create_prd(&fields).await?;
    println!("PRD created:");
    print_prd(&prd);
    Ok(())
}

async fn questions(client: &ApiClient, id: &PrdId) -> CliResult {
    let resp = client.guided_questions(id).await?;
    println!("Completion: {}%", resp.completion_percentage);
    if resp.questions.is_empty() {
        println!("All required sections are filled");
        return Ok(());
    }
    for q in resp.questions {
        let optional = if q.is_optional { " (optional)" } else { "" };
        println!();
        println!("[{}]{} {}", q.section, optional, q.question);
        for sub in &q.sub_questions {
            println!("  - {sub}");
        }
        println!("  Example: {}", q.example);
    }
    Ok(())
}

async fn list_agents(client: &ApiClient, query: &ListQuery) -> CliResult {
    let resp = client.list_agents(query).await?;

    println!("Agents ({}):", resp.total);
    println!("{:<36}  {:<11}  {:<9}  {}", "ID", "STATUS", "HEALTH", "NAME");
    println!("{}", "-".repeat(80));

    for agent in resp.agents {
        println!(
            "{:<36}  {:<11}  {:<9}  {}",
            agent.id.as_str(),
            agent.status.as_str(),
            agent.health_status.as_str(),
            agent.name
        );
    }

    Ok(())
}

async fn list_tasks(client: &ApiClient, query: &ListQuery) -> CliResult {
    let resp = client.list_tasks(query).await?;

    println!("Devin tasks ({}):", resp.total);
    println!("{:<36}  {:<10}  {:<36}  {}", "ID", "STATUS", "PRD", "TITLE");
    println!("{}", "-".repeat(100));

    for task in resp.tasks {
        println!(
            "{:<36}  {:<10}  {:<36}  {}",
            task.id.as_str(),
            task.status.as_str(),
            task.prd_id.as_str(),
            task.title
        );
    }

    Ok(())
}

async fn watch(
    client: &ApiClient,
    id: &DevinTaskId,
    interval: Duration,
    timeout: Duration,
) -> CliResult {
    let started = Instant::now();
    let mut last: Option<DevinTaskStatus> = None;

    loop {
        let task = client.get_task(id).await?;
        if last != Some(task.status) {
            println!(
                "[{}] {} -> {}",
                output::format_elapsed(started.elapsed()),
                task.id,
                task.status
            );
            last = Some(task.status);
        }
        if task.status.is_terminal() {
            print_task(&task);
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(format!(
                "Timed out after {}s; task is still {}",
                timeout.as_secs(),
                task.status
            )
            .into());
        }
        tokio::time::sleep(interval).await;
    }
}

async fn health(client: &ApiClient) -> CliResult {
    if !client.health().await? {
        return Err(format!("Server at {} is not healthy", client.base_url()).into());
    }
    let resp = client.api_health().await?;
    println!("Status:      {}", resp.status);
    println!("Version:     {}", resp.version);
    println!("Environment: {}", resp.environment);
    for (service, enabled) in &resp.services {
        let state = if *enabled { "configured" } else { "not configured" };
        println!("  {service:<12} {state}");
    }
    Ok(())
}
