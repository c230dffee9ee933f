//! Blueprint CLI - validate SaaS ideas and track their execution

use std::sync::Arc;

use blueprint_core::config::Config;
use blueprint_core::domain::{
    Project, ProjectFilter, ProjectStatusFilter, Task, TaskFilter, TaskPriority, TaskStatus,
    TaskStatusFilter, ValidationReport, ValidationScores,
};
use blueprint_core::remote::{HttpRemoteClient, RemoteSync, User};
use blueprint_core::workspace::Workspace;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;


#[derive(Parser)]
#[command(name = "blueprint")]
#[command(author, version, about = "Validate SaaS ideas and track their execution", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and print a session token
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BLUEPRINT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and print a session token
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BLUEPRINT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the logged-in user
    Whoami,

    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show the suggested user flow for a project
    Flow { project_id: String },

    /// Get advice for your latest project
    Suggest,

    /// Portfolio overview
    Dashboard,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List projects
    List {
        /// Status filter (all, active, completed, paused)
        #[arg(short, long, default_value = "all")]
        status: ProjectStatusFilter,
        /// Case-insensitive text to match in title or description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show project details, validation scores and progress
    Show { id: String },
    /// Submit a new idea for validation
    Create {
        #[arg(short, long)]
        title: String,
        /// Idea description (at least 50 characters)
        #[arg(short, long)]
        description: String,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List a project's tasks
    List {
        project_id: String,
        /// Status filter (all, todo, in-progress, done); defaults to display.default_task_filter
        #[arg(short, long)]
        status: Option<TaskStatusFilter>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Add a task to a project
    Add {
        project_id: String,
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "medium")]
        priority: TaskPriority,
    },
    /// Move a task to a new status
    Move {
        project_id: String,
        task_id: String,
        /// New status (todo, in-progress, done)
        status: TaskStatus,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
    /// Reset to defaults
    Reset,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("blueprint=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
    Ok(())
}

/// Print an error with its code and a hint when the core supplies one
fn report(error: &anyhow::Error) {
    match error.downcast_ref::<blueprint_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    let quiet = cli.quiet;

    let command = match cli.command {
        Commands::Config { action } => return cmd_config(action, quiet),
        command => command,
    };

    let config = Config::load()?;
    let client = HttpRemoteClient::from_config(&config.api)?;
    debug!(base_url = %client.base_url(), "Using Blueprint API");
    let workspace = Workspace::new(Arc::new(client));

    match command {
        Commands::Login { email, password } => {
            let user = workspace.login(&email, &password).await?;
            print_session(workspace.remote(), &user, format, quiet).await
        }
        Commands::Register {
            username,
            email,
            password,
        } => {
            let user = workspace.register(&username, &email, &password).await?;
            print_session(workspace.remote(), &user, format, quiet).await
        }
        Commands::Whoami => {
            let user = workspace.profile().await?;
            match format {
                OutputFormat::Json => print_json(&user),
                OutputFormat::Text => {
                    println!("{} <{}>", user.username, user.email);
                    Ok(())
                }
            }
        }
        Commands::Projects { action } => cmd_projects(&workspace, action, format, quiet).await,
        Commands::Tasks { action } => cmd_tasks(&workspace, &config, action, format, quiet).await,
        Commands::Flow { project_id } => {
            let flow = workspace.flow(&project_id).await?;
            match format {
                OutputFormat::Json => print_json(&flow),
                OutputFormat::Text => {
                    println!("{}", flow.flow_description);
                    if !flow.pages_needed.is_empty() {
                        println!("\nPages needed:");
                        for page in &flow.pages_needed {
                            println!("  - {}", page);
                        }
                    }
                    Ok(())
                }
            }
        }
        Commands::Suggest => {
            let suggestion = workspace.suggestion().await?;
            match format {
                OutputFormat::Json => print_json(&suggestion),
                OutputFormat::Text => {
                    println!("{}", suggestion.suggestion);
                    if let Some(progress) = suggestion.project_progress {
                        println!("Latest project progress: {:.1}%", progress);
                    }
                    for step in &suggestion.next_steps {
                        println!("  - {}", step);
                    }
                    Ok(())
                }
            }
        }
        Commands::Dashboard => {
            workspace.refresh_projects().await?;
            let summary = workspace.dashboard();
            match format {
                OutputFormat::Json => print_json(&summary),
                OutputFormat::Text => {
                    println!("Projects:         {}", summary.total_projects);
                    println!("Active:           {}", summary.active_projects);
                    println!(
                        "Tasks completed:  {}/{}",
                        summary.completed_tasks, summary.total_tasks
                    );
                    println!("Overall progress: {:.1}%", summary.overall_progress);
                    Ok(())
                }
            }
        }
        Commands::Config { action } => cmd_config(action, quiet),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Each invocation is a new process, so the token is handed back for
/// `BLUEPRINT_TOKEN`
async fn print_session(
    client: &HttpRemoteClient,
    user: &User,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let session = client
        .session()
        .await
        .ok_or(blueprint_core::Error::NotAuthenticated)?;

    if format == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "user": user,
            "access_token": session.access_token(),
        }));
    }
    if !quiet {
        println!("Logged in as {} <{}>", user.username, user.email);
        println!("\nTo stay logged in for later commands:");
    }
    println!("export BLUEPRINT_TOKEN={}", session.access_token());
    Ok(())
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_projects<R: RemoteSync + ?Sized>(
    workspace: &Workspace<R>,
    action: ProjectAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        ProjectAction::List { status, search } => {
            workspace.refresh_projects().await?;
            let mut filter = ProjectFilter::new(status);
            if let Some(search) = search {
                filter = filter.with_query(search);
            }
            let projects = workspace.projects_view(&filter);

            if format == OutputFormat::Json {
                return print_json(&projects);
            }
            if projects.is_empty() {
                if !quiet {
                    println!("No projects found. Create one with `blueprint projects create`.");
                }
                return Ok(());
            }
            for project in &projects {
                println!(
                    "{}  {:<30} {:<10} {:>5.1}%  ({}/{} tasks)",
                    project.id,
                    project.title,
                    project.status,
                    project.progress(),
                    project.completed_tasks,
                    project.task_count
                );
            }
        }
        ProjectAction::Show { id } => {
            let project = workspace.refresh_project(&id).await?;
            if workspace.store().get_tasks(&id).is_none() {
                workspace.refresh_tasks(&id).await?;
            }
            let project = workspace.store().get_project(&id).unwrap_or(project);

            if format == OutputFormat::Json {
                return print_json(&project);
            }
            print_project(&project);
            if let Some(stats) = workspace.store().project_stats(&id) {
                println!(
                    "Tasks: {} to do, {} in progress, {} done",
                    stats.todo, stats.in_progress, stats.done
                );
            }
        }
        ProjectAction::Create { title, description } => {
            let project = workspace.create_project(&title, &description).await?;
            if format == OutputFormat::Json {
                return print_json(&project);
            }
            if !quiet {
                println!("Project created successfully!");
                print_project(&project);
                println!("\nNext steps:");
                println!("  1. Run `blueprint tasks list {}` to see the seeded tasks", project.id);
                println!("  2. Run `blueprint flow {}` to see the suggested user flow", project.id);
            }
        }
    }
    Ok(())
}

fn print_project(project: &Project) {
    println!("  ID: {}", project.id);
    println!("  Title: {}", project.title);
    println!("  Status: {}", project.status);
    println!(
        "  Progress: {:.1}% ({}/{} tasks)",
        project.progress(),
        project.completed_tasks,
        project.task_count
    );
    if !project.features.is_empty() {
        println!("  Features: {}", project.features.join(", "));
    }

    match &project.validation_scores {
        Some(ValidationReport::Scored(scores)) => print_scores(scores),
        Some(ValidationReport::Freeform(text)) => println!("  Analysis: {}", text),
        None => println!("  Analysis: not available"),
    }
}

fn print_scores(scores: &ValidationScores) {
    for (label, score) in [
        ("Market need", scores.market_need),
        ("Feasibility", scores.technical_feasibility),
        ("User value", scores.user_value),
    ] {
        if let Some(score) = score {
            let width = ValidationScores::display_width(score) / 5.0;
            println!(
                "  {:<12} {:>4.1}/10 {}",
                label,
                score,
                "#".repeat(width.round() as usize)
            );
        }
    }
    if let Some(feedback) = &scores.feedback {
        println!("  Feedback: {}", feedback);
    }
    for suggestion in &scores.suggestions {
        println!("    - {}", suggestion);
    }
}

async fn cmd_tasks<R: RemoteSync + ?Sized>(
    workspace: &Workspace<R>,
    config: &Config,
    action: TaskAction,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    match action {
        TaskAction::List {
            project_id,
            status,
            search,
        } => {
            workspace.refresh_tasks(&project_id).await?;
            let mut filter =
                TaskFilter::new(status.unwrap_or(config.display.default_task_filter));
            if let Some(search) = search {
                filter = filter.with_query(search);
            }
            let tasks = workspace.tasks_view(&project_id, &filter);

            if format == OutputFormat::Json {
                return print_json(&tasks);
            }
            if tasks.is_empty() {
                if !quiet {
                    println!("No tasks match.");
                }
                return Ok(());
            }
            for task in &tasks {
                print_task(task);
            }
        }
        TaskAction::Add {
            project_id,
            title,
            description,
            priority,
        } => {
            let task = workspace
                .create_task(&project_id, &title, &description, priority)
                .await?;
            if format == OutputFormat::Json {
                return print_json(&task);
            }
            if !quiet {
                println!("Task created: {}", task.id);
            }
        }
        TaskAction::Move {
            project_id,
            task_id,
            status,
        } => {
            workspace.refresh_tasks(&project_id).await?;
            let task = workspace.transition(&task_id, status).await?;
            if format == OutputFormat::Json {
                return print_json(&task);
            }
            if !quiet {
                println!("{} -> {}", task.title, task.status);
                if let Some(project) = workspace.store().get_project(&project_id) {
                    println!("Project progress: {:.1}%", project.progress());
                }
            }
        }
    }
    Ok(())
}

fn print_task(task: &Task) {
    println!(
        "{}  [{:<11}] {:<6} {}",
        task.id, task.status, task.priority, task.title
    );
}

fn cmd_config(action: ConfigAction, quiet: bool) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}
