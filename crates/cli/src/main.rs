//! calcgrid CLI — the main entry point.
//!
//! Commands:
//! - `orchestrator` — Start the HTTP API that accepts expressions and hands out tasks
//! - `agent`        — Start a worker agent that computes tasks
//! - `check`        — Show how an expression compiles and evaluates
//! - `config`       — Inspect configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "calcgrid",
    about = "calcgrid — distributed arithmetic expression evaluator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the orchestrator HTTP server
    Orchestrator {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Start a worker agent
    Agent {
        /// Orchestrator base URL
        #[arg(short, long)]
        server: Option<String>,

        /// Number of tasks computed in parallel
        #[arg(short, long)]
        computing_power: Option<usize>,
    },

    /// Compile an expression and print its task plan and value
    Check {
        /// The arithmetic expression, e.g. "2+2*4"
        expression: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Check the configuration for errors
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Orchestrator { port } => commands::orchestrator::run(port).await?,
        Commands::Agent {
            server,
            computing_power,
        } => commands::agent::run(server, computing_power).await?,
        Commands::Check { expression } => commands::check::run(&expression)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
            ConfigAction::Validate => commands::config_cmd::validate().await?,
        },
    }

    Ok(())
}
