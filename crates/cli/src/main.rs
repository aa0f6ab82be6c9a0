//! ACWR CLI - Workload Analysis Session Management
//!
//! Terminal client for the ACWR analysis agent: upload training-load
//! spreadsheets, run the analysis pipeline, and chat about the results.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_client::AgentClient;

mod commands;
mod config;
mod output;
mod repl;

/// ACWR CLI - Workload Analysis Assistant
#[derive(Parser)]
#[command(name = "acwr")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Upload workload data, run the analysis agent, and chat about the results")]
#[command(long_about = r#"
ACWR CLI drives the workload analysis agent from the terminal.

Features:
  - One-command pipeline: upload, process, and view the report
  - Interactive chat about a processed session
  - Artifact collection and download (reports, charts, processed files)
  - Token usage reporting

Examples:
  acwr run gps_week.csv wellness.xlsx   # Full pipeline, then chat
  acwr upload gps_week.csv              # Upload only, prints a session id
  acwr chat <session-id>                # Chat about an earlier session
  acwr results <session-id>             # Show the report again
"#)]
struct Cli {
    /// Agent backend URL (overrides the config file)
    #[arg(long, env = "ACWR_SERVER_URL")]
    server: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files, process them, and show the report
    Run {
        /// Workload files to analyze (CSV or Excel)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Poll the status endpoint instead of trusting the inline response
        #[arg(long)]
        poll: bool,

        /// Save the report markdown to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Skip the interactive chat after processing
        #[arg(long)]
        no_chat: bool,
    },

    /// Upload files without starting processing
    Upload {
        /// Workload files to upload (CSV or Excel)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Start processing for an uploaded session
    Process {
        /// Session id from a previous upload
        session: String,
    },

    /// Show processing status for a session
    Status {
        /// Session id
        session: String,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Show the final results for a session
    Results {
        /// Session id
        session: String,

        /// Save the report markdown to this path
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Chat about a processed session
    Chat {
        /// Session id
        session: String,
    },

    /// Download a generated file from a session
    Download {
        /// Session id
        session: String,

        /// File name as reported in the results or artifacts list
        file: String,

        /// Write to this path instead of the downloads directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show token usage statistics
    Tokens {
        /// Limit to one session
        #[arg(long)]
        session: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Delete a session and its files from the backend
    Delete {
        /// Session id
        session: String,
    },

    /// Check whether the agent backend is reachable
    Health,

    /// Configuration management
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set a configuration value (key=value)
        #[arg(long)]
        set: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("acwr_cli={},warn", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config = config::Config::load()?;

    // Flag and environment beat the config file for the backend URL
    let server_url = cli
        .server
        .clone()
        .unwrap_or_else(|| config.server.url.clone());
    let client = AgentClient::with_url(&server_url);

    // Handle subcommands or start the chat REPL
    match cli.command {
        Some(Commands::Run {
            files,
            poll,
            report,
            no_chat,
        }) => {
            commands::run(&client, &config, &files, poll, report.as_deref(), no_chat).await?;
        }
        Some(Commands::Upload { files }) => {
            commands::upload(&client, &files).await?;
        }
        Some(Commands::Process { session }) => {
            commands::process(&client, &session).await?;
        }
        Some(Commands::Status { session, json }) => {
            commands::status(&client, &session, json).await?;
        }
        Some(Commands::Results {
            session,
            save,
            json,
        }) => {
            commands::results(&client, &config, &session, save.as_deref(), json).await?;
        }
        Some(Commands::Chat { session }) => {
            let mut repl = repl::AcwrRepl::new(client, config, Some(session))?;
            repl.run().await?;
        }
        Some(Commands::Download {
            session,
            file,
            output,
        }) => {
            commands::download(&client, &config, &session, &file, output.as_deref()).await?;
        }
        Some(Commands::Tokens { session, json }) => {
            commands::tokens(&client, session.as_deref(), json).await?;
        }
        Some(Commands::Delete { session }) => {
            commands::delete(&client, &session).await?;
        }
        Some(Commands::Health) => {
            commands::health(&client).await?;
        }
        Some(Commands::Config { show, set }) => {
            if show {
                commands::show_config(&config)?;
            } else if let Some(kv) = set {
                commands::set_config(&kv)?;
            } else {
                commands::show_config(&config)?;
            }
        }
        None => {
            let mut repl = repl::AcwrRepl::new(client, config, None)?;
            repl.run().await?;
        }
    }

    Ok(())
}
