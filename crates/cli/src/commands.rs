//! CLI subcommand handlers
//!
//! Handles non-interactive commands like upload, process, results, and
//! the full run pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::debug;

use agent_client::AgentClient;
use sessions::{SessionWorkflow, Stage, WorkflowConfig, WorkflowEvent};

use crate::{
    config::Config,
    output::{short_id, OutputHandler},
    repl::AcwrRepl,
};

/// Read files into (name, bytes) pairs for upload
fn read_files(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid file name: {}", path.display()))?
            .to_string();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        debug!("Read {} ({} bytes)", name, bytes.len());
        files.push((name, bytes));
    }
    Ok(files)
}

/// Build a workflow config from file settings plus the --poll flag
fn workflow_config(config: &Config, poll: bool) -> WorkflowConfig {
    let base = if poll || config.workflow.poll_for_completion {
        WorkflowConfig::polling()
    } else {
        WorkflowConfig::synchronous()
    };
    base.with_poll_interval_ms(config.workflow.poll_interval_ms)
        .with_poll_max_attempts(config.workflow.poll_max_attempts)
}

/// Upload files, run processing to a terminal stage, and show results
pub async fn run(
    client: &AgentClient,
    config: &Config,
    files: &[PathBuf],
    poll: bool,
    report_path: Option<&Path>,
    no_chat: bool,
) -> Result<()> {
    let output = OutputHandler::new(
        config.display.show_status_bar,
        config.display.markdown_rendering,
    );
    let files = read_files(files)?;

    let (sender, mut receiver) = mpsc::channel(32);
    let printer = tokio::spawn(async move {
        let output = OutputHandler::new(false, false);
        while let Some(event) = receiver.recv().await {
            match event {
                WorkflowEvent::Started { file_count } => {
                    output.print_info(&format!("Uploading {} file(s)...", file_count));
                }
                WorkflowEvent::SessionCreated { session_id } => {
                    output.print_info(&format!("Session {}", session_id));
                }
                WorkflowEvent::StageChanged {
                    stage: Stage::Uploaded,
                } => {
                    output.print_success("Upload complete");
                }
                WorkflowEvent::StageChanged {
                    stage: Stage::Processing,
                } => {
                    output.print_info("Processing workload data, this can take a few minutes...");
                }
                WorkflowEvent::StatusPolled { attempt, status } => {
                    println!(
                        "  {}",
                        format!("still {} (check {})", status, attempt).dimmed()
                    );
                }
                WorkflowEvent::Completed { .. } => {
                    output.print_success("Processing complete");
                }
                WorkflowEvent::Failed { error } => {
                    output.print_error(&error);
                }
                WorkflowEvent::StageChanged { .. } => {}
            }
        }
    });

    let workflow =
        SessionWorkflow::new(client.clone(), workflow_config(config, poll)).with_event_sender(sender);

    let stage = workflow.start(files).await;
    let session_id = workflow.session_id().await;
    let results = workflow.results().await;
    let error = workflow.error().await;

    // Dropping the workflow closes the channel so the printer can drain.
    drop(workflow);
    let _ = printer.await;

    match stage {
        Stage::Completed => {
            if let Some(results) = &results {
                output.print_results(results);
                if let Some(path) = report_path {
                    if let Some(report) = &results.report_markdown {
                        std::fs::write(path, report)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        output.print_success(&format!("Report saved to {}", path.display()));
                    }
                }
            } else if let Some(error) = &error {
                output.print_warning(error);
            }

            if !no_chat {
                if let Some(session_id) = session_id {
                    output.print_info("Entering chat. Ask about the analysis or /exit to quit.");
                    let mut repl = AcwrRepl::new(client.clone(), config.clone(), Some(session_id))?;
                    repl.run().await?;
                }
            }
        }
        stage => {
            output.print_error(&format!("Run ended at stage '{}'", stage));
        }
    }

    Ok(())
}

/// Upload files without starting processing
pub async fn upload(client: &AgentClient, files: &[PathBuf]) -> Result<()> {
    let output = OutputHandler::new(false, false);
    let files = read_files(files)?;

    match client.upload_files(files).await {
        Ok(response) => {
            output.print_success(&response.message);
            for name in &response.uploaded_files {
                println!("  {}", name.bright_white());
            }
            println!();
            println!(
                "  {} {}",
                "Session:".dimmed(),
                response.session_id.bright_cyan()
            );
            println!("  {} acwr process {}", "Next:".dimmed(), response.session_id);
        }
        Err(e) => output.print_error(&format!("Upload failed: {}", e)),
    }

    Ok(())
}

/// Start processing for an uploaded session
pub async fn process(client: &AgentClient, session_id: &str) -> Result<()> {
    let output = OutputHandler::new(false, false);
    output.print_info("Processing workload data, this can take a few minutes...");

    match client.process(session_id).await {
        Ok(response) => match response.status.as_str() {
            "completed" => {
                output.print_success(&response.message);
                output.print_info(&format!("View the report with: acwr results {}", session_id));
            }
            "failed" => output.print_error(&response.message),
            other => output.print_warning(&format!(
                "Processing reported status '{}': {}",
                other, response.message
            )),
        },
        Err(e) => output.print_error(&format!("Processing failed: {}", e)),
    }

    Ok(())
}

/// Show processing status for a session
pub async fn status(client: &AgentClient, session_id: &str, json: bool) -> Result<()> {
    let output = OutputHandler::new(false, false);

    match client.get_status(session_id).await {
        Ok(response) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            output.print_header(&format!("Session {}", short_id(session_id)));

            let status_colored = match response.status.as_str() {
                "completed" => response.status.bright_green(),
                "failed" => response.status.bright_red(),
                "processing" => response.status.bright_yellow(),
                _ => response.status.normal(),
            };
            println!();
            println!("  {} {}", "Status:".dimmed(), status_colored);
            if let Some(stage) = &response.current_stage {
                println!("  {} {}", "Stage:".dimmed(), stage);
            }
            if let Some(error) = &response.error_message {
                println!("  {} {}", "Error:".dimmed(), error.bright_red());
            }
            println!();
        }
        Err(e) => output.print_error(&format!("Status check failed: {}", e)),
    }

    Ok(())
}

/// Fetch and display final results
pub async fn results(
    client: &AgentClient,
    config: &Config,
    session_id: &str,
    save: Option<&Path>,
    json: bool,
) -> Result<()> {
    let output = OutputHandler::new(false, config.display.markdown_rendering);

    match client.get_results(session_id).await {
        Ok(results) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            output.print_results(&results);
            if let Some(error) = &results.error_message {
                output.print_warning(error);
            }

            if let Some(path) = save {
                match &results.report_markdown {
                    Some(report) => {
                        std::fs::write(path, report)
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                        output.print_success(&format!("Report saved to {}", path.display()));
                    }
                    None => output.print_warning("No report to save."),
                }
            }
        }
        Err(e) => output.print_error(&format!("Failed to fetch results: {}", e)),
    }

    Ok(())
}

/// Download one artifact from a session
pub async fn download(
    client: &AgentClient,
    config: &Config,
    session_id: &str,
    file: &str,
    output_path: Option<&Path>,
) -> Result<()> {
    let output = OutputHandler::new(false, false);

    match client.download_artifact(session_id, file).await {
        Ok(bytes) => {
            let path = resolve_download_path(config, file, output_path);
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.print_success(&format!(
                "Saved {} ({} bytes) to {}",
                file,
                bytes.len(),
                path.display()
            ));
        }
        Err(e) => output.print_error(&format!("Download failed: {}", e)),
    }

    Ok(())
}

/// Pick the local path for a downloaded artifact
fn resolve_download_path(config: &Config, file: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let name = file.rsplit('/').next().unwrap_or(file);
    match &config.downloads.dir {
        Some(dir) => Path::new(dir).join(name),
        None => PathBuf::from(name),
    }
}

/// Show token usage statistics, globally or for one session
pub async fn tokens(client: &AgentClient, session_id: Option<&str>, json: bool) -> Result<()> {
    let output = OutputHandler::new(false, false);

    let stats = match session_id {
        Some(id) => client.get_session_token_stats(id).await,
        None => client.get_token_stats().await,
    };

    match stats {
        Ok(stats) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                output.print_token_stats(&stats);
            }
        }
        Err(e) => output.print_error(&format!("Failed to fetch token stats: {}", e)),
    }

    Ok(())
}

/// Delete a session and its files from the backend
pub async fn delete(client: &AgentClient, session_id: &str) -> Result<()> {
    let output = OutputHandler::new(false, false);

    match client.delete_session(session_id).await {
        Ok(response) => output.print_success(&response.message),
        Err(e) => output.print_error(&format!("Failed to delete session: {}", e)),
    }

    Ok(())
}

/// Check whether the agent backend is reachable
pub async fn health(client: &AgentClient) -> Result<()> {
    let output = OutputHandler::new(false, false);

    output.print_header("Agent Backend");

    if client.is_running().await {
        output.print_success(&format!("Connected to {}", client.base_url()));
    } else {
        output.print_error(&format!("Not reachable at {}", client.base_url()));
        output.print_info("Start the backend or point the CLI at it with --server.");
    }

    println!();
    println!("  {} {}", "Version:".dimmed(), env!("CARGO_PKG_VERSION"));
    println!(
        "  {} {}",
        "Config:".dimmed(),
        Config::config_path().display()
    );

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    let output = OutputHandler::new(false, false);

    output.print_header("Configuration");

    println!();
    println!("  {}", "[server]".bright_cyan());
    println!("    {} = \"{}\"", "url".dimmed(), config.server.url);

    println!();
    println!("  {}", "[workflow]".bright_cyan());
    println!(
        "    {} = {}",
        "poll_for_completion".dimmed(),
        config.workflow.poll_for_completion
    );
    println!(
        "    {} = {}",
        "poll_interval_ms".dimmed(),
        config.workflow.poll_interval_ms
    );
    println!(
        "    {} = {}",
        "poll_max_attempts".dimmed(),
        config.workflow.poll_max_attempts
    );

    println!();
    println!("  {}", "[display]".bright_cyan());
    println!(
        "    {} = {}",
        "markdown_rendering".dimmed(),
        config.display.markdown_rendering
    );
    println!(
        "    {} = {}",
        "show_status_bar".dimmed(),
        config.display.show_status_bar
    );

    println!();
    println!("  {}", "[downloads]".bright_cyan());
    println!(
        "    {} = {}",
        "dir".dimmed(),
        config.downloads.dir.as_deref().unwrap_or("not set")
    );

    println!();
    println!(
        "  {} {}",
        "Config file:".dimmed(),
        Config::config_path().display()
    );

    Ok(())
}

/// Set a configuration value
pub fn set_config(kv: &str) -> Result<()> {
    let output = OutputHandler::new(false, false);

    let parts: Vec<&str> = kv.splitn(2, '=').collect();
    if parts.len() != 2 {
        output.print_error("Invalid format. Use: key=value");
        return Ok(());
    }

    let key = parts[0].trim();
    let value = parts[1].trim().trim_matches('"');

    let mut config = Config::load()?;
    match config.set(key, value) {
        Ok(()) => {
            config.save()?;
            output.print_success(&format!("Set {} = \"{}\"", key, value));
        }
        Err(e) => output.print_error(&format!("Failed to set config: {}", e)),
    }

    Ok(())
}
