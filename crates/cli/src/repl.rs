//! Interactive chat REPL
//!
//! Provides the interactive terminal experience for asking follow-up
//! questions about a processed session.

use anyhow::Result;
use colored::Colorize;
use rustyline::{error::ReadlineError, history::DefaultHistory, Editor};

use agent_client::AgentClient;
use sessions::{ChatSession, MessageRole, SendOutcome};

use crate::{
    config::Config,
    output::{short_id, OutputHandler},
};

/// Interactive REPL bound to one chat session
pub struct AcwrRepl {
    client: AgentClient,
    chat: ChatSession<AgentClient>,
    config: Config,
    output: OutputHandler,
    editor: Editor<(), DefaultHistory>,
}

impl AcwrRepl {
    pub fn new(client: AgentClient, config: Config, session_id: Option<String>) -> Result<Self> {
        let output = OutputHandler::new(
            config.display.show_status_bar,
            config.display.markdown_rendering,
        );
        let editor = Editor::new()?;

        let chat = match session_id {
            Some(id) => ChatSession::for_session(client.clone(), id),
            None => ChatSession::new(client.clone()),
        };

        Ok(Self {
            client,
            chat,
            config,
            output,
            editor,
        })
    }

    /// Run the interactive REPL
    pub async fn run(&mut self) -> Result<()> {
        // Pull any earlier conversation for an attached session.
        if self.chat.session_id().await.is_some() {
            self.restore_history().await;
        }

        let session_id = self.chat.session_id().await;
        self.output.print_banner(session_id.as_deref());

        loop {
            let prompt = self.build_prompt().await;

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();

                    if input.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_command(input).await {
                            Ok(should_exit) => {
                                if should_exit {
                                    break;
                                }
                            }
                            Err(e) => {
                                self.output.print_error(&format!("Command error: {}", e));
                            }
                        }
                    } else if let Err(e) = self.process_input(input).await {
                        self.output.print_error(&format!("Error: {}", e));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!();
                    self.output.print_info("Use /exit to quit.");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(e) => {
                    self.output.print_error(&format!("Input error: {}", e));
                    break;
                }
            }
        }

        Ok(())
    }

    async fn restore_history(&self) {
        if self.chat.hydrate_history().await {
            let count = self.chat.message_count().await;
            if count > 0 {
                self.output
                    .print_info(&format!("Restored {} earlier message(s).", count));
            }
        } else if let Some(error) = self.chat.error().await {
            self.output.print_warning(&error);
        }
    }

    /// Build the prompt string
    async fn build_prompt(&self) -> String {
        let session_part = match self.chat.session_id().await {
            Some(id) => short_id(&id).bright_cyan().to_string(),
            None => "no session".dimmed().to_string(),
        };

        format!(
            "\n{} [{}] {} ",
            "acwr".bright_green().bold(),
            session_part,
            ">".bright_green()
        )
    }

    /// Handle slash commands
    async fn handle_command(&mut self, input: &str) -> Result<bool> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let command = parts.first().unwrap_or(&"");

        match *command {
            "/exit" | "/quit" | "/q" => {
                return Ok(true);
            }

            "/help" | "/h" | "/?" => {
                self.print_help();
            }

            "/session" => {
                self.handle_session_command(&parts[1..]).await;
            }

            "/history" => {
                self.output.print_history(&self.chat.messages().await);
            }

            "/artifacts" => {
                self.output.print_artifacts(&self.chat.artifacts().await);
            }

            "/results" => {
                self.handle_results().await;
            }

            "/download" => {
                self.handle_download(&parts[1..]).await;
            }

            "/clear" => {
                self.handle_clear().await;
            }

            _ => {
                self.output.print_error(&format!(
                    "Unknown command: {}. Use /help for available commands.",
                    command
                ));
            }
        }

        Ok(false)
    }

    /// Print help information
    fn print_help(&self) {
        println!();
        println!("{}", "ACWR Chat Commands".bright_white().bold());
        println!("{}", "─".repeat(50).dimmed());
        println!();

        println!("{}", "Session Commands:".bright_cyan());
        println!(
            "  {}          Show the attached session",
            "/session".bright_yellow()
        );
        println!(
            "  {}     Attach to another session",
            "/session <id>".bright_yellow()
        );
        println!(
            "  {}          Show the analysis report again",
            "/results".bright_yellow()
        );
        println!();

        println!("{}", "Conversation Commands:".bright_cyan());
        println!(
            "  {}          Show the conversation so far",
            "/history".bright_yellow()
        );
        println!(
            "  {}            Clear the conversation history",
            "/clear".bright_yellow()
        );
        println!();

        println!("{}", "Artifact Commands:".bright_cyan());
        println!(
            "  {}        List files the agent produced",
            "/artifacts".bright_yellow()
        );
        println!(
            "  {} Save an artifact locally",
            "/download <n|name>".bright_yellow()
        );
        println!();

        println!("{}", "Other Commands:".bright_cyan());
        println!("  {}             Show this help", "/help".bright_yellow());
        println!("  {}             Exit the chat", "/exit".bright_yellow());
        println!();
    }

    /// Handle /session with or without an id argument
    async fn handle_session_command(&mut self, args: &[&str]) {
        if args.is_empty() {
            match self.chat.session_id().await {
                Some(id) => {
                    println!();
                    println!("  {} {}", "Session:".dimmed(), id.bright_cyan());
                    println!(
                        "  {} {}",
                        "Messages:".dimmed(),
                        self.chat.message_count().await
                    );
                    println!(
                        "  {} {}",
                        "Artifacts:".dimmed(),
                        self.chat.artifacts().await.len()
                    );
                    if let Some(error) = self.chat.error().await {
                        println!("  {} {}", "Last error:".dimmed(), error.bright_red());
                    }
                    println!();
                }
                None => {
                    self.output
                        .print_info("No session attached. Use /session <id> to attach one.");
                }
            }
            return;
        }

        let id = args[0];
        if self.chat.set_session(id).await {
            self.output
                .print_success(&format!("Switched to session {}", id));
            self.restore_history().await;
        } else {
            self.output.print_info("Already attached to that session.");
        }
    }

    /// Fetch and print the final results for the attached session
    async fn handle_results(&self) {
        let Some(session_id) = self.chat.session_id().await else {
            self.output
                .print_error("No session attached. Use /session <id> first.");
            return;
        };

        match self.client.get_results(&session_id).await {
            Ok(results) => {
                self.output.print_results(&results);
                if let Some(error) = &results.error_message {
                    self.output.print_warning(error);
                }
            }
            Err(e) => {
                self.output
                    .print_error(&format!("Failed to fetch results: {}", e));
            }
        }
    }

    /// Download one collected artifact by index or reference
    async fn handle_download(&self, args: &[&str]) {
        if args.is_empty() {
            self.output.print_error("Usage: /download <number|name>");
            return;
        }

        let artifacts = self.chat.artifacts().await;
        if artifacts.is_empty() {
            self.output.print_info("No artifacts collected yet.");
            return;
        }

        // Accept a 1-based index from /artifacts or a reference substring.
        let reference = match args[0].parse::<usize>() {
            Ok(n) if n >= 1 && n <= artifacts.len() => artifacts[n - 1].clone(),
            Ok(_) => {
                self.output.print_error(&format!(
                    "Artifact number out of range (1..{}).",
                    artifacts.len()
                ));
                return;
            }
            Err(_) => match artifacts.iter().find(|a| a.contains(args[0])) {
                Some(found) => found.clone(),
                None => {
                    self.output
                        .print_error(&format!("No artifact matching '{}'.", args[0]));
                    return;
                }
            },
        };

        match self.client.download_path(&reference).await {
            Ok(bytes) => {
                let name = reference.rsplit('/').next().unwrap_or("artifact");
                let path = match &self.config.downloads.dir {
                    Some(dir) => std::path::Path::new(dir).join(name),
                    None => std::path::PathBuf::from(name),
                };
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        if let Err(e) = std::fs::create_dir_all(parent) {
                            self.output
                                .print_error(&format!("Failed to create {}: {}", parent.display(), e));
                            return;
                        }
                    }
                }
                match std::fs::write(&path, &bytes) {
                    Ok(()) => {
                        self.output.print_success(&format!(
                            "Saved {} ({} bytes) to {}",
                            name,
                            bytes.len(),
                            path.display()
                        ));
                    }
                    Err(e) => {
                        self.output
                            .print_error(&format!("Failed to write {}: {}", path.display(), e));
                    }
                }
            }
            Err(e) => {
                self.output.print_error(&format!("Download failed: {}", e));
            }
        }
    }

    /// Clear the conversation history on the backend and locally
    async fn handle_clear(&self) {
        if self.chat.session_id().await.is_none() {
            self.output.print_info("No session attached.");
            return;
        }

        if self.chat.clear_history().await {
            self.output.print_success("Conversation history cleared.");
        } else if let Some(error) = self.chat.error().await {
            self.output.print_error(&error);
        } else {
            self.output.print_error("Failed to clear history.");
        }
    }

    /// Send user input as a chat message
    async fn process_input(&mut self, input: &str) -> Result<()> {
        match self.chat.send_message(input).await {
            SendOutcome::Delivered => {
                let messages = self.chat.messages().await;
                if let Some(reply) = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == MessageRole::Assistant)
                {
                    self.output.print_response(&reply.content);
                    if !reply.tool_calls.is_empty() {
                        println!(
                            "  {}",
                            format!("({} tool call(s))", reply.tool_calls.len()).dimmed()
                        );
                    }
                }
                if let Some(error) = self.chat.error().await {
                    self.output.print_warning(&error);
                }

                if let Some(session_id) = self.chat.session_id().await {
                    self.output.print_status_bar(
                        &session_id,
                        messages.len(),
                        self.chat.artifacts().await.len(),
                    );
                }
            }
            SendOutcome::Failed => {
                if let Some(error) = self.chat.error().await {
                    self.output.print_error(&error);
                }
                self.output.print_info(
                    "Note: Make sure the agent backend is running on the configured URL.",
                );
            }
            SendOutcome::Busy => {
                self.output
                    .print_warning("Still waiting for the previous reply.");
            }
            SendOutcome::NoSession => {
                self.output
                    .print_error("No session attached. Use /session <id> first.");
            }
            SendOutcome::Empty | SendOutcome::Discarded => {}
        }

        Ok(())
    }
}
