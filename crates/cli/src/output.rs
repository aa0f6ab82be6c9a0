//! Output formatting and terminal rendering
//!
//! Handles rich terminal output with colors, markdown rendering, and status bars.

use agent_client::{ResultsResponse, TokenStats};
use colored::Colorize;
use sessions::{ChatMessage, MessageRole};

/// Format a number with thousand separators
fn format_num(n: i64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result
}

/// Output handler for terminal display
pub struct OutputHandler {
    pub show_status_bar: bool,
    pub markdown_enabled: bool,
}

impl OutputHandler {
    pub fn new(show_status_bar: bool, markdown_enabled: bool) -> Self {
        Self {
            show_status_bar,
            markdown_enabled,
        }
    }

    /// Print the welcome banner
    pub fn print_banner(&self, session_id: Option<&str>) {
        println!();
        println!(
            "{}",
            "╔═══════════════════════════════════════════════════════════════╗"
                .bright_cyan()
        );
        println!(
            "{}",
            "║             ACWR Workload Analysis Session                    ║"
                .bright_cyan()
        );
        println!(
            "{}",
            "╠═══════════════════════════════════════════════════════════════╣"
                .bright_cyan()
        );

        match session_id {
            Some(id) => {
                println!(
                    "{}  Session: {:<50}{}",
                    "║".bright_cyan(),
                    short_id(id).bright_white(),
                    "║".bright_cyan()
                );
            }
            None => {
                println!(
                    "{}  Session: {:<50}{}",
                    "║".bright_cyan(),
                    "none (attach with /session <id>)".dimmed(),
                    "║".bright_cyan()
                );
            }
        }
        println!(
            "{}  Started: {:<50}{}",
            "║".bright_cyan(),
            chrono::Local::now()
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            "║".bright_cyan()
        );
        println!(
            "{}",
            "╠═══════════════════════════════════════════════════════════════╣"
                .bright_cyan()
        );
        println!(
            "{}  {}                     {}",
            "║".bright_cyan(),
            "Ask about your workload data or use /help".dimmed(),
            "║".bright_cyan()
        );
        println!(
            "{}",
            "╚═══════════════════════════════════════════════════════════════╝"
                .bright_cyan()
        );
        println!();
    }

    /// Print a section header
    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", format!("▶ {}", text).bright_yellow().bold());
        println!("{}", "─".repeat(60).dimmed());
    }

    /// Print a success message
    pub fn print_success(&self, text: &str) {
        println!("{} {}", "✓".bright_green(), text.bright_white());
    }

    /// Print an error message
    pub fn print_error(&self, text: &str) {
        println!("{} {}", "✗".bright_red(), text.bright_red());
    }

    /// Print a warning message
    pub fn print_warning(&self, text: &str) {
        println!("{} {}", "⚠".bright_yellow(), text.yellow());
    }

    /// Print an info message
    pub fn print_info(&self, text: &str) {
        println!("{} {}", "ℹ".bright_blue(), text);
    }

    /// Print agent response (with optional markdown rendering)
    pub fn print_response(&self, content: &str) {
        println!();

        if self.markdown_enabled {
            for line in content.lines() {
                let rendered = self.render_markdown_line(line);
                println!("{}", rendered);
            }
        } else {
            println!("{}", content);
        }
    }

    /// Print the session status bar
    pub fn print_status_bar(&self, session_id: &str, messages: usize, artifacts: usize) {
        if !self.show_status_bar {
            return;
        }

        println!();
        println!(
            "{}",
            "───────────────────────────────────────────────────────────────".dimmed()
        );
        println!(
            "  {} {} | {} {} | {} {}",
            "Session:".dimmed(),
            short_id(session_id).bright_white(),
            "Messages:".dimmed(),
            messages.to_string().bright_white(),
            "Artifacts:".dimmed(),
            artifacts.to_string().bright_cyan()
        );
    }

    /// Print the collected artifact references, oldest first
    pub fn print_artifacts(&self, artifacts: &[String]) {
        if artifacts.is_empty() {
            self.print_info("No artifacts collected yet.");
            return;
        }

        println!();
        for (i, reference) in artifacts.iter().enumerate() {
            println!(
                "  {} {}",
                format!("[{}]", i + 1).bright_cyan(),
                reference.bright_white()
            );
        }
        println!();
    }

    /// Print the chat transcript
    pub fn print_history(&self, messages: &[ChatMessage]) {
        if messages.is_empty() {
            self.print_info("No messages in this session yet.");
            return;
        }

        println!();
        for message in messages {
            let speaker = match message.role {
                MessageRole::User => "You".bright_green().bold(),
                MessageRole::Assistant => "Agent".bright_cyan().bold(),
            };
            println!("{}", speaker);
            for line in message.content.lines() {
                println!("  {}", line);
            }
            if !message.tool_calls.is_empty() {
                println!(
                    "  {}",
                    format!("({} tool call(s))", message.tool_calls.len()).dimmed()
                );
            }
            println!();
        }
    }

    /// Print the final results of a processing run
    pub fn print_results(&self, results: &ResultsResponse) {
        self.print_header("Analysis Results");

        if let Some(report) = &results.report_markdown {
            self.print_response(report);
        } else {
            self.print_info("No report was generated for this session.");
        }

        if !results.visualization_files.is_empty() {
            self.print_header("Visualizations");
            self.print_artifacts(&results.visualization_files);
        }

        if let Some(csv) = &results.processed_csv_path {
            println!("  {} {}", "Processed CSV:".dimmed(), csv.bright_white());
        }
        if let Some(excel) = &results.processed_excel_path {
            println!("  {} {}", "Processed Excel:".dimmed(), excel.bright_white());
        }
        if let Some(total) = results.token_usage.get("total_tokens") {
            println!(
                "  {} {}",
                "Tokens used:".dimmed(),
                format_num(*total).bright_cyan()
            );
        }
        println!();
    }

    /// Print token usage statistics
    pub fn print_token_stats(&self, stats: &TokenStats) {
        self.print_header(&format!("Token Usage: {}", stats.tracker_name));

        println!();
        println!(
            "  {} {}",
            "Prompt tokens:".dimmed(),
            format_num(stats.total_prompt_tokens).bright_white()
        );
        println!(
            "  {} {}",
            "Completion tokens:".dimmed(),
            format_num(stats.total_completion_tokens).bright_white()
        );
        if stats.total_cached_tokens > 0 {
            println!(
                "  {} {}",
                "Cached tokens:".dimmed(),
                format_num(stats.total_cached_tokens).bright_white()
            );
        }
        if stats.total_reasoning_tokens > 0 {
            println!(
                "  {} {}",
                "Reasoning tokens:".dimmed(),
                format_num(stats.total_reasoning_tokens).bright_white()
            );
        }
        println!(
            "  {} {}",
            "Total tokens:".dimmed(),
            format_num(stats.total_tokens).bright_cyan()
        );
        println!(
            "  {} {}",
            "API calls:".dimmed(),
            format_num(stats.call_count).bright_white()
        );
        if let Some(updated) = &stats.last_updated_at {
            println!("  {} {}", "Last updated:".dimmed(), updated.dimmed());
        }

        if !stats.by_model.is_empty() {
            println!();
            println!(
                "{}",
                format!(
                    "  {:<32} {:>12} {:>14} {:>8}",
                    "Model", "Prompt", "Completion", "Calls"
                )
                .bright_white()
                .bold()
            );
            println!("  {}", "─".repeat(70).dimmed());

            let mut models: Vec<_> = stats.by_model.iter().collect();
            models.sort_by(|a, b| a.0.cmp(b.0));
            for (model, usage) in models {
                println!(
                    "  {:<32} {:>12} {:>14} {:>8}",
                    model.bright_white(),
                    format_num(usage.prompt_tokens),
                    format_num(usage.completion_tokens),
                    usage.call_count
                );
            }
        }
        println!();
    }

    fn render_markdown_line(&self, line: &str) -> String {
        // Headers
        if line.starts_with("### ") {
            return format!("{}", line[4..].bright_yellow().bold());
        }
        if line.starts_with("## ") {
            return format!("{}", line[3..].bright_cyan().bold());
        }
        if line.starts_with("# ") {
            return format!("{}", line[2..].bright_white().bold().underline());
        }

        // Code blocks
        if line.starts_with("```") {
            return format!("{}", line.dimmed());
        }

        // Inline code
        let mut result = line.to_string();
        while let Some(start) = result.find('`') {
            if let Some(end) = result[start + 1..].find('`') {
                let code = &result[start + 1..start + 1 + end];
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    code.bright_green(),
                    &result[start + 2 + end..]
                );
            } else {
                break;
            }
        }

        // Bold
        while let Some(start) = result.find("**") {
            if let Some(end) = result[start + 2..].find("**") {
                let bold_text = &result[start + 2..start + 2 + end];
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    bold_text.bold(),
                    &result[start + 4 + end..]
                );
            } else {
                break;
            }
        }

        // Lists
        if line.starts_with("- ") || line.starts_with("* ") {
            return format!("  {} {}", "•".bright_cyan(), &line[2..]);
        }

        result
    }
}

/// Shorten a session id for display, truncating on a character boundary
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(12) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_truncates_long_ids() {
        assert_eq!(short_id("20250825_143022_report"), "20250825_143");
    }

    #[test]
    fn test_short_id_keeps_short_ids_whole() {
        assert_eq!(short_id("abc123"), "abc123");
        assert_eq!(short_id(""), "");
    }

    #[test]
    fn test_short_id_counts_characters_not_bytes() {
        // 12 characters but 13 bytes; byte slicing would split the accent.
        assert_eq!(short_id("01234567890é"), "01234567890é");
        assert_eq!(short_id("ééééééééééééé"), "éééééééééééé");
    }

    #[test]
    fn test_format_num_groups_thousands() {
        assert_eq!(format_num(0), "0");
        assert_eq!(format_num(999), "999");
        assert_eq!(format_num(1234567), "1,234,567");
    }
}
