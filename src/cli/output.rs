//! Output formatting module for Awsible
//!
//! Provides colored status lines and JSON result printing.

use colored::Colorize;
use serde::Serialize;

/// Outcome of one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Completed with no changes
    Ok,
    /// Completed with changes made
    Changed,
    /// Failed
    Failed,
}

impl TaskStatus {
    /// Get the colored string representation
    pub fn colored_string(&self) -> String {
        match self {
            TaskStatus::Ok => "ok".green().to_string(),
            TaskStatus::Changed => "changed".yellow().to_string(),
            TaskStatus::Failed => "failed".red().bold().to_string(),
        }
    }

    /// Get the plain string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Ok => "ok",
            TaskStatus::Changed => "changed",
            TaskStatus::Failed => "failed",
        }
    }
}

/// Terminal output for subcommands
pub struct OutputFormatter {
    use_color: bool,
    verbosity: u8,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var("NO_COLOR").is_err();
        Self {
            use_color,
            verbosity,
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.use_color {
            println!("\n{}", title.cyan().bold());
            println!("{}", "-".repeat(title.len()).cyan());
        } else {
            println!("\n{}", title);
            println!("{}", "-".repeat(title.len()));
        }
    }

    /// Print `[status] subject: message`
    pub fn status(&self, status: TaskStatus, subject: &str, message: &str) {
        let label = if self.use_color {
            status.colored_string()
        } else {
            status.as_str().to_string()
        };
        if message.is_empty() {
            println!("{}: [{}]", label, subject);
        } else {
            println!("{}: [{}] {}", label, subject, message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print an info message (respects verbosity)
    pub fn info(&self, message: &str) {
        if self.verbosity < 1 {
            return;
        }
        if self.use_color {
            println!("{} {}", "INFO:".blue(), message);
        } else {
            println!("INFO: {}", message);
        }
    }

    /// Print a value as pretty JSON on stdout
    pub fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
