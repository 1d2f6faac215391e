//! Subcommands module for Awsible CLI
//!
//! This module contains all the subcommand implementations.

pub mod galaxy;
#[cfg(feature = "aws")]
pub mod lookup;
#[cfg(feature = "aws")]
pub mod module;
pub mod vault;

use crate::cli::output::OutputFormatter;
use awsible::config::Config;

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let use_color = !cli.no_color && config.colors.enabled;
        let output = OutputFormatter::new(use_color, cli.verbosity());

        Self { config, output }
    }
}
