//! CLI module for Awsible
//!
//! This module provides the command-line interface for Awsible,
//! including argument parsing, configuration loading, and subcommand handling.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Awsible - idempotent AWS modules and Ansible project helpers
#[derive(Parser, Debug, Clone)]
#[command(name = "awsible")]
#[command(author = "Awsible Contributors")]
#[command(version)]
#[command(about = "Idempotent AWS modules, KMS lookup, Galaxy role sync and vault re-keying", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "AWSIBLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parses the `[logging] format` config value. Unknown values mean text.
    pub fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an AWS module and print its JSON result
    #[cfg(feature = "aws")]
    Module(commands::module::ModuleArgs),

    /// Run a lookup plugin and print its values
    #[cfg(feature = "aws")]
    Lookup(commands::lookup::LookupArgs),

    /// Synchronize Galaxy roles with requirements.yml
    Galaxy(commands::galaxy::GalaxyArgs),

    /// Vault operations
    Vault(commands::vault::VaultArgs),
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
