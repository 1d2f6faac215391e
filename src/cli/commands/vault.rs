//! Vault command - re-key vaulted YAML files
//!
//! This module implements the `vault` subcommand.

use super::CommandContext;
use crate::cli::output::TaskStatus;
use anyhow::{bail, Context, Result};
use awsible::vault::{Rekeyer, Vault};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arguments for the vault command
#[derive(Parser, Debug, Clone)]
pub struct VaultArgs {
    #[command(subcommand)]
    pub action: VaultAction,
}

/// Vault subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum VaultAction {
    /// Re-encrypt every vaulted value in a YAML file with a new password
    Rekey(RekeyArgs),

    /// Encrypt a string for pasting into a YAML file
    EncryptString(EncryptStringArgs),
}

/// Arguments for rekey action
#[derive(Parser, Debug, Clone)]
pub struct RekeyArgs {
    /// YAML file holding vaulted values
    pub input: PathBuf,

    /// Output file (default: <input>.new)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Current vault password file
    #[arg(long, alias = "old-password-file")]
    pub vault_password_file: Option<PathBuf>,

    /// New vault password file
    #[arg(long, alias = "new-password-file")]
    pub new_vault_password_file: Option<PathBuf>,
}

/// Arguments for encrypt-string action
#[derive(Parser, Debug, Clone)]
pub struct EncryptStringArgs {
    /// The string to encrypt
    pub string: String,

    /// Variable name to print the value under
    #[arg(short, long)]
    pub name: Option<String>,

    /// Vault password file
    #[arg(long)]
    pub vault_password_file: Option<PathBuf>,
}

/// Opens a vault from an explicit file, then the environment, then config.
fn open_vault(
    explicit: Option<&PathBuf>,
    env_password: &str,
    configured: Option<&PathBuf>,
    what: &str,
) -> Result<Vault> {
    if let Some(file) = explicit {
        return Vault::from_password_file(file)
            .with_context(|| format!("Failed to read {} password file", what));
    }
    if let Ok(password) = std::env::var(env_password) {
        return Ok(Vault::new(password));
    }
    if let Some(file) = configured {
        return Vault::from_password_file(file)
            .with_context(|| format!("Failed to read {} password file", what));
    }
    bail!(
        "No {} vault password given; use a password file option or set {}",
        what,
        env_password
    )
}

impl VaultArgs {
    /// Execute the vault command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        match &self.action {
            VaultAction::Rekey(args) => {
                let old = open_vault(
                    args.vault_password_file.as_ref(),
                    "AWSIBLE_VAULT_PASSWORD",
                    ctx.config.vault.password_file.as_ref(),
                    "current",
                )?;
                let new = open_vault(
                    args.new_vault_password_file.as_ref(),
                    "AWSIBLE_NEW_VAULT_PASSWORD",
                    ctx.config.vault.new_password_file.as_ref(),
                    "new",
                )?;

                let report = Rekeyer::new(old, new)
                    .rekey_file(&args.input, args.output.as_deref())
                    .with_context(|| format!("Failed to rekey {}", args.input.display()))?;

                let status = if report.rekeyed > 0 {
                    TaskStatus::Changed
                } else {
                    ctx.output.warning(&format!(
                        "No vaulted values found in {}",
                        args.input.display()
                    ));
                    TaskStatus::Ok
                };
                ctx.output.status(
                    status,
                    &report.output.display().to_string(),
                    &format!("{} values re-encrypted", report.rekeyed),
                );
                Ok(0)
            }

            VaultAction::EncryptString(args) => {
                let vault = open_vault(
                    args.vault_password_file.as_ref(),
                    "AWSIBLE_VAULT_PASSWORD",
                    ctx.config.vault.password_file.as_ref(),
                    "current",
                )?;
                let encrypted = vault.encrypt(&args.string)?;
                let indented: Vec<String> =
                    encrypted.lines().map(|l| format!("  {}", l)).collect();
                match &args.name {
                    Some(name) => println!("{}: !vault |\n{}", name, indented.join("\n")),
                    None => println!("!vault |\n{}", indented.join("\n")),
                }
                Ok(0)
            }
        }
    }
}
