//! Galaxy command - keep installed roles in line with requirements.yml

use super::CommandContext;
use crate::cli::output::TaskStatus;
use anyhow::{Context, Result};
use awsible::galaxy::{Galaxy, GalaxySettings, SystemRunner};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the galaxy command
#[derive(Parser, Debug, Clone)]
pub struct GalaxyArgs {
    /// What to do
    #[arg(value_enum, default_value = "sync")]
    pub action: GalaxyAction,

    /// Requirements file (default: requirements.yml)
    #[arg(short = 'r', long)]
    pub requirements: Option<PathBuf>,

    /// Directory holding installed roles (default: roles)
    #[arg(short = 'p', long)]
    pub roles_path: Option<PathBuf>,
}

/// Galaxy actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GalaxyAction {
    /// Install missing roles and replace outdated ones
    Sync,
    /// Delete local role directories
    Delete,
    /// Bump pinned git role versions to the newest compatible tag
    Autoupdate,
}

impl GalaxyArgs {
    fn galaxy(&self, ctx: &CommandContext) -> Result<Galaxy> {
        let mut settings = GalaxySettings::from_config(&ctx.config.galaxy)?;
        if let Some(path) = &self.requirements {
            settings = settings.with_requirements_file(path);
        }
        if let Some(path) = &self.roles_path {
            settings = settings.with_roles_path(path);
        }
        Ok(Galaxy::new(settings, Arc::new(SystemRunner::new())))
    }

    /// Execute the galaxy command
    pub async fn execute(&self, ctx: &mut CommandContext) -> Result<i32> {
        let galaxy = self.galaxy(ctx)?;
        let requirements = galaxy.settings().requirements_file.display().to_string();

        match self.action {
            GalaxyAction::Sync => {
                ctx.output
                    .section(&format!("Syncing roles from {}", requirements));
                let report = galaxy
                    .sync()
                    .with_context(|| format!("Failed to sync roles from {}", requirements))?;

                for update in &report.updated {
                    ctx.output
                        .status(TaskStatus::Changed, &update.name, &update.to_string());
                }
                for failure in &report.failed {
                    ctx.output.status(
                        TaskStatus::Failed,
                        &failure.name,
                        &format!("exit {}: {}", failure.status, failure.stderr.trim()),
                    );
                }
                if report.updated.is_empty() && report.failed.is_empty() {
                    ctx.output.info("All roles are up to date");
                }

                Ok(if report.is_success() { 0 } else { 2 })
            }

            GalaxyAction::Delete => {
                let removed = galaxy.delete_local()?;
                for dir in &removed {
                    ctx.output
                        .status(TaskStatus::Changed, &dir.display().to_string(), "deleted");
                }
                ctx.output
                    .info(&format!("Deleted {} role directories", removed.len()));
                Ok(0)
            }

            GalaxyAction::Autoupdate => {
                let bumps = galaxy.autoupdate()?;
                for bump in &bumps {
                    ctx.output.status(
                        TaskStatus::Changed,
                        &bump.name,
                        &format!("{} => {}", bump.from, bump.to),
                    );
                }
                if bumps.is_empty() {
                    ctx.output.info("No newer compatible tags found");
                } else {
                    ctx.output.info(&format!("Updated {}", requirements));
                }
                Ok(0)
            }
        }
    }
}
