//! Ansible Galaxy Role Synchronization
//!
//! `ansible-galaxy` has no update command. This module fills the gap for
//! roles listed in a `requirements.yml` file:
//!
//! - **sync**: install missing roles, replace roles whose installed version
//!   differs from the pinned one
//! - **delete**: remove the local role directories
//! - **autoupdate**: bump pinned versions of git roles to the newest tag
//!   within the same major version
//!
//! All external commands go through a [`CommandRunner`], so the logic can be
//! exercised without `ansible-galaxy` or `git` installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use awsible::galaxy::{Galaxy, GalaxySettings, SystemRunner};
//!
//! let galaxy = Galaxy::new(GalaxySettings::default(), Arc::new(SystemRunner::new()));
//! let report = galaxy.sync()?;
//! for update in &report.updated {
//!     println!("updated {}", update);
//! }
//! ```

mod autoupdate;
mod error;
mod requirements;
mod runner;
mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

pub use autoupdate::{newest_compatible_tag, parse_remote_tags, parse_tag_version, VersionBump};
pub use error::{GalaxyError, GalaxyResult};
pub use requirements::{RequirementsFile, RoleRequirement};
pub use runner::{command_line, CommandOutput, CommandRunner, SystemRunner};
pub use sync::{parse_installed_roles, plan_updates, RoleFailure, RoleUpdate, SyncReport};

use crate::config::GalaxyConfig;

/// Default pattern for versions that are always reinstalled.
pub const DEFAULT_FORCE_UPDATE_PATTERN: &str = r"^test\S+$";

static DEFAULT_FORCE_UPDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_FORCE_UPDATE_PATTERN).unwrap());

/// Paths and executables used by [`Galaxy`].
#[derive(Debug, Clone)]
pub struct GalaxySettings {
    pub requirements_file: PathBuf,
    pub roles_path: PathBuf,
    pub galaxy_executable: String,
    /// Requested versions matching this are reinstalled even when unchanged.
    pub force_update: Regex,
}

impl Default for GalaxySettings {
    fn default() -> Self {
        Self {
            requirements_file: PathBuf::from("requirements.yml"),
            roles_path: PathBuf::from("roles"),
            galaxy_executable: "ansible-galaxy".to_string(),
            force_update: DEFAULT_FORCE_UPDATE.clone(),
        }
    }
}

impl GalaxySettings {
    /// Builds settings from the `[galaxy]` config section.
    pub fn from_config(config: &GalaxyConfig) -> GalaxyResult<Self> {
        let force_update = Regex::new(&config.force_update_pattern).map_err(|e| {
            GalaxyError::Other(format!(
                "Invalid force_update_pattern '{}': {}",
                config.force_update_pattern, e
            ))
        })?;
        Ok(Self {
            requirements_file: config.requirements_file.clone(),
            roles_path: config.roles_path.clone(),
            galaxy_executable: config.galaxy_executable.clone(),
            force_update,
        })
    }

    pub fn with_requirements_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.requirements_file = path.into();
        self
    }

    pub fn with_roles_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.roles_path = path.into();
        self
    }
}

/// Role synchronization against a requirements file.
pub struct Galaxy {
    settings: GalaxySettings,
    runner: Arc<dyn CommandRunner>,
}

impl Galaxy {
    pub fn new(settings: GalaxySettings, runner: Arc<dyn CommandRunner>) -> Self {
        Self { settings, runner }
    }

    pub fn settings(&self) -> &GalaxySettings {
        &self.settings
    }
}
