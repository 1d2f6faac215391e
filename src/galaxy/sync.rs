//! Bringing installed roles in line with the requirements file.

use std::path::PathBuf;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use super::error::GalaxyResult;
use super::requirements::RequirementsFile;
use super::runner::command_line;
use super::Galaxy;

/// `ansible-galaxy list` entry: `- name, version`.
static LIST_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^- ([^,\s]+), ([^\s]+)$").unwrap());

/// Parses `ansible-galaxy list` output into role name to version.
pub fn parse_installed_roles(output: &str) -> IndexMap<String, String> {
    output
        .lines()
        .filter_map(|line| LIST_LINE.captures(line.trim_end()))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// One role that has to be (re)installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleUpdate {
    pub name: String,
    /// The installed copy is removed first.
    pub remove: bool,
    pub installed: Option<String>,
    pub requested: Option<String>,
}

impl std::fmt::Display for RoleUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - from {} => {}",
            self.name,
            self.installed.as_deref().unwrap_or("N/A"),
            self.requested.as_deref().unwrap_or("N/A")
        )
    }
}

/// A role whose install command failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFailure {
    pub name: String,
    pub status: i32,
    pub stderr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: Vec<RoleUpdate>,
    pub failed: Vec<RoleFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Decides which roles need work.
///
/// A role that is not installed is installed. An installed role is replaced
/// when its version differs from the requested one or the requested version
/// matches `force_update`. A role without a requested version is left alone
/// once installed.
pub fn plan_updates(
    requirements: &RequirementsFile,
    installed: &IndexMap<String, String>,
    force_update: &Regex,
) -> GalaxyResult<Vec<RoleUpdate>> {
    let names = requirements.role_names()?;
    let mut plan = Vec::new();

    for (name, role) in names.into_iter().zip(&requirements.roles) {
        let requested = role.version.clone();
        match installed.get(&name) {
            None => plan.push(RoleUpdate {
                name,
                remove: false,
                installed: None,
                requested,
            }),
            Some(current) => {
                let Some(wanted) = requested.as_deref() else {
                    debug!(role = %name, "No version pinned, keeping installed copy");
                    continue;
                };
                if wanted != current || force_update.is_match(wanted) {
                    plan.push(RoleUpdate {
                        name,
                        remove: true,
                        installed: Some(current.clone()),
                        requested,
                    });
                }
            }
        }
    }

    Ok(plan)
}

impl Galaxy {
    /// Lists roles reported by `ansible-galaxy list`.
    pub fn installed_roles(&self) -> GalaxyResult<IndexMap<String, String>> {
        let command = command_line(&[self.settings.galaxy_executable.as_str(), "list"]);
        let output = self.runner.run(&command)?.into_result(&command)?;
        Ok(parse_installed_roles(&output.stdout))
    }

    /// Installs missing roles and replaces outdated ones.
    ///
    /// A failing install is recorded in the report and the remaining roles
    /// are still processed.
    pub fn sync(&self) -> GalaxyResult<SyncReport> {
        let requirements = RequirementsFile::from_path(&self.settings.requirements_file)?;
        let installed = self.installed_roles()?;
        let plan = plan_updates(&requirements, &installed, &self.settings.force_update)?;

        let exe = self.settings.galaxy_executable.as_str();
        let req_path = self.settings.requirements_file.to_string_lossy();
        let mut report = SyncReport::default();

        for update in plan {
            info!("Updating role {}", update);

            if update.remove {
                let command = command_line(&[exe, "remove", &update.name]);
                let output = self.runner.run(&command)?;
                if !output.is_success() {
                    warn!(role = %update.name, status = output.status, "Role removal failed");
                }
            }

            let command = command_line(&[exe, "install", "-r", &req_path, &update.name]);
            let output = self.runner.run(&command)?;
            if output.is_success() {
                report.updated.push(update);
            } else {
                warn!(
                    role = %update.name,
                    status = output.status,
                    stderr = %output.stderr.trim(),
                    "Role install failed"
                );
                report.failed.push(RoleFailure {
                    name: update.name,
                    status: output.status,
                    stderr: output.stderr,
                });
            }
        }

        Ok(report)
    }

    /// Deletes `<roles_path>/<name>` for every role in the requirements file.
    /// Returns the directories that existed and were removed.
    pub fn delete_local(&self) -> GalaxyResult<Vec<PathBuf>> {
        let requirements = RequirementsFile::from_path(&self.settings.requirements_file)?;
        let mut removed = Vec::new();

        for name in requirements.role_names()? {
            let dir = self.settings.roles_path.join(&name);
            info!("going to delete {}", dir.display());
            if dir.is_dir() {
                std::fs::remove_dir_all(&dir)?;
                removed.push(dir);
            } else if dir.exists() {
                std::fs::remove_file(&dir)?;
                removed.push(dir);
            }
        }

        Ok(removed)
    }
}
