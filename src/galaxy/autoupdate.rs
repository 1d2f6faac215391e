//! Bumping pinned role versions to the newest upstream tag.
//!
//! Only git-sourced roles are considered. The new version is the highest
//! tag with the same major version as the pinned one, so `v1.4` moves to
//! `v1.5` but never to `v2.0`.

use semver::Version;
use tracing::{debug, info, warn};

use super::error::GalaxyResult;
use super::requirements::RequirementsFile;
use super::runner::command_line;
use super::Galaxy;

/// A version change written to the requirements file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionBump {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// Parses `v1.4`, `1.4.2` or `V2` into a version. Anything else is `None`.
pub fn parse_tag_version(tag: &str) -> Option<Version> {
    let bare = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
    let parts: Vec<&str> = bare.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut numbers = [0u64; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    Some(Version::new(numbers[0], numbers[1], numbers[2]))
}

/// Extracts tag names from `git ls-remote --tags` output.
pub fn parse_remote_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|reference| reference.strip_prefix("refs/tags/"))
        .filter(|tag| !tag.ends_with("^{}"))
        .map(str::to_string)
        .collect()
}

/// Highest tag newer than `current` that keeps its major version.
pub fn newest_compatible_tag<'a>(current: &str, tags: &'a [String]) -> Option<&'a str> {
    let current = parse_tag_version(current)?;
    tags.iter()
        .filter_map(|tag| parse_tag_version(tag).map(|v| (v, tag.as_str())))
        .filter(|(v, _)| v.major == current.major && *v > current)
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag)
}

impl Galaxy {
    /// Rewrites pinned versions of git roles to their newest compatible tag.
    ///
    /// Roles whose remote cannot be listed are skipped with a warning. The
    /// file is only written when at least one version changed.
    pub fn autoupdate(&self) -> GalaxyResult<Vec<VersionBump>> {
        let mut requirements = RequirementsFile::from_path(&self.settings.requirements_file)?;
        let names = requirements.role_names()?;
        let mut bumps = Vec::new();

        for (name, role) in names.into_iter().zip(requirements.roles.iter_mut()) {
            let (Some(url), Some(current)) = (role.git_url(), role.version.clone()) else {
                debug!(role = %name, "Skipping role without git source or version");
                continue;
            };
            if !role.is_git() {
                debug!(role = %name, "Skipping non-git role");
                continue;
            }

            let command = command_line(&["git", "ls-remote", "--tags", url]);
            let output = self.runner.run(&command)?;
            if !output.is_success() {
                warn!(role = %name, status = output.status, "Could not list remote tags");
                continue;
            }

            let tags = parse_remote_tags(&output.stdout);
            if let Some(tag) = newest_compatible_tag(&current, &tags) {
                info!(role = %name, from = %current, to = %tag, "Bumping role version");
                bumps.push(VersionBump {
                    name,
                    from: current,
                    to: tag.to_string(),
                });
                role.version = Some(tag.to_string());
            }
        }

        if !bumps.is_empty() {
            requirements.save()?;
        }
        Ok(bumps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::runner::{CommandOutput, CommandRunner};
    use crate::galaxy::GalaxySettings;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const REMOTE: &str = "a1\trefs/tags/v1.4\n\
        a2\trefs/tags/v1.5\n\
        a3\trefs/tags/v1.5^{}\n\
        a4\trefs/tags/v1.10.1\n\
        a5\trefs/tags/v2.0\n\
        a6\trefs/tags/nightly\n";

    struct Remote;

    impl CommandRunner for Remote {
        fn run(&self, command: &str) -> GalaxyResult<CommandOutput> {
            if command.contains("broken") {
                return Ok(CommandOutput::failure(128, "repository not found"));
            }
            Ok(CommandOutput::success(REMOTE))
        }
    }

    #[test]
    fn test_parse_tag_version() {
        assert_eq!(parse_tag_version("v1.4"), Some(Version::new(1, 4, 0)));
        assert_eq!(parse_tag_version("2"), Some(Version::new(2, 0, 0)));
        assert_eq!(parse_tag_version("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_tag_version("1.2.3.4"), None);
        assert_eq!(parse_tag_version("1.x"), None);
        assert_eq!(parse_tag_version("nightly"), None);
    }

    #[test]
    fn test_parse_remote_tags_skips_peeled_refs() {
        let tags = parse_remote_tags(REMOTE);
        assert_eq!(tags, vec!["v1.4", "v1.5", "v1.10.1", "v2.0", "nightly"]);
    }

    #[test]
    fn test_newest_compatible_tag_stays_on_major() {
        let tags = parse_remote_tags(REMOTE);
        assert_eq!(newest_compatible_tag("v1.4", &tags), Some("v1.10.1"));
        assert_eq!(newest_compatible_tag("v2.0", &tags), None);
        assert_eq!(newest_compatible_tag("main", &tags), None);
    }

    #[test]
    fn test_autoupdate_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let req = dir.path().join("requirements.yml");
        std::fs::write(
            &req,
            "- src: https://github.com/org/web.git\n  version: v1.4\n\
             - src: https://github.com/org/broken.git\n  version: v1.0\n\
             - name: geerlingguy.java\n  version: 2.0.1\n",
        )
        .unwrap();

        let galaxy = Galaxy::new(
            GalaxySettings::default().with_requirements_file(&req),
            Arc::new(Remote),
        );
        let bumps = galaxy.autoupdate().unwrap();

        assert_eq!(
            bumps,
            vec![VersionBump {
                name: "web".to_string(),
                from: "v1.4".to_string(),
                to: "v1.10.1".to_string(),
            }]
        );

        let reread = RequirementsFile::from_path(&req).unwrap();
        assert_eq!(reread.roles[0].version.as_deref(), Some("v1.10.1"));
        assert_eq!(reread.roles[1].version.as_deref(), Some("v1.0"));
        assert_eq!(reread.roles[2].version.as_deref(), Some("2.0.1"));
    }
}
