//! Integration tests for Galaxy role synchronization.
//!
//! `ansible-galaxy` and `git` are replaced by a scripted runner; requirements
//! files and role directories live in temporary directories.

mod common;

use std::sync::Arc;

use common::{temp_tree, ScriptedRunner};
use pretty_assertions::assert_eq;

use awsible::galaxy::{CommandOutput, Galaxy, GalaxyError, GalaxySettings, RequirementsFile};

// ============================================================================
// Test Helpers
// ============================================================================

const REQUIREMENTS: &str = "\
- src: https://github.com/acme/ansible-role-nginx.git
  name: nginx
  scm: git
  version: v1.4
- name: acme.java
  version: 2.0.1
- name: acme.tools
- name: acme.devbox
  version: testing-branch
";

const INSTALLED: &str = "\
# /etc/ansible/roles
- nginx, v1.4
- acme.java, 1.9.0
- acme.tools, 0.3.0
- acme.devbox, testing-branch
";

fn galaxy(dir: &std::path::Path, runner: Arc<ScriptedRunner>) -> Galaxy {
    let settings = GalaxySettings::default()
        .with_requirements_file(dir.join("requirements.yml"))
        .with_roles_path(dir.join("roles"));
    Galaxy::new(settings, runner)
}

fn installs(commands: &[String]) -> Vec<&str> {
    commands
        .iter()
        .filter(|c| c.starts_with("ansible-galaxy install"))
        .filter_map(|c| c.rsplit(' ').next())
        .collect()
}

fn removals(commands: &[String]) -> Vec<&str> {
    commands
        .iter()
        .filter_map(|c| c.strip_prefix("ansible-galaxy remove "))
        .collect()
}

// ============================================================================
// Sync
// ============================================================================

#[test]
fn test_sync_replaces_outdated_and_forced_roles() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(
        ScriptedRunner::new().on("ansible-galaxy list", CommandOutput::success(INSTALLED)),
    );

    let report = galaxy(dir.path(), runner.clone()).sync().unwrap();
    assert!(report.is_success());

    let updated: Vec<&str> = report.updated.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(updated, vec!["acme.java", "acme.devbox"]);
    assert_eq!(report.updated[0].to_string(), "acme.java - from 1.9.0 => 2.0.1");

    let commands = runner.commands();
    assert_eq!(commands[0], "ansible-galaxy list");
    assert_eq!(removals(&commands), vec!["acme.java", "acme.devbox"]);
    assert_eq!(installs(&commands), vec!["acme.java", "acme.devbox"]);
}

#[test]
fn test_sync_installs_missing_roles_without_removal() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(ScriptedRunner::new().on(
        "ansible-galaxy list",
        CommandOutput::success("# /etc/ansible/roles\n"),
    ));

    let report = galaxy(dir.path(), runner.clone()).sync().unwrap();
    assert_eq!(report.updated.len(), 4);
    assert!(report.updated.iter().all(|u| !u.remove));
    assert_eq!(report.updated[2].to_string(), "acme.tools - from N/A => N/A");

    let commands = runner.commands();
    assert!(removals(&commands).is_empty());
    assert_eq!(
        installs(&commands),
        vec!["nginx", "acme.java", "acme.tools", "acme.devbox"]
    );
}

#[test]
fn test_sync_records_failed_installs_and_continues() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(
        ScriptedRunner::new()
            .on("ansible-galaxy list", CommandOutput::success(INSTALLED))
            .on("ansible-galaxy install", CommandOutput::failure(1, "- sorry, acme.java was not found")),
    );

    let report = galaxy(dir.path(), runner.clone()).sync().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].name, "acme.java");
    assert_eq!(report.failed[0].status, 1);
    assert!(report.updated.is_empty());
}

#[test]
fn test_sync_fails_when_roles_cannot_be_listed() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(
        ScriptedRunner::new().on("ansible-galaxy list", CommandOutput::failure(127, "not found")),
    );

    let err = galaxy(dir.path(), runner.clone()).sync().unwrap_err();
    assert!(matches!(err, GalaxyError::CommandFailed { status: 127, .. }));
    assert_eq!(runner.commands().len(), 1);
}

#[test]
fn test_sync_missing_requirements_file() {
    let dir = temp_tree(&[]);
    let runner = Arc::new(ScriptedRunner::new());

    let err = galaxy(dir.path(), runner.clone()).sync().unwrap_err();
    assert!(matches!(err, GalaxyError::RequirementsFileNotFound { .. }));
    assert!(runner.commands().is_empty());
}

// ============================================================================
// Delete
// ============================================================================

#[test]
fn test_delete_removes_only_listed_roles() {
    let dir = temp_tree(&[
        ("requirements.yml", REQUIREMENTS),
        ("roles/nginx/tasks/main.yml", "---\n"),
        ("roles/acme.java/meta/main.yml", "---\n"),
        ("roles/unrelated/tasks/main.yml", "---\n"),
    ]);
    let runner = Arc::new(ScriptedRunner::new());

    let removed = galaxy(dir.path(), runner.clone()).delete_local().unwrap();
    assert_eq!(
        removed,
        vec![dir.path().join("roles/nginx"), dir.path().join("roles/acme.java")]
    );
    assert!(!dir.path().join("roles/nginx").exists());
    assert!(dir.path().join("roles/unrelated").exists());
    assert!(runner.commands().is_empty());
}

// ============================================================================
// Autoupdate
// ============================================================================

#[test]
fn test_autoupdate_bumps_git_roles_within_major() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(ScriptedRunner::new().on(
        "git ls-remote",
        CommandOutput::success(
            "a1\trefs/tags/v1.4\na2\trefs/tags/v1.7\na3\trefs/tags/v1.7^{}\na4\trefs/tags/v2.0\n",
        ),
    ));

    let bumps = galaxy(dir.path(), runner.clone()).autoupdate().unwrap();
    assert_eq!(bumps.len(), 1);
    assert_eq!(bumps[0].name, "nginx");
    assert_eq!(bumps[0].from, "v1.4");
    assert_eq!(bumps[0].to, "v1.7");

    let saved = RequirementsFile::from_path(dir.path().join("requirements.yml")).unwrap();
    assert_eq!(saved.roles[0].version.as_deref(), Some("v1.7"));
    assert_eq!(saved.roles[1].version.as_deref(), Some("2.0.1"));

    // Only the git role reaches the remote
    assert_eq!(runner.commands().len(), 1);
}

#[test]
fn test_autoupdate_leaves_file_untouched_when_current() {
    let dir = temp_tree(&[("requirements.yml", REQUIREMENTS)]);
    let runner = Arc::new(
        ScriptedRunner::new().on("git ls-remote", CommandOutput::success("a1\trefs/tags/v1.4\n")),
    );

    let bumps = galaxy(dir.path(), runner).autoupdate().unwrap();
    assert!(bumps.is_empty());

    let content = std::fs::read_to_string(dir.path().join("requirements.yml")).unwrap();
    assert_eq!(content, REQUIREMENTS);
}
