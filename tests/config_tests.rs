//! Configuration loading tests.
//!
//! These touch process environment variables, so every test that reads the
//! environment runs serially.

mod common;

use std::path::PathBuf;

use common::temp_tree;
use pretty_assertions::assert_eq;
use serial_test::serial;

use awsible::config::Config;
use awsible::galaxy::GalaxySettings;

const ENV_VARS: &[&str] = &[
    "AWS_REGION",
    "AWS_DEFAULT_REGION",
    "AWS_PROFILE",
    "AWSIBLE_VAULT_PASSWORD_FILE",
    "AWSIBLE_REQUIREMENTS_FILE",
    "AWSIBLE_LOG_LEVEL",
    "NO_COLOR",
    "AWSIBLE_NO_COLOR",
];

struct EnvGuard;

impl EnvGuard {
    fn clean() -> Self {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }
}

const TOML_CFG: &str = r#"
[aws]
region = "eu-west-1"
profile = "ops"

[galaxy]
requirements_file = "deps/requirements.yml"
roles_path = "vendor/roles"
force_update_pattern = "^dev-"

[vault]
password_file = "~/.vault_pass"

[logging]
level = "info"
format = "json"
"#;

#[test]
#[serial]
fn test_load_explicit_toml_file() {
    let _env = EnvGuard::clean();
    let dir = temp_tree(&[("awsible.cfg", TOML_CFG)]);

    let config = Config::load(Some(&dir.path().join("awsible.cfg"))).unwrap();
    assert_eq!(config.aws.region.as_deref(), Some("eu-west-1"));
    assert_eq!(config.aws.profile.as_deref(), Some("ops"));
    assert_eq!(config.galaxy.roles_path, PathBuf::from("vendor/roles"));
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.vault_password_file(), Some(&PathBuf::from("~/.vault_pass")));
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let _env = EnvGuard::clean();
    let dir = temp_tree(&[("awsible.cfg", TOML_CFG)]);
    std::env::set_var("AWS_DEFAULT_REGION", "us-west-2");
    std::env::set_var("AWS_REGION", "ap-south-1");
    std::env::set_var("AWSIBLE_REQUIREMENTS_FILE", "other.yml");
    std::env::set_var("AWSIBLE_LOG_LEVEL", "debug");
    std::env::set_var("NO_COLOR", "1");

    let config = Config::load(Some(&dir.path().join("awsible.cfg"))).unwrap();
    assert_eq!(config.aws.region.as_deref(), Some("ap-south-1"));
    assert_eq!(config.galaxy.requirements_file, PathBuf::from("other.yml"));
    assert_eq!(config.logging.level, "debug");
    assert!(!config.colors.enabled);
    // Untouched values still come from the file
    assert_eq!(config.aws.profile.as_deref(), Some("ops"));
}

#[test]
#[serial]
fn test_yaml_config_file() {
    let _env = EnvGuard::clean();
    let dir = temp_tree(&[(
        "awsible.yml",
        "aws:\n  region: us-east-2\ngalaxy:\n  galaxy_executable: /opt/bin/ansible-galaxy\n",
    )]);

    let config = Config::load(Some(&dir.path().join("awsible.yml"))).unwrap();
    assert_eq!(config.aws.region.as_deref(), Some("us-east-2"));
    assert_eq!(config.galaxy.galaxy_executable, "/opt/bin/ansible-galaxy");
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    let _env = EnvGuard::clean();
    let dir = temp_tree(&[("awsible.cfg", "[aws\nregion = ")]);
    assert!(Config::load(Some(&dir.path().join("awsible.cfg"))).is_err());
}

#[test]
fn test_galaxy_settings_from_loaded_config() {
    let dir = temp_tree(&[("awsible.cfg", TOML_CFG)]);
    let config = Config::from_file(dir.path().join("awsible.cfg")).unwrap();

    let settings = GalaxySettings::from_config(&config.galaxy).unwrap();
    assert_eq!(settings.requirements_file, PathBuf::from("deps/requirements.yml"));
    assert!(settings.force_update.is_match("dev-feature"));
    assert!(!settings.force_update.is_match("testing"));
}

#[test]
fn test_bad_force_update_pattern() {
    let dir = temp_tree(&[("awsible.cfg", "[galaxy]\nforce_update_pattern = \"([\"\n")]);
    let config = Config::from_file(dir.path().join("awsible.cfg")).unwrap();
    assert!(GalaxySettings::from_config(&config.galaxy).is_err());
}
