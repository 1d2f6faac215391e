//! Configuration module for Awsible
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/awsible/awsible.cfg)
//! - User configuration (~/.awsible.cfg)
//! - Project configuration (./awsible.cfg)
//! - Environment variables
//! - Command-line arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::galaxy::DEFAULT_FORCE_UPDATE_PATTERN;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// AWS connection settings
    pub aws: AwsConfig,

    /// Galaxy role sync settings
    pub galaxy: GalaxyConfig,

    /// Vault settings
    pub vault: VaultConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// AWS settings. Unset values fall through to the SDK's default chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region, e.g. `eu-west-1`
    pub region: Option<String>,

    /// Named profile from the shared credentials file
    pub profile: Option<String>,

    /// Endpoint override (localstack and friends)
    pub endpoint_url: Option<String>,
}

/// Galaxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalaxyConfig {
    /// Requirements file listing the roles
    pub requirements_file: PathBuf,

    /// Directory holding installed roles
    pub roles_path: PathBuf,

    /// `ansible-galaxy` executable
    pub galaxy_executable: String,

    /// Requested versions matching this are always reinstalled
    pub force_update_pattern: String,
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            requirements_file: PathBuf::from("requirements.yml"),
            roles_path: PathBuf::from("roles"),
            galaxy_executable: "ansible-galaxy".to_string(),
            force_update_pattern: DEFAULT_FORCE_UPDATE_PATTERN.to_string(),
        }
    }
}

/// Vault settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault password file
    pub password_file: Option<PathBuf>,

    /// Password file used when re-keying
    pub new_password_file: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format: `text` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Output colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Config::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                config = config.merge_from_file(&path)?;
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Get the list of configuration file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        // Explicit path takes priority
        if let Some(path) = explicit_path {
            return vec![path.clone()];
        }

        let mut paths = vec![PathBuf::from("/etc/awsible/awsible.cfg")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".awsible.cfg"));
        }

        paths.push(PathBuf::from("awsible.cfg"));

        if let Ok(env_config) = std::env::var("AWSIBLE_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge configuration from a file
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Ok(self.merge(Self::parse(&content, path)?))
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = match extension {
            "yml" | "yaml" => serde_yaml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            "toml" => toml::from_str(content)?,
            _ => {
                // Try TOML first (for .cfg files), then YAML
                toml::from_str(content)
                    .or_else(|_| serde_yaml::from_str(content))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
        };
        Ok(config)
    }

    /// Merge another config into this one. Values set in `other` win.
    fn merge(&self, other: Config) -> Config {
        let galaxy_defaults = GalaxyConfig::default();
        let logging_defaults = LoggingConfig::default();

        Config {
            aws: AwsConfig {
                region: other.aws.region.or_else(|| self.aws.region.clone()),
                profile: other.aws.profile.or_else(|| self.aws.profile.clone()),
                endpoint_url: other
                    .aws
                    .endpoint_url
                    .or_else(|| self.aws.endpoint_url.clone()),
            },
            galaxy: GalaxyConfig {
                requirements_file: if other.galaxy.requirements_file
                    != galaxy_defaults.requirements_file
                {
                    other.galaxy.requirements_file
                } else {
                    self.galaxy.requirements_file.clone()
                },
                roles_path: if other.galaxy.roles_path != galaxy_defaults.roles_path {
                    other.galaxy.roles_path
                } else {
                    self.galaxy.roles_path.clone()
                },
                galaxy_executable: if other.galaxy.galaxy_executable
                    != galaxy_defaults.galaxy_executable
                {
                    other.galaxy.galaxy_executable
                } else {
                    self.galaxy.galaxy_executable.clone()
                },
                force_update_pattern: if other.galaxy.force_update_pattern
                    != galaxy_defaults.force_update_pattern
                {
                    other.galaxy.force_update_pattern
                } else {
                    self.galaxy.force_update_pattern.clone()
                },
            },
            vault: VaultConfig {
                password_file: other
                    .vault
                    .password_file
                    .or_else(|| self.vault.password_file.clone()),
                new_password_file: other
                    .vault
                    .new_password_file
                    .or_else(|| self.vault.new_password_file.clone()),
            },
            logging: LoggingConfig {
                level: if other.logging.level != logging_defaults.level {
                    other.logging.level
                } else {
                    self.logging.level.clone()
                },
                format: if other.logging.format != logging_defaults.format {
                    other.logging.format
                } else {
                    self.logging.format.clone()
                },
            },
            colors: ColorsConfig {
                enabled: self.colors.enabled && other.colors.enabled,
            },
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // AWS_REGION wins over AWS_DEFAULT_REGION
        if let Some(region) = env("AWS_REGION").or_else(|| env("AWS_DEFAULT_REGION")) {
            self.aws.region = Some(region);
        }

        if let Some(profile) = env("AWS_PROFILE") {
            self.aws.profile = Some(profile);
        }

        if let Some(url) = env("AWSIBLE_ENDPOINT_URL") {
            self.aws.endpoint_url = Some(url);
        }

        if let Some(file) = env("AWSIBLE_VAULT_PASSWORD_FILE") {
            self.vault.password_file = Some(PathBuf::from(file));
        }

        if let Some(file) = env("AWSIBLE_NEW_VAULT_PASSWORD_FILE") {
            self.vault.new_password_file = Some(PathBuf::from(file));
        }

        if let Some(file) = env("AWSIBLE_REQUIREMENTS_FILE") {
            self.galaxy.requirements_file = PathBuf::from(file);
        }

        if let Some(level) = env("AWSIBLE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if env("NO_COLOR").is_some() || env("AWSIBLE_NO_COLOR").is_some() {
            self.colors.enabled = false;
        }
    }

    /// Get vault password file path
    pub fn vault_password_file(&self) -> Option<&PathBuf> {
        self.vault.password_file.as_ref()
    }

    /// Load from a specific file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Config::default().merge_from_file(path.as_ref())
    }
}
