//! Requirements File Parsing
//!
//! Reads the role list of a `requirements.yml` file. Both layouts are
//! accepted:
//!
//! ```yaml
//! # Legacy: a bare list of roles
//! - src: https://github.com/org/ansible-role-nginx.git
//!   scm: git
//!   version: v1.4.0
//! - name: geerlingguy.java
//!   version: "2.0.1"
//! ```
//!
//! ```yaml
//! roles:
//!   - name: geerlingguy.java
//!     version: "2.0.1"
//! collections:
//!   - community.general
//! ```
//!
//! Unknown keys are kept so the file can be written back after versions are
//! bumped.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{GalaxyError, GalaxyResult};

/// One role entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm: Option<String>,
    #[serde(
        default,
        deserialize_with = "version_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// Accepts `version: 1.0` as well as `version: "1.0"`.
fn version_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::String(s) => Ok(Some(s)),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or number, got {:?}",
            other
        ))),
    }
}

impl RoleRequirement {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            src: None,
            scm: None,
            version: None,
            extra: IndexMap::new(),
        }
    }

    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Installed role name: `name`, else the last path segment of `src`
    /// up to its first dot.
    pub fn role_name(&self) -> Option<String> {
        if let Some(name) = &self.name {
            return Some(name.clone());
        }
        let src = self.src.as_deref()?;
        let last = src.trim_end_matches('/').rsplit('/').next()?;
        let stem = last.split('.').next().unwrap_or(last);
        (!stem.is_empty()).then(|| stem.to_string())
    }

    /// Returns true if `src` points at a git repository.
    pub fn is_git(&self) -> bool {
        if self.scm.as_deref() == Some("git") {
            return true;
        }
        self.src.as_deref().is_some_and(|src| {
            src.starts_with("git+")
                || src.starts_with("git@")
                || src.ends_with(".git")
                || src.starts_with("https://github.com/")
        })
    }

    /// Repository URL usable with `git`.
    pub fn git_url(&self) -> Option<&str> {
        let src = self.src.as_deref()?;
        Some(src.strip_prefix("git+").unwrap_or(src))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Layout {
    Legacy,
    Structured(IndexMap<String, serde_yaml::Value>),
}

/// Parsed requirements file.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementsFile {
    pub path: PathBuf,
    pub roles: Vec<RoleRequirement>,
    layout: Layout,
}

#[derive(Debug, Deserialize)]
struct Structured {
    #[serde(default)]
    roles: Vec<RoleRequirement>,
    #[serde(flatten)]
    rest: IndexMap<String, serde_yaml::Value>,
}

impl RequirementsFile {
    /// Reads and parses a requirements file.
    pub fn from_path(path: impl AsRef<Path>) -> GalaxyResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GalaxyError::RequirementsFileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GalaxyError::parse(path, format!("Failed to read file: {}", e)))?;
        Self::from_str(&content, path)
    }

    /// Parses requirements from a string.
    pub fn from_str(content: &str, path: impl AsRef<Path>) -> GalaxyResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Ok(roles) = serde_yaml::from_str::<Vec<RoleRequirement>>(content) {
            debug!("Parsed legacy requirements format: {} roles", roles.len());
            return Ok(Self {
                path,
                roles,
                layout: Layout::Legacy,
            });
        }

        let parsed: Structured =
            serde_yaml::from_str(content).map_err(|e| GalaxyError::parse(&path, e.to_string()))?;
        debug!("Parsed requirements file: {} roles", parsed.roles.len());
        Ok(Self {
            path,
            roles: parsed.roles,
            layout: Layout::Structured(parsed.rest),
        })
    }

    /// Role names in file order. Fails on an entry with neither `name` nor `src`.
    pub fn role_names(&self) -> GalaxyResult<Vec<String>> {
        self.roles
            .iter()
            .enumerate()
            .map(|(index, role)| {
                role.role_name().ok_or_else(|| GalaxyError::InvalidRequirement {
                    index,
                    message: "role has neither 'name' nor 'src'".to_string(),
                })
            })
            .collect()
    }

    /// Serializes the file in the layout it was read in.
    pub fn to_yaml(&self) -> GalaxyResult<String> {
        let result = match &self.layout {
            Layout::Legacy => serde_yaml::to_string(&self.roles),
            Layout::Structured(rest) => {
                let mut doc = serde_yaml::Mapping::new();
                doc.insert(
                    "roles".into(),
                    serde_yaml::to_value(&self.roles)
                        .map_err(|e| GalaxyError::Other(e.to_string()))?,
                );
                for (k, v) in rest {
                    doc.insert(k.as_str().into(), v.clone());
                }
                serde_yaml::to_string(&doc)
            }
        };
        result.map_err(|e| GalaxyError::Other(format!("Failed to serialize requirements: {}", e)))
    }

    /// Writes the file back to where it was read from.
    pub fn save(&self) -> GalaxyResult<()> {
        std::fs::write(&self.path, self.to_yaml()?)?;
        Ok(())
    }
}
