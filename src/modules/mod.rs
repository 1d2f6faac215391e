//! Module system for Awsible
//!
//! This module provides the core traits, types, and registry for the Awsible module system.
//! Each module translates declarative parameters into provider calls and reports a
//! flat, Ansible-shaped result.

pub mod cloud;

use crate::error::{Error, ProviderError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during module execution
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Provider {
        context: String,
        #[source]
        source: ProviderError,
    },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ModuleError {
    /// Wraps a provider failure with the operation that was attempted.
    pub fn provider(context: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            context: context.into(),
            source,
        }
    }

    /// Provider error code, when the failure came from the provider.
    pub fn provider_code(&self) -> Option<&str> {
        match self {
            ModuleError::Provider { source, .. } => Some(&source.code),
            _ => None,
        }
    }
}

impl From<Error> for ModuleError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => ModuleError::Validation(msg),
            Error::ModuleArgs { message, .. } => ModuleError::InvalidParameter(message),
            Error::Provider(source) => ModuleError::Provider {
                context: "Provider call failed".to_string(),
                source,
            },
            Error::NotFound(name) => ModuleError::ResourceNotFound(name),
            other => ModuleError::ExecutionFailed(other.to_string()),
        }
    }
}

impl From<ModuleError> for Error {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Validation(msg) => Error::Validation(msg),
            ModuleError::Provider { source, .. } => Error::Provider(source),
            ModuleError::ResourceNotFound(name) => Error::NotFound(name),
            ModuleError::NotFound(name) => Error::ModuleNotFound(name),
            other => Error::module_args("module", other.to_string()),
        }
    }
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;

/// Status of a module execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleStatus {
    /// Module executed successfully and made changes
    Changed,
    /// Module executed successfully but no changes were needed
    Ok,
    /// Module execution failed
    Failed,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleStatus::Changed => write!(f, "changed"),
            ModuleStatus::Ok => write!(f, "ok"),
            ModuleStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Represents a difference between current and desired state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    /// Values that will change
    pub before: serde_json::Value,
    /// Values they change to
    pub after: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_header: Option<String>,
}

impl Diff {
    pub fn new(before: impl Into<serde_json::Value>, after: impl Into<serde_json::Value>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
            before_header: None,
            after_header: None,
        }
    }

    pub fn with_headers(
        mut self,
        before_header: impl Into<String>,
        after_header: impl Into<String>,
    ) -> Self {
        self.before_header = Some(before_header.into());
        self.after_header = Some(after_header.into());
        self
    }
}

/// Result of a module execution
///
/// Serializes flat: `data` entries sit beside `changed`/`msg`/`diff`, the way
/// an orchestrator expects resource fields in a module result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleOutput {
    /// Whether the module changed anything
    pub changed: bool,
    /// Human-readable message about what happened
    pub msg: String,
    /// Status of the execution
    pub status: ModuleStatus,
    /// Optional diff showing what changed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,
    /// Additional data returned by the module
    #[serde(flatten)]
    pub data: IndexMap<String, serde_json::Value>,
}

impl ModuleOutput {
    /// Create a new successful output with no changes
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            msg: msg.into(),
            status: ModuleStatus::Ok,
            diff: None,
            data: IndexMap::new(),
        }
    }

    /// Create a new successful output with changes
    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            status: ModuleStatus::Changed,
            diff: None,
            data: IndexMap::new(),
        }
    }

    /// Create a failed output
    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            msg: msg.into(),
            status: ModuleStatus::Failed,
            diff: None,
            data: IndexMap::new(),
        }
    }

    /// Add a diff to the output
    pub fn with_diff(mut self, diff: Diff) -> Self {
        self.diff = Some(diff);
        self
    }

    /// Add data to the output
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Merge every entry of a JSON object into the output data
    pub fn with_fields(mut self, fields: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data.extend(fields);
        self
    }
}

/// Parameters passed to a module
pub type ModuleParams = HashMap<String, serde_json::Value>;

/// Context for module execution
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    /// Whether to run in check mode (dry run)
    pub check_mode: bool,
    /// Whether to show diffs
    pub diff_mode: bool,
}

impl ModuleContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn with_diff_mode(mut self, diff_mode: bool) -> Self {
        self.diff_mode = diff_mode;
        self
    }
}

/// Trait that all modules must implement
pub trait Module: Send + Sync {
    /// Returns the name of the module
    fn name(&self) -> &'static str;

    /// Returns a description of what the module does
    fn description(&self) -> &'static str;

    /// Execute the module with the given parameters
    fn execute(&self, params: &ModuleParams, context: &ModuleContext)
        -> ModuleResult<ModuleOutput>;

    /// Validate the parameters before execution
    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        // Default implementation does nothing
        let _ = params;
        Ok(())
    }

    /// Returns the list of required parameters
    fn required_params(&self) -> &[&'static str] {
        &[]
    }
}

/// Allowed values for a `state` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

impl DesiredState {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        match params.get_string("state")?.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("present") => Ok(DesiredState::Present),
            Some("absent") => Ok(DesiredState::Absent),
            Some(other) => Err(ModuleError::InvalidParameter(format!(
                "Invalid state '{}'. Valid states: present, absent",
                other
            ))),
        }
    }
}

/// Helper trait for extracting parameters
pub trait ParamExt {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>>;
    fn get_string_required(&self, key: &str) -> ModuleResult<String>;
    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>>;
    /// Returns the first key of `keys` that is set, for aliased parameters
    fn get_string_any(&self, keys: &[&str]) -> ModuleResult<Option<String>>;
}

impl ParamExt for ModuleParams {
    fn get_string(&self, key: &str) -> ModuleResult<Option<String>> {
        match self.get(key) {
            Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(v) => Ok(Some(v.to_string().trim_matches('"').to_string())),
        }
    }

    fn get_string_required(&self, key: &str) -> ModuleResult<String> {
        self.get_string(key)?
            .ok_or_else(|| ModuleError::MissingParameter(key.to_string()))
    }

    fn get_i64(&self, key: &str) -> ModuleResult<Option<i64>> {
        match self.get(key) {
            Some(serde_json::Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                ModuleError::InvalidParameter(format!("{} must be an integer", key))
            }),
            Some(serde_json::Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| ModuleError::InvalidParameter(format!("{} must be an integer", key))),
            Some(serde_json::Value::Null) | None => Ok(None),
            Some(_) => Err(ModuleError::InvalidParameter(format!(
                "{} must be an integer",
                key
            ))),
        }
    }

    fn get_string_any(&self, keys: &[&str]) -> ModuleResult<Option<String>> {
        for key in keys {
            if let Some(value) = self.get_string(key)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Registry for looking up modules by name
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.insert(module.name().to_string(), module);
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).cloned()
    }

    /// Check if a module exists
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Get all module names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Execute a module by name
    pub fn execute(
        &self,
        name: &str,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        let module = self
            .get(name)
            .ok_or_else(|| ModuleError::NotFound(name.to_string()))?;

        // Check required parameters
        for param in module.required_params() {
            if !params.contains_key(*param) {
                return Err(ModuleError::MissingParameter((*param).to_string()));
            }
        }

        module.validate_params(params)?;
        module.execute(params, context)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestModule;

    impl Module for TestModule {
        fn name(&self) -> &'static str {
            "test"
        }

        fn description(&self) -> &'static str {
            "A test module"
        }

        fn execute(
            &self,
            params: &ModuleParams,
            context: &ModuleContext,
        ) -> ModuleResult<ModuleOutput> {
            if context.check_mode {
                return Ok(ModuleOutput::ok("Would do something"));
            }

            let msg = params
                .get_string("msg")?
                .unwrap_or_else(|| "Hello".to_string());
            Ok(ModuleOutput::changed(msg))
        }

        fn required_params(&self) -> &[&'static str] {
            &["msg"]
        }
    }

    #[test]
    fn test_module_registry() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule));

        assert!(registry.contains("test"));
        assert!(!registry.contains("nonexistent"));
        assert_eq!(registry.names(), vec!["test"]);

        let err = registry
            .execute("test", &ModuleParams::new(), &ModuleContext::default())
            .unwrap_err();
        assert!(matches!(err, ModuleError::MissingParameter(p) if p == "msg"));
    }

    #[test]
    fn test_module_output_serializes_flat() {
        let output = ModuleOutput::changed("Something changed")
            .with_data("arn", serde_json::json!("arn:aws:x"))
            .with_diff(Diff::new(serde_json::json!({"a": 1}), serde_json::json!({"a": 2})));

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["changed"], serde_json::json!(true));
        assert_eq!(value["arn"], serde_json::json!("arn:aws:x"));
        assert_eq!(value["diff"]["after"]["a"], serde_json::json!(2));
        assert!(value["diff"].get("before_header").is_none());
    }

    #[test]
    fn test_param_ext() {
        let mut params: ModuleParams = HashMap::new();
        params.insert("string".to_string(), serde_json::json!("hello"));
        params.insert("number".to_string(), serde_json::json!(42));
        params.insert("number_str".to_string(), serde_json::json!("-1"));
        params.insert("null".to_string(), serde_json::Value::Null);

        assert_eq!(params.get_string("string").unwrap(), Some("hello".to_string()));
        assert_eq!(params.get_i64("number").unwrap(), Some(42));
        assert_eq!(params.get_i64("number_str").unwrap(), Some(-1));
        assert_eq!(params.get_i64("null").unwrap(), None);
        assert_eq!(params.get_string("null").unwrap(), None);
        assert_eq!(
            params.get_string_any(&["missing", "string"]).unwrap(),
            Some("hello".to_string())
        );
    }

    #[test]
    fn test_desired_state() {
        let mut params = ModuleParams::new();
        assert_eq!(DesiredState::from_params(&params).unwrap(), DesiredState::Present);
        params.insert("state".to_string(), serde_json::json!("Absent"));
        assert_eq!(DesiredState::from_params(&params).unwrap(), DesiredState::Absent);
        params.insert("state".to_string(), serde_json::json!("running"));
        assert!(DesiredState::from_params(&params).is_err());
    }

    #[test]
    fn test_error_conversion_keeps_provider_code() {
        let err: ModuleError = Error::provider("Throttling", "Rate exceeded").into();
        assert_eq!(err.provider_code(), Some("Throttling"));
    }
}
