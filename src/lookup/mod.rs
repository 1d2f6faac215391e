//! Lookup Plugin System for Awsible
//!
//! Lookup plugins retrieve data from external sources and hand it back as a
//! list of strings, the way Ansible's lookup plugins do.
//!
//! # Available Plugins
//!
//! - [`KmsLookup`] - Encrypt or decrypt values with AWS KMS
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use awsible::lookup::{LookupRegistry, LookupContext};
//!
//! let registry = LookupRegistry::with_kms(connector);
//! let context = LookupContext::default();
//!
//! let secret = registry.lookup("kms", &["alias/app", "enc", "my-password"], &context)?;
//! ```

pub mod kms;

pub use kms::{KmsClient, KmsConnector, KmsLookup, KmsSession};

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::error::{Error, ProviderError};

/// Errors that can occur during lookup operations
#[derive(Error, Debug)]
pub enum LookupError {
    /// Lookup plugin not found
    #[error("Lookup plugin not found: {0}")]
    NotFound(String),

    /// Invalid arguments provided to lookup
    #[error("Invalid lookup arguments: {0}")]
    InvalidArguments(String),

    /// Missing required argument
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Remote service call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Generic lookup error
    #[error("{0}")]
    Other(String),
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Provider(e) => Error::Provider(e),
            LookupError::InvalidArguments(msg) | LookupError::MissingArgument(msg) => {
                Error::Validation(msg)
            }
            other => Error::Other {
                message: other.to_string(),
                source: None,
            },
        }
    }
}

/// Result type for lookup operations
pub type LookupResult<T> = Result<T, LookupError>;

/// Context for lookup plugin execution
#[derive(Debug, Clone)]
pub struct LookupContext {
    /// Variables available during lookup
    pub vars: HashMap<String, serde_json::Value>,

    /// Whether to fail on errors or return default values
    pub fail_on_error: bool,

    /// Default value to return when lookup fails and fail_on_error is false
    pub default_value: Option<String>,
}

impl Default for LookupContext {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupContext {
    /// Create a new lookup context
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
            fail_on_error: true,
            default_value: None,
        }
    }

    /// Set variables available to plugins
    pub fn with_vars(mut self, vars: HashMap<String, serde_json::Value>) -> Self {
        self.vars = vars;
        self
    }

    /// Set whether to fail on errors
    pub fn with_fail_on_error(mut self, fail: bool) -> Self {
        self.fail_on_error = fail;
        self
    }

    /// Set default value for failed lookups
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}

/// Trait that all lookup plugins must implement
pub trait Lookup: Send + Sync {
    /// Returns the name of the lookup plugin
    fn name(&self) -> &'static str;

    /// Returns a description of what this lookup does
    fn description(&self) -> &'static str;

    /// Execute the lookup with the given arguments
    ///
    /// Returns one string per resolved value.
    fn lookup(&self, args: &[&str], context: &LookupContext) -> LookupResult<Vec<String>>;

    /// Parse key=value arguments from the args list
    fn parse_options(&self, args: &[&str]) -> HashMap<String, String> {
        let mut options = HashMap::new();
        for arg in args {
            if let Some((key, value)) = arg.split_once('=') {
                options.insert(key.to_string(), value.to_string());
            }
        }
        options
    }
}

/// Registry for looking up plugins by name
pub struct LookupRegistry {
    plugins: HashMap<String, Arc<dyn Lookup>>,
}

impl LookupRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Create a registry holding the KMS lookup
    pub fn with_kms(connector: Arc<dyn KmsConnector>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(KmsLookup::new(connector)));
        registry
    }

    /// Register a lookup plugin
    pub fn register(&mut self, plugin: Arc<dyn Lookup>) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Get a lookup plugin by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Lookup>> {
        self.plugins.get(name).cloned()
    }

    /// Check if a lookup plugin exists
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Get all registered plugin names
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(|s| s.as_str()).collect()
    }

    /// Execute a lookup by plugin name
    pub fn lookup(
        &self,
        name: &str,
        args: &[&str],
        context: &LookupContext,
    ) -> LookupResult<Vec<String>> {
        let plugin = self
            .get(name)
            .ok_or_else(|| LookupError::NotFound(name.to_string()))?;

        match plugin.lookup(args, context) {
            Ok(result) => Ok(result),
            Err(e) if !context.fail_on_error => {
                tracing::debug!(plugin = name, error = %e, "Lookup failed, using default");
                Ok(vec![context.default_value.clone().unwrap_or_default()])
            }
            Err(e) => Err(e),
        }
    }

    /// Execute a lookup and return a single value
    pub fn lookup_first(
        &self,
        name: &str,
        args: &[&str],
        context: &LookupContext,
    ) -> LookupResult<String> {
        let results = self.lookup(name, args, context)?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::Other("Lookup returned no results".to_string()))
    }
}

impl Default for LookupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
