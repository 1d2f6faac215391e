//! Error types for Awsible.
//!
//! This module defines the error types used throughout Awsible. The three
//! reconciliation failure classes are kept distinct:
//!
//! - [`Error::Validation`]: the desired spec is structurally invalid. Raised
//!   before any provider call is issued.
//! - [`Error::Provider`]: a remote call failed after validation passed.
//! - [`Error::NotFound`]: a resource the caller required to exist is missing.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Awsible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of a provider failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The addressed resource does not exist.
    NotFound,
    /// Credentials were rejected or missing.
    Auth,
    /// The provider throttled the request.
    Throttled,
    /// Anything else.
    Other,
}

/// Failure reported by a cloud provider client.
///
/// Carries the provider's own error code verbatim so callers can surface it
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Provider error code (e.g. `ValidationError`, `DBInstanceNotFound`)
    pub code: String,
    /// Human-readable message from the provider
    pub message: String,
    /// Classification used for not-found handling
    pub kind: ProviderErrorKind,
}

/// Error codes that the AWS APIs in scope use for missing resources.
const NOT_FOUND_CODES: &[&str] = &[
    "NotFound",
    "ResourceNotFound",
    "ResourceNotFoundException",
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBSnapshotNotFound",
    "DBSnapshotNotFoundFault",
    "NotFoundException",
];

const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "ExpiredTokenException",
];

const THROTTLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

impl ProviderError {
    /// Creates a provider error, classifying it from the error code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        let code = code.into();
        let kind = Self::classify(&code);
        Self {
            code,
            message: message.into(),
            kind,
        }
    }

    /// Creates a provider error that is explicitly a not-found failure.
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind: ProviderErrorKind::NotFound,
        }
    }

    /// Returns true if the provider reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.kind == ProviderErrorKind::NotFound
    }

    fn classify(code: &str) -> ProviderErrorKind {
        if NOT_FOUND_CODES.contains(&code) {
            ProviderErrorKind::NotFound
        } else if AUTH_CODES.contains(&code) {
            ProviderErrorKind::Auth
        } else if THROTTLE_CODES.contains(&code) {
            ProviderErrorKind::Throttled
        } else {
            ProviderErrorKind::Other
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// The main error type for Awsible.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Reconciliation Errors
    // ========================================================================
    /// Desired spec is structurally invalid.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Remote provider call failed.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A resource required to exist was not found.
    #[error("Resource '{0}' not found")]
    NotFound(String),

    /// A lifecycle transition that the reconciler never performs.
    #[error("Invalid state transition from {from} on {event}")]
    InvalidTransition {
        /// State before the event
        from: String,
        /// Event that was applied
        event: String,
    },

    // ========================================================================
    // Module Errors
    // ========================================================================
    /// Module not found.
    #[error("Module '{0}' not found")]
    ModuleNotFound(String),

    /// Invalid module arguments.
    #[error("Invalid arguments for module '{module}': {message}")]
    ModuleArgs {
        /// Module name
        module: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Vault Errors
    // ========================================================================
    /// Generic vault error.
    #[error("Vault error: {0}")]
    Vault(String),

    /// Vault password file not found.
    #[error("Vault password file not found: {0}")]
    VaultFileNotFound(PathBuf),

    // ========================================================================
    // Galaxy Errors
    // ========================================================================
    /// Role synchronization failed.
    #[error("Galaxy error: {0}")]
    Galaxy(#[from] crate::galaxy::GalaxyError),

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Generic error with source.
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
        /// Source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a new provider error.
    pub fn provider(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider(ProviderError::new(code, message))
    }

    /// Creates a new module args error.
    pub fn module_args(module: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModuleArgs {
            module: module.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error was raised before any provider call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::ModuleArgs { .. })
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::ModuleArgs { .. } => 2,
            Error::Provider(_) => 3,
            Error::NotFound(_) => 4,
            Error::Galaxy(_) => 5,
            Error::Vault(_) | Error::VaultFileNotFound(_) => 6,
            _ => 1,
        }
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Adds context with a closure that is only evaluated on error.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Other {
            message: message.into(),
            source: Some(Box::new(e)),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::Other {
            message: f().into(),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_classification() {
        assert!(ProviderError::new("DBInstanceNotFound", "gone").is_not_found());
        assert!(ProviderError::new("ResourceNotFoundException", "gone").is_not_found());
        assert_eq!(
            ProviderError::new("Throttling", "slow down").kind,
            ProviderErrorKind::Throttled
        );
        assert_eq!(
            ProviderError::new("AccessDenied", "no").kind,
            ProviderErrorKind::Auth
        );
        assert!(!ProviderError::new("ValidationError", "bad").is_not_found());
    }

    #[test]
    fn test_provider_error_display_keeps_code() {
        let err = Error::from(ProviderError::new("ValidationError", "bad input"));
        assert_eq!(err.to_string(), "Provider error: ValidationError: bad input");
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_validation_exit_code() {
        let err = Error::validation("missing field");
        assert!(err.is_validation());
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_error_context() {
        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = io.context("reading requirements").unwrap_err();
        assert_eq!(err.to_string(), "reading requirements");
    }
}
