//! Error types for the Galaxy module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Galaxy operations.
pub type GalaxyResult<T> = Result<T, GalaxyError>;

/// Error type for Galaxy role synchronization.
#[derive(Error, Debug)]
pub enum GalaxyError {
    // ========================================================================
    // Requirements Errors
    // ========================================================================
    /// Requirements file not found.
    #[error("Requirements file not found: {}", path.display())]
    RequirementsFileNotFound { path: PathBuf },

    /// Failed to parse requirements file.
    #[error("Failed to parse requirements file '{}': {message}", path.display())]
    RequirementsParseError { path: PathBuf, message: String },

    /// A role entry that cannot be resolved to a name.
    #[error("Invalid role requirement #{index}: {message}")]
    InvalidRequirement { index: usize, message: String },

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// Command line could not be split into arguments.
    #[error("Invalid command line '{command}': {message}")]
    InvalidCommand { command: String, message: String },

    /// Command could not be started.
    #[error("Failed to run '{command}': {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Command exited with a non-zero status.
    #[error("'{command}' exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    // ========================================================================
    // Filesystem Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl GalaxyError {
    /// Create a requirements parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::RequirementsParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error came from an external command.
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCommand { .. } | Self::CommandSpawn { .. } | Self::CommandFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GalaxyError::CommandFailed {
            command: "ansible-galaxy install -r requirements.yml nginx".to_string(),
            status: 1,
            stderr: "role not found".to_string(),
        };
        assert!(err.to_string().contains("exited with status 1"));
        assert!(err.is_command_error());

        let err = GalaxyError::parse("requirements.yml", "bad yaml");
        assert!(err.to_string().contains("requirements.yml"));
        assert!(!err.is_command_error());
    }
}
