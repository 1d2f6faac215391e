//! External command execution for Galaxy operations.

use std::path::PathBuf;
use std::process::Command;

use tracing::trace;

use super::error::{GalaxyError, GalaxyResult};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }

    /// Converts a non-zero exit into [`GalaxyError::CommandFailed`].
    pub fn into_result(self, command: &str) -> GalaxyResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GalaxyError::CommandFailed {
                command: command.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs a command line. A non-zero exit is returned as output, not as an error.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> GalaxyResult<CommandOutput>;
}

/// Joins arguments into a command line, quoting where needed.
pub fn command_line(parts: &[&str]) -> String {
    shell_words::join(parts)
}

/// Runs commands as child processes without a shell.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    work_dir: Option<PathBuf>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &str) -> GalaxyResult<CommandOutput> {
        let argv = shell_words::split(command).map_err(|e| GalaxyError::InvalidCommand {
            command: command.to_string(),
            message: e.to_string(),
        })?;
        let (program, args) = argv.split_first().ok_or_else(|| GalaxyError::InvalidCommand {
            command: command.to_string(),
            message: "empty command".to_string(),
        })?;

        trace!(command, "Running command");
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|source| GalaxyError::CommandSpawn {
            command: command.to_string(),
            source,
        })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
