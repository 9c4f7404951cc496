// ABOUTME: Error types for deployment operations.
// ABOUTME: One variant per failure class so callers can tell bad input from remote failures.

use crate::ssh::{self, CommandOutput};
use std::path::PathBuf;

/// Errors raised by session operations and composite workflows.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Missing connection setting or local key file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An argument failed a precondition (empty, unsafe, or a guarded path).
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// A local file the operation needs does not exist.
    #[error("local file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Handshake, authentication, or transport failure.
    #[error("connection error: {0}")]
    Connection(#[source] ssh::Error),

    /// A remote command exited non-zero.
    #[error(
        "remote command `{command}` exited with code {}: {}",
        output.exit_code,
        output.stderr.trim()
    )]
    Command {
        command: String,
        output: CommandOutput,
    },

    /// Upload of a local file failed.
    #[error("transfer to {remote} failed: {source}")]
    Transfer {
        remote: String,
        #[source]
        source: ssh::Error,
    },

    /// Operation invoked in the wrong session state.
    #[error("invalid session state: {0}")]
    State(String),
}

impl DeployError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        DeployError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// The remote command ran but did not finish successfully: a non-zero
    /// exit, or no exit before the command timeout.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            DeployError::Command { .. } | DeployError::Connection(ssh::Error::CommandTimeout(_))
        )
    }

    /// The remote command output, for command failures.
    pub fn command_output(&self) -> Option<&CommandOutput> {
        match self {
            DeployError::Command { output, .. } => Some(output),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn remote_failures_are_command_errors_and_timeouts() {
        let command = DeployError::Command {
            command: "sudo npm ci --production".to_string(),
            output: CommandOutput {
                exit_code: 1,
                ..Default::default()
            },
        };
        assert!(command.is_remote_failure());

        let timeout = DeployError::Connection(ssh::Error::CommandTimeout(Duration::from_secs(600)));
        assert!(timeout.is_remote_failure());

        assert!(!DeployError::Connection(ssh::Error::ChannelClosed).is_remote_failure());
        assert!(!DeployError::validation("app directory", "value is required").is_remote_failure());
        assert!(!DeployError::State("not connected".to_string()).is_remote_failure());
    }
}
