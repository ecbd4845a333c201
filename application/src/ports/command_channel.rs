//! Command channel port
//!
//! Defines how the application layer runs a single command against a review
//! server. The adapter owns transport, authentication and argument escaping.

use async_trait::async_trait;
use relay_domain::{Remote, ServerCommand};
use std::time::Duration;
use thiserror::Error;

/// Result of one command execution.
///
/// When `exit_status` is non-zero, `output` carries the command's error
/// output instead of its standard output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: i32,
    pub output: String,
}

impl CommandOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_status: 0,
            output: output.into(),
        }
    }

    pub fn failure(exit_status: i32, output: impl Into<String>) -> Self {
        Self {
            exit_status,
            output: output.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == 0
    }
}

/// Errors raised before a command produced an exit status
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

/// Runs commands on one review server
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// The server this channel talks to.
    fn remote(&self) -> &Remote;

    /// Execute `command` and wait for it to finish.
    async fn execute(&self, command: &ServerCommand) -> Result<CommandOutput, ChannelError>;
}
