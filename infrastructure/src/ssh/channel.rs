//! Command channel over the system `ssh` client.

use super::args::{connection_args, remote_command_line};
use crate::process::run_captured;
use async_trait::async_trait;
use relay_application::{ChannelError, CommandChannel, CommandOutput};
use relay_domain::{Remote, ServerCommand};
use std::path::PathBuf;
use tracing::debug;

/// Runs each command as one `ssh` invocation bounded by the remote timeout.
pub struct SshCommandChannel {
    remote: Remote,
    program: PathBuf,
}

impl SshCommandChannel {
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            program: PathBuf::from("ssh"),
        }
    }

    /// Use another client binary (a wrapper script, or a fake in tests).
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, command: &ServerCommand) -> Vec<String> {
        let mut args = connection_args(&self.remote, false);
        args.push(remote_command_line(command));
        args
    }
}

#[async_trait]
impl CommandChannel for SshCommandChannel {
    fn remote(&self) -> &Remote {
        &self.remote
    }

    async fn execute(&self, command: &ServerCommand) -> Result<CommandOutput, ChannelError> {
        debug!("ssh {}: {}", self.remote.destination(), command.summary());
        let deadline = self.remote.timeout();

        let captured = tokio::time::timeout(deadline, run_captured(&self.program, &self.args(command), None))
            .await
            .map_err(|_| ChannelError::Timeout(deadline))?
            .map_err(|source| ChannelError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        Ok(if captured.success() {
            CommandOutput::success(captured.stdout)
        } else {
            CommandOutput::failure(captured.status, captured.stderr)
        })
    }
}
