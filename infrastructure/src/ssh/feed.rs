//! Event feed over a long-lived `ssh … gerrit stream-events` process.

use super::args::{connection_args, remote_command_line};
use async_trait::async_trait;
use relay_application::{EventFeed, EventSession, FeedError};
use relay_domain::{Remote, ServerCommand};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

/// Opens one `ssh` child process per session.
pub struct SshEventFeed {
    remote: Remote,
    program: PathBuf,
    command: ServerCommand,
}

impl SshEventFeed {
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            program: PathBuf::from("ssh"),
            command: ServerCommand::stream_events(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Run another remote command instead of `gerrit stream-events`.
    pub fn with_command(mut self, command: ServerCommand) -> Self {
        self.command = command;
        self
    }
}

#[async_trait]
impl EventFeed for SshEventFeed {
    async fn connect(&self) -> Result<Box<dyn EventSession>, FeedError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(connection_args(&self.remote, true))
            .arg(remote_command_line(&self.command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| FeedError::Connect(format!("{}: {}", self.program.display(), e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FeedError::Connect("stdout not captured".into()))?;

        if let Some(stderr) = child.stderr.take() {
            let destination = self.remote.destination();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut buf = Vec::new();
                while let Ok(Some(line)) = read_line_lossy(&mut reader, &mut buf).await {
                    warn!("ssh {}: {}", destination, line);
                }
            });
        }

        debug!("Event stream process started for {}", self.remote.destination());
        Ok(Box::new(SshEventSession {
            child,
            stdout: BufReader::new(stdout),
            buf: Vec::new(),
        }))
    }

    fn describe(&self) -> String {
        format!("{}:{}", self.remote.destination(), self.remote.port)
    }
}

/// Read one `\n`-terminated line, replacing invalid UTF-8.
///
/// A bad byte sequence must not end the session: the line is handed on and
/// dropped later by the JSON parser. Returns `None` at end of stream.
async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}

struct SshEventSession {
    child: Child,
    stdout: BufReader<ChildStdout>,
    buf: Vec<u8>,
}

#[async_trait]
impl EventSession for SshEventSession {
    async fn next_line(&mut self) -> Result<Option<String>, FeedError> {
        if let Some(line) = read_line_lossy(&mut self.stdout, &mut self.buf).await? {
            return Ok(Some(line));
        }
        let status = self.child.wait().await?;
        match status.code() {
            Some(0) => Ok(None),
            Some(code) => Err(FeedError::Exited(code)),
            None => Err(FeedError::Exited(-1)),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!("Event stream process already gone: {}", e);
        }
        let _ = self.child.wait().await;
    }
}
