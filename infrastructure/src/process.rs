//! Shared helpers for running local programs.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Exit status and captured streams of a finished program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Captured {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stdout followed by stderr, trimmed.
    pub fn combined(&self) -> String {
        let mut text = self.stdout.trim_end().to_string();
        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr);
        }
        text
    }
}

/// Run `program` with `args` in `dir` and capture its output.
///
/// A process killed by a signal reports status `-1`.
pub(crate) async fn run_captured(
    program: &Path,
    args: &[String],
    dir: Option<&Path>,
) -> std::io::Result<Captured> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    let output = cmd.output().await?;
    let captured = Captured {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    debug!(
        "{} {} exited with {}",
        program.display(),
        args.first().map(String::as_str).unwrap_or_default(),
        captured.status
    );
    Ok(captured)
}

/// Locate `name` on `PATH`, falling back to `fallback`.
pub fn resolve_program(name: &str, fallback: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| PathBuf::from(fallback))
}
