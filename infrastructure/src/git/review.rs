//! [`ReviewTool`] over `git-review`.

use crate::process::run_captured;
use async_trait::async_trait;
use relay_application::{ReviewTool, VcsError};
use std::path::PathBuf;
use tracing::debug;

/// Install location used when `git-review` is not on `PATH`.
pub const GIT_REVIEW_FALLBACK: &str = "/usr/local/bin/git-review";

/// Runs `git-review` in one working directory.
///
/// Output of failed runs carries stdout and stderr together, which is what
/// ends up in the downstream comment.
pub struct GitReview {
    dir: PathBuf,
    program: PathBuf,
}

impl GitReview {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }

    async fn run(&self, args: Vec<String>) -> Result<(), VcsError> {
        let command = format!("git-review {}", args.join(" "));
        debug!("Running {} in {}", command, self.dir.display());

        let captured = run_captured(&self.program, &args, Some(&self.dir))
            .await
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;
        if captured.success() {
            Ok(())
        } else {
            Err(VcsError::CommandFailed {
                command,
                status: captured.status,
                output: captured.combined(),
            })
        }
    }
}

fn download_args(remote: &str, change_ref: &str) -> Vec<String> {
    vec!["-r".into(), remote.into(), "-d".into(), change_ref.into()]
}

fn upload_args(remote: &str, branch: &str, topic: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "-R".to_string(),
        "-y".to_string(),
        "-r".to_string(),
        remote.to_string(),
        branch.to_string(),
    ];
    if let Some(topic) = topic {
        args.push("-t".into());
        args.push(topic.into());
    }
    args
}

#[async_trait]
impl ReviewTool for GitReview {
    async fn download(&self, remote: &str, change_ref: &str) -> Result<(), VcsError> {
        self.run(download_args(remote, change_ref)).await
    }

    async fn upload(&self, remote: &str, branch: &str, topic: Option<&str>) -> Result<(), VcsError> {
        self.run(upload_args(remote, branch, topic)).await
    }
}
