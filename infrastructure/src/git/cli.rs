//! [`Vcs`] over the `git` command line.

use crate::process::run_captured;
use async_trait::async_trait;
use relay_application::{CloneOptions, PushOptions, RemoteRefsOptions, Vcs, VcsError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Runs `git` in one working directory.
pub struct GitCli {
    dir: PathBuf,
    program: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            program: program.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn git(&self, args: Vec<String>) -> Result<String, VcsError> {
        let command = format!("git {}", args.first().map(String::as_str).unwrap_or_default());
        let captured = run_captured(&self.program, &args, Some(&self.dir))
            .await
            .map_err(|source| VcsError::Spawn {
                command: command.clone(),
                source,
            })?;
        if captured.success() {
            Ok(captured.stdout)
        } else {
            Err(VcsError::CommandFailed {
                command,
                status: captured.status,
                output: captured.combined(),
            })
        }
    }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn push_args(remote: &str, options: &PushOptions) -> Vec<String> {
    let mut args = strings(["push"]);
    if options.all {
        args.push("--all".into());
    }
    if options.tags {
        args.push("--tags".into());
    }
    if options.force {
        args.push("--force".into());
    }
    args.push(remote.into());
    args.extend(options.refspecs.iter().cloned());
    args
}

fn clone_args(source: &str, options: &CloneOptions) -> Vec<String> {
    let mut args = strings(["clone"]);
    if options.bare {
        args.push("--bare".into());
    }
    args.push(source.into());
    if let Some(target) = &options.target {
        args.push(target.clone());
    }
    args
}

fn ls_remote_args(remote: &str, options: RemoteRefsOptions) -> Vec<String> {
    let mut args = strings(["ls-remote"]);
    if options.heads {
        args.push("--heads".into());
    }
    if options.tags {
        args.push("--tags".into());
    }
    args.push(remote.into());
    args
}

/// Ref names from `git ls-remote` output (`<sha>\t<ref>` per line).
fn parse_ls_remote(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Vcs for GitCli {
    async fn init(&self) -> Result<(), VcsError> {
        self.git(strings(["init"])).await.map(drop)
    }

    async fn add_remote(&self, name: &str, url: &str) -> Result<(), VcsError> {
        self.git(strings(["remote", "add", name, url])).await.map(drop)
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), VcsError> {
        self.git(strings(["config", key, value])).await.map(drop)
    }

    async fn push(&self, remote: &str, options: &PushOptions) -> Result<(), VcsError> {
        self.git(push_args(remote, options)).await.map(drop)
    }

    async fn clone_from(&self, source: &str, options: &CloneOptions) -> Result<(), VcsError> {
        self.git(clone_args(source, options)).await.map(drop)
    }

    async fn remote_refs(
        &self,
        remote: &str,
        options: RemoteRefsOptions,
    ) -> Result<BTreeSet<String>, VcsError> {
        let output = self.git(ls_remote_args(remote, options)).await?;
        Ok(parse_ls_remote(&output))
    }
}
