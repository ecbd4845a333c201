//! Local repository ports
//!
//! [`Vcs`] covers the version-control operations the relay needs in a scratch
//! working directory: preparing a change transfer and mirroring a project from
//! its source. [`ReviewTool`] is the review-submission tool that moves a
//! single change in and out of that directory. [`LocalTooling`] hands out both,
//! bound to one directory.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Errors from a local tool invocation
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("`{command}` exited with status {status}")]
    CommandFailed {
        command: String,
        status: i32,
        output: String,
    },

    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl VcsError {
    /// Captured output of a command that ran and failed.
    pub fn output(&self) -> Option<&str> {
        match self {
            VcsError::CommandFailed { output, .. } => Some(output),
            VcsError::Spawn { .. } => None,
        }
    }
}

/// Flags for [`Vcs::push`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub all: bool,
    pub tags: bool,
    pub force: bool,
    pub refspecs: Vec<String>,
}

/// Flags for [`Vcs::clone_from`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    pub bare: bool,
    /// Target directory name, relative to the working directory.
    pub target: Option<String>,
}

/// Flags for [`Vcs::remote_refs`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteRefsOptions {
    pub heads: bool,
    pub tags: bool,
}

/// Version-control operations in one working directory.
///
/// Each call is a single external process invocation; a non-zero exit is
/// reported as [`VcsError::CommandFailed`].
#[async_trait]
pub trait Vcs: Send + Sync {
    async fn init(&self) -> Result<(), VcsError>;

    async fn add_remote(&self, name: &str, url: &str) -> Result<(), VcsError>;

    async fn set_config(&self, key: &str, value: &str) -> Result<(), VcsError>;

    async fn push(&self, remote: &str, options: &PushOptions) -> Result<(), VcsError>;

    async fn clone_from(&self, source: &str, options: &CloneOptions) -> Result<(), VcsError>;

    /// List ref names advertised by `remote`.
    async fn remote_refs(
        &self,
        remote: &str,
        options: RemoteRefsOptions,
    ) -> Result<BTreeSet<String>, VcsError>;
}

/// The review-submission tool.
#[async_trait]
pub trait ReviewTool: Send + Sync {
    /// Download `change_ref` (`<change-id>,<patchset>`) from `remote` into the
    /// working tree.
    async fn download(&self, remote: &str, change_ref: &str) -> Result<(), VcsError>;

    /// Upload the current commit to `remote` for review on `branch`.
    async fn upload(&self, remote: &str, branch: &str, topic: Option<&str>)
    -> Result<(), VcsError>;
}

/// Factory binding local tools to a working directory
pub trait LocalTooling: Send + Sync {
    fn vcs(&self, dir: &Path) -> Box<dyn Vcs>;

    fn review_tool(&self, dir: &Path) -> Box<dyn ReviewTool>;
}
