//! [`LocalTooling`] spawning real `git` and `git-review` processes.

use super::cli::GitCli;
use super::review::{GIT_REVIEW_FALLBACK, GitReview};
use crate::process::resolve_program;
use relay_application::{LocalTooling, ReviewTool, Vcs};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ProcessTooling {
    git: PathBuf,
    git_review: PathBuf,
}

impl ProcessTooling {
    /// Locate both programs on `PATH`.
    pub fn discover() -> Self {
        let tooling = Self {
            git: resolve_program("git", "git"),
            git_review: resolve_program("git-review", GIT_REVIEW_FALLBACK),
        };
        debug!(
            "Using git at {}, git-review at {}",
            tooling.git.display(),
            tooling.git_review.display()
        );
        tooling
    }

    pub fn new(git: impl Into<PathBuf>, git_review: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            git_review: git_review.into(),
        }
    }

    pub fn git_review(&self) -> &Path {
        &self.git_review
    }
}

impl LocalTooling for ProcessTooling {
    fn vcs(&self, dir: &Path) -> Box<dyn Vcs> {
        Box::new(GitCli::new(dir, &self.git))
    }

    fn review_tool(&self, dir: &Path) -> Box<dyn ReviewTool> {
        Box::new(GitReview::new(dir, &self.git_review))
    }
}
