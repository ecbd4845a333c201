//! Resolved relay configuration.
//!
//! [`RelayConfig`] is the validated, in-memory form of the configuration file.
//! The infrastructure layer builds it; use cases only read it.

use super::daemon_params::DaemonParams;
use relay_domain::{GitIdentity, LabelSpec, Remote, ReviewProject, Trigger};

/// Everything one propagation attempt needs to know about the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Server whose event feed is watched and where results are reported.
    pub downstream: Remote,
    /// Server approved changes are sent to.
    pub upstream: Remote,
    /// Token that requests propagation.
    pub trigger: Trigger,
    /// Commit identity used when the change owner cannot be used.
    pub git_identity: GitIdentity,
    /// Label requirements for projects that declare none.
    pub default_labels: Vec<LabelSpec>,
    pub projects: Vec<ReviewProject>,
    pub daemon: DaemonParams,
}

impl RelayConfig {
    pub fn new(downstream: Remote, upstream: Remote) -> Self {
        Self {
            downstream,
            upstream,
            trigger: Trigger::default(),
            git_identity: GitIdentity::default(),
            default_labels: Vec::new(),
            projects: Vec::new(),
            daemon: DaemonParams::default(),
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_git_identity(mut self, identity: GitIdentity) -> Self {
        self.git_identity = identity;
        self
    }

    pub fn with_default_labels(mut self, labels: Vec<LabelSpec>) -> Self {
        self.default_labels = labels;
        self
    }

    pub fn with_project(mut self, project: ReviewProject) -> Self {
        self.projects.push(project);
        self
    }

    pub fn with_daemon(mut self, daemon: DaemonParams) -> Self {
        self.daemon = daemon;
        self
    }

    // ==================== Lookups ====================

    /// Find a project by exact name.
    pub fn project(&self, name: &str) -> Option<&ReviewProject> {
        self.projects.iter().find(|p| p.name == name)
    }

    /// Label requirements for `project`, falling back to the global defaults.
    pub fn labels_for<'a>(&'a self, project: &'a ReviewProject) -> &'a [LabelSpec] {
        project.labels_or(&self.default_labels)
    }
}
