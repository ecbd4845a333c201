//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! [`FileConfig::to_relay_config`] validates them and builds the
//! application-level [`RelayConfig`].

mod daemon;
mod projects;
mod remote;

pub use daemon::FileDaemonConfig;
pub use projects::{FileLabelConfig, FileProjectConfig};
pub use remote::{FileRemoteConfig, FileUpstreamConfig};

use relay_application::RelayConfig;
use relay_domain::{GitIdentity, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("[{section}] host cannot be empty")]
    EmptyHost { section: &'static str },

    #[error("[{section}] timeout cannot be 0")]
    ZeroTimeout { section: &'static str },

    #[error("[upstream] trigger cannot be empty")]
    EmptyTrigger,

    #[error("[daemon] workers cannot be 0")]
    ZeroWorkers,

    #[error("label {name} in {scope}: min ({min}) must be lower than max ({max})")]
    InvalidLabelBounds {
        scope: String,
        name: String,
        min: i32,
        max: i32,
    },

    #[error("project {0} is configured more than once")]
    DuplicateProject(String),

    #[error("project {0}: source cannot be empty")]
    EmptySource(String),
}

/// Raw `[git_config]` section: the service commit identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGitConfig {
    pub name: String,
    pub email: String,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Server whose events are watched
    pub downstream: FileRemoteConfig,
    /// Server changes are sent to
    pub upstream: FileUpstreamConfig,
    pub git_config: FileGitConfig,
    pub daemon: FileDaemonConfig,
    /// Label requirements for projects without their own list
    pub upstream_labels: Vec<FileLabelConfig>,
    pub projects: Vec<FileProjectConfig>,
}

impl FileConfig {
    /// Validate the configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (section, remote) in [
            ("downstream", &self.downstream),
            ("upstream", &self.upstream.remote),
        ] {
            if remote.host.trim().is_empty() {
                return Err(ConfigValidationError::EmptyHost { section });
            }
            if remote.timeout == 0 {
                return Err(ConfigValidationError::ZeroTimeout { section });
            }
        }

        if self.upstream.trigger.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTrigger);
        }

        if self.daemon.workers == 0 {
            return Err(ConfigValidationError::ZeroWorkers);
        }

        check_labels("upstream_labels", &self.upstream_labels)?;

        let mut seen = HashSet::new();
        for project in &self.projects {
            if !seen.insert(project.name.as_str()) {
                return Err(ConfigValidationError::DuplicateProject(project.name.clone()));
            }
            if let Some(labels) = &project.upstream_labels {
                check_labels(&format!("project {}", project.name), labels)?;
            }
            if project.source.as_ref().is_some_and(|s| s.trim().is_empty()) {
                return Err(ConfigValidationError::EmptySource(project.name.clone()));
            }
        }

        Ok(())
    }

    /// Validate and convert into the application configuration.
    pub fn to_relay_config(&self) -> Result<RelayConfig, ConfigValidationError> {
        self.validate()?;

        let mut config = RelayConfig::new(self.downstream.to_remote(), self.upstream.remote.to_remote())
            .with_trigger(Trigger::new(self.upstream.trigger.trim()))
            .with_git_identity(GitIdentity::new(&self.git_config.name, &self.git_config.email))
            .with_default_labels(self.upstream_labels.iter().map(FileLabelConfig::to_spec).collect())
            .with_daemon(self.daemon.to_params());
        for project in &self.projects {
            config = config.with_project(project.to_project());
        }
        Ok(config)
    }
}

fn check_labels(scope: &str, labels: &[FileLabelConfig]) -> Result<(), ConfigValidationError> {
    for label in labels {
        if label.to_spec().validate().is_err() {
            return Err(ConfigValidationError::InvalidLabelBounds {
                scope: scope.to_string(),
                name: label.name.clone(),
                min: label.min,
                max: label.max,
            });
        }
    }
    Ok(())
}

/// Expand a leading `~` to the home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{}", home.display(), &path[1..]);
        }
    }
    path.to_string()
}
