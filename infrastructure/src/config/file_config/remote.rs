//! Server sections from TOML (`[downstream]`, `[upstream]`)

use relay_domain::{DEFAULT_SSH_PORT, DEFAULT_TRIGGER, Remote};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw connection settings for one review server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRemoteConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Private key passed to ssh with `-i`
    pub key_filename: Option<String>,
    /// Connect and command timeout in seconds
    pub timeout: u64,
    /// Keepalive interval in seconds for the event stream
    pub keepalive: u64,
}

impl Default for FileRemoteConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_SSH_PORT,
            username: "SomeUser".to_string(),
            key_filename: None,
            timeout: 10,
            keepalive: 60,
        }
    }
}

impl FileRemoteConfig {
    pub fn to_remote(&self) -> Remote {
        Remote {
            host: self.host.trim().to_string(),
            port: self.port,
            timeout_secs: self.timeout,
            username: self.username.clone(),
            key_filename: self
                .key_filename
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .map(|k| PathBuf::from(super::expand_tilde(k))),
            keepalive_secs: self.keepalive,
        }
    }
}

/// Raw `[upstream]` section: a server plus the trigger token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUpstreamConfig {
    #[serde(flatten)]
    pub remote: FileRemoteConfig,
    /// Comment token that requests propagation
    pub trigger: String,
}

impl Default for FileUpstreamConfig {
    fn default() -> Self {
        Self {
            remote: FileRemoteConfig {
                host: String::new(),
                ..FileRemoteConfig::default()
            },
            trigger: DEFAULT_TRIGGER.to_string(),
        }
    }
}
