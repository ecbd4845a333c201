//! Review server connection descriptor.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default SSH port of a Gerrit-style review server.
pub const DEFAULT_SSH_PORT: u16 = 29418;

/// Connection details for one review server.
///
/// A deployment has two of these: the *downstream* server whose event feed
/// is watched, and the *upstream* server that approved changes are sent to.
///
/// # Example
///
/// ```
/// use relay_domain::Remote;
///
/// let remote = Remote::new("review.example.org", "relay-bot");
/// assert_eq!(
///     remote.ssh_url("relay-bot", "platform/core"),
///     "ssh://relay-bot@review.example.org:29418/platform/core"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub host: String,
    pub port: u16,
    /// Connect and command timeout, in seconds
    pub timeout_secs: u64,
    pub username: String,
    /// Private key used for authentication (agent / default keys when unset)
    pub key_filename: Option<PathBuf>,
    /// Keepalive interval for long-lived sessions, in seconds
    pub keepalive_secs: u64,
}

impl Remote {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            timeout_secs: 10,
            username: username.into(),
            key_filename: None,
            keepalive_secs: 60,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_key_filename(mut self, key: impl Into<PathBuf>) -> Self {
        self.key_filename = Some(key.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }

    /// `user@host` destination for the ssh client
    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// Git URL of `project` on this server, authenticating as `user`.
    pub fn ssh_url(&self, user: &str, project: &str) -> String {
        format!("ssh://{}@{}:{}/{}", user, self.host, self.port, project)
    }

    /// Search URL used when the server cannot tell us the change URL.
    pub fn change_search_url(&self, change_id: &str) -> String {
        format!("https://{}/#q,{},n,z", self.host, change_id)
    }
}
