//! Daemon configuration from TOML (`[daemon]` section)

use relay_application::DaemonParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw daemon configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDaemonConfig {
    /// Concurrent propagation attempts
    pub workers: usize,
    /// Queue poll interval in seconds
    pub poll_interval: u64,
    /// Event stream reconnect delay in seconds
    pub reconnect_delay: u64,
    /// Dispatch comment events to the propagation workflow
    pub propagate: bool,
    /// Parent directory of scratch repositories (`~` is expanded)
    pub scratch_root: String,
    /// Re-sync mirrored projects on upstream `ref-updated` events
    pub sync: bool,
    /// Seconds between an upstream ref update and the scheduled sync
    pub delay: u64,
}

impl Default for FileDaemonConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            poll_interval: 5,
            reconnect_delay: 5,
            propagate: true,
            scratch_root: "~/tmp".to_string(),
            sync: true,
            delay: 120,
        }
    }
}

impl FileDaemonConfig {
    pub fn to_params(&self) -> DaemonParams {
        DaemonParams::default()
            .with_workers(self.workers)
            .with_poll_interval(Duration::from_secs(self.poll_interval))
            .with_reconnect_delay(Duration::from_secs(self.reconnect_delay))
            .with_propagate(self.propagate)
            .with_scratch_root(super::expand_tilde(&self.scratch_root))
            .with_sync(self.sync)
            .with_sync_delay(Duration::from_secs(self.delay))
    }
}
