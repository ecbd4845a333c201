//! Daemon parameters — consumer loop and worker control.
//!
//! [`DaemonParams`] groups the static parameters of the long-running relay:
//! how often the event queue is polled, how many propagation attempts may run
//! at once, where scratch repositories are created and how soon a mirrored
//! project is re-synced after the upstream server reports a ref update.

use std::path::PathBuf;
use std::time::Duration;

/// Fixed delay between event-stream reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Delay between an upstream ref update and the project sync it schedules.
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_secs(120);

/// Consumer loop and worker pool parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonParams {
    /// Maximum number of concurrent propagation attempts.
    pub workers: usize,
    /// Sleep between queue polls when no event is waiting.
    pub poll_interval: Duration,
    /// Fixed delay before the event stream reconnects.
    pub reconnect_delay: Duration,
    /// Dispatch `comment-added` events to the propagation workflow.
    pub propagate: bool,
    /// Parent directory of per-attempt scratch repositories.
    pub scratch_root: PathBuf,
    /// Schedule mirror syncs from upstream `ref-updated` events.
    pub sync: bool,
    pub sync_delay: Duration,
}

impl Default for DaemonParams {
    fn default() -> Self {
        Self {
            workers: 5,
            poll_interval: Duration::from_secs(5),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            propagate: true,
            scratch_root: std::env::temp_dir().join("review-relay"),
            sync: true,
            sync_delay: DEFAULT_SYNC_DELAY,
        }
    }
}

impl DaemonParams {
    // ==================== Builder Methods ====================

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = delay;
        self
    }
}
