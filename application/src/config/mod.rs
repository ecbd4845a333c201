//! Application-level configuration.
//!
//! - [`RelayConfig`]: servers, trigger, labels and projects
//! - [`DaemonParams`]: consumer loop, worker pool, scratch directory and sync scheduling

pub mod daemon_params;
pub mod relay_config;

pub use daemon_params::{DEFAULT_RECONNECT_DELAY, DEFAULT_SYNC_DELAY, DaemonParams};
pub use relay_config::RelayConfig;
