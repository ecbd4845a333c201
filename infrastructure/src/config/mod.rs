//! Configuration file loading for review-relay
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `REVIEW_RELAY_*` environment variables (`REVIEW_RELAY_DAEMON__WORKERS=3`)
//! 2. `--config <path>` specified file
//! 3. Project root: `./review-relay.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/review-relay/config.toml`
//! 5. Default values

mod file_config;
mod loader;
mod source;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDaemonConfig, FileGitConfig, FileLabelConfig,
    FileProjectConfig, FileRemoteConfig, FileUpstreamConfig,
};
pub use loader::{ConfigError, ConfigLoader, ENV_PREFIX, PROJECT_CONFIG_FILE};
pub use source::FileConfigSource;
