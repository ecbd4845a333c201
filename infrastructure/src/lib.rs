//! Infrastructure layer for review-relay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod git;
pub mod logging;
mod process;
pub mod ssh;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigLoader, ConfigValidationError, FileConfig, FileConfigSource,
    PROJECT_CONFIG_FILE,
};
pub use git::{GitCli, GitReview, ProcessTooling};
pub use logging::JsonlAuditLogger;
pub use process::resolve_program;
pub use ssh::{SshCommandChannel, SshEventFeed};
