//! Configuration source port
//!
//! The propagation workflow asks for configuration once per attempt, so edits
//! to the underlying file take effect on the next event.

use crate::config::RelayConfig;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Configuration unavailable: {0}")]
pub struct ConfigSourceError(pub String);

pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<Arc<RelayConfig>, ConfigSourceError>;
}

/// A fixed, already-loaded configuration
pub struct StaticConfig(Arc<RelayConfig>);

impl StaticConfig {
    pub fn new(config: RelayConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigSource for StaticConfig {
    fn load(&self) -> Result<Arc<RelayConfig>, ConfigSourceError> {
        Ok(Arc::clone(&self.0))
    }
}
