//! [`ConfigSource`] backed by the configuration files.

use super::loader::ConfigLoader;
use relay_application::{ConfigSource, ConfigSourceError, RelayConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Re-reads and validates the configuration on every `load`.
pub struct FileConfigSource {
    config_path: Option<PathBuf>,
}

impl FileConfigSource {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<Arc<RelayConfig>, ConfigSourceError> {
        debug!("Reloading configuration");
        ConfigLoader::load_relay_config(self.config_path.as_deref())
            .map(Arc::new)
            .map_err(|e| ConfigSourceError(e.to_string()))
    }
}
