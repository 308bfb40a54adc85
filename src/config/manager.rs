//! Configuration manager core, mirroring the teacher's
//! `ConfigManager`/`ConfigSource` merge pipeline.

use std::sync::{Arc, RwLock};

use super::partial::PartialRuntimeConfig;
use super::source::ConfigSource;
use super::RuntimeConfig;

/// Failure modes of the configuration layer.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading a configuration source.
    Io(std::io::Error),
    /// A source's value failed to parse.
    ParseError(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::ParseError(e) => write!(f, "parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Handle to the merged configuration, returned by [`ConfigManager::config`].
pub struct ConfigHandle(Arc<RwLock<PartialRuntimeConfig>>);

impl ConfigHandle {
    /// Freeze the currently merged configuration.
    pub fn to_complete(&self) -> Result<RuntimeConfig, ConfigError> {
        self.0.read().unwrap().to_complete()
    }
}

/// Merges configuration sources in priority order (lower
/// [`ConfigSource::priority`] applies first, higher overrides it).
pub struct ConfigManager {
    sources: Vec<Box<dyn ConfigSource>>,
    merged: Arc<RwLock<PartialRuntimeConfig>>,
}

impl ConfigManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            merged: Arc::new(RwLock::new(PartialRuntimeConfig::default())),
        }
    }

    /// Register a source.
    pub fn add_source(mut self, source: Box<dyn ConfigSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Load every source and merge them in ascending priority order.
    pub fn load(&self) -> Result<(), ConfigError> {
        let mut sources: Vec<&Box<dyn ConfigSource>> = self.sources.iter().collect();
        sources.sort_by_key(|s| s.priority());
        let mut merged = PartialRuntimeConfig::default();
        for source in sources {
            merged.merge(source.load()?);
        }
        *self.merged.write().unwrap() = merged;
        Ok(())
    }

    /// Handle to the merged partial configuration.
    pub fn config(&self) -> ConfigHandle {
        ConfigHandle(Arc::clone(&self.merged))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
