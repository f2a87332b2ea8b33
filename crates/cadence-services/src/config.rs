//! Engine configuration stored as TOML in the user config directory

use std::path::{Path, PathBuf};

use cadence_core::progressive::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Progressions kept before the least recently used is evicted
    pub progressive_cache_capacity: usize,
    /// Seed for progressive lengthening
    pub random_seed: u64,
    /// Dispatch-to-control event slots; events beyond this are dropped
    pub event_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progressive_cache_capacity: DEFAULT_CACHE_CAPACITY,
            random_seed: 0x00C0_FFEE,
            event_queue_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
        .join("engine.toml")
}

pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    EngineConfig::from_toml_str(&text)
}

/// Load from [`config_path`], falling back to defaults
pub fn load_config() -> EngineConfig {
    let path = config_path();
    if !path.exists() {
        return EngineConfig::default();
    }
    match load_config_from(&path) {
        Ok(config) => {
            info!(path = %path.display(), "Loaded engine config");
            config
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "Ignoring unreadable engine config");
            EngineConfig::default()
        }
    }
}

pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_toml_string()?)?;
    Ok(())
}

pub fn save_config(config: &EngineConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_path())
}
