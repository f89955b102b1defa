//! Configuration store port interface

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::config::EngineConfig;
use crate::domain::error::ConfigError;

/// Port for configuration persistence
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Load the config, or an empty config if none exists
    async fn load(&self) -> Result<EngineConfig, ConfigError>;

    /// Save the config
    async fn save(&self, config: &EngineConfig) -> Result<(), ConfigError>;

    /// Get the config file path
    fn path(&self) -> PathBuf;

    /// Check if the config file exists
    fn exists(&self) -> bool;

    /// Create the config file with defaults; fails if it already exists
    async fn init(&self) -> Result<(), ConfigError>;
}
