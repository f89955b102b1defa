//! Domain error types

use thiserror::Error;

/// Error when parsing an operating mode string
#[derive(Debug, Clone, Error)]
#[error("Invalid mode: \"{input}\". Valid modes are: automatic, confirm_first")]
pub struct InvalidModeError {
    pub input: String,
}

/// Error when parsing an accuracy or quality tier string
#[derive(Debug, Clone, Error)]
#[error("Invalid tier: \"{input}\". Valid tiers are: low, medium, high")]
pub struct InvalidTierError {
    pub input: String,
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}
