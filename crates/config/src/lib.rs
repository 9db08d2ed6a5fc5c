//! Configuration management for the Ondu reader
//!
//! Supports loading configuration from:
//! - TOML/YAML files (`config/default`, `config/<env>`)
//! - Environment variables (`ONDU__` prefix, `__` separator)

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, ApiConfig, ObservabilityConfig, PlaylistConfig,
    ReconcilerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
