//! Layered configuration for the conversation streaming core.
//!
//! Loaded from `config/default.toml`, an optional environment-specific
//! overlay, and `PARLANCE__`-prefixed environment variables, in that order
//! of increasing precedence, then validated.

pub mod settings;

pub use settings::{load_settings, PipelineSettings, RuntimeEnvironment, ServerSettings, Settings};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
