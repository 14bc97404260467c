//! `Settings`: the tunable surface the spec's Environment section allows in
//! practice — queue capacities, the graceful-shutdown window, and server
//! bind address/log level. Defaults match the spec's recommended values so
//! an unconfigured run behaves per spec.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerSettings::default(),
            pipeline: PipelineSettings::default(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_ws_path")]
    pub ws_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), ws_path: default_ws_path() }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Queue capacities and timing for the three-stage pipeline (§4.1, §4.3, §5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Bounded capacity for `IngressQ`, `SentenceQ`, `AudioQ` (§4.1:
    /// 32-128 items recommended).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Time allotted to drain the three queues and tear down session
    /// workers on disconnect (§5).
    #[serde(default = "default_graceful_shutdown_ms")]
    pub graceful_shutdown_ms: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            graceful_shutdown_ms: default_graceful_shutdown_ms(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

fn default_graceful_shutdown_ms() -> u64 {
    5_000
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(32..=128).contains(&self.pipeline.queue_capacity) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.queue_capacity".to_string(),
                message: format!(
                    "must be between 32 and 128, got {}",
                    self.pipeline.queue_capacity
                ),
            });
        }

        if self.pipeline.graceful_shutdown_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.graceful_shutdown_ms".to_string(),
                message: "must be at least 1ms".to_string(),
            });
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port cannot be 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Loads settings from `config/default.toml`, an optional `config/{env}.toml`
/// overlay, then `PARLANCE__`-prefixed environment variables, in that
/// priority order, and validates the result.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder
        .add_source(Environment::with_prefix("PARLANCE").separator("__").try_parsing(true));

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    tracing::debug!(?settings, "configuration loaded");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn queue_capacity_out_of_range_is_rejected() {
        let mut settings = Settings::default();
        settings.pipeline.queue_capacity = 16;
        assert!(settings.validate().is_err());

        settings.pipeline.queue_capacity = 256;
        assert!(settings.validate().is_err());

        settings.pipeline.queue_capacity = 64;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_graceful_shutdown_is_rejected() {
        let mut settings = Settings::default();
        settings.pipeline.graceful_shutdown_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }
}
