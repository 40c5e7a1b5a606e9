//! Configuration for catbus binaries.
//!
//! Supports YAML file and environment variable overrides.

use serde::Deserialize;

use crate::dispatcher::DispatcherConfig;
use crate::transport::TransportConfig;

/// Config file looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "catbus.yaml";
/// Environment variable naming an additional, required config file.
pub const CONFIG_ENV_VAR: &str = "CATBUS_CONFIG";
/// Prefix for environment overrides, e.g. `CATBUS__DISPATCHER__ENDPOINT`.
pub const CONFIG_ENV_PREFIX: &str = "CATBUS";
/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "CATBUS_LOG";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub transport: TransportConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// Sources, later ones winning: `catbus.yaml` in the working directory,
    /// the file at `path`, the file named by `CATBUS_CONFIG`, then
    /// `CATBUS__`-prefixed environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing: in-process channels, default endpoint.
    pub fn for_test() -> Self {
        let mut config = Self::default();
        config.transport.transport_type = crate::transport::TransportType::Channel;
        config
    }
}
