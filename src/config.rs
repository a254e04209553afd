//! Configuration management for RyDrive
//!
//! Configuration is read once at startup and never changes afterwards.
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, `RYDRIVE_*` environment variables, command-line overrides.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "rydrive_data";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_NAME: &str = "rydrive";
const ENV_PREFIX: &str = "RYDRIVE";

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory all storage is confined to. Created at startup if absent.
    pub data_dir: String,

    /// Host or IP address to bind
    pub host: String,

    /// TCP port to bind
    pub port: u16,
}

/// Values that take precedence over every other configuration source
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Explicit config file; it must exist when given.
    pub config_file: Option<PathBuf>,
    pub data_dir: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ServerConfig {
    pub fn new(data_dir: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            data_dir: data_dir.into(),
            host: host.into(),
            port,
        }
    }

    /// Load configuration from all sources and validate it
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("data_dir", DEFAULT_DATA_DIR)?
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", i64::from(DEFAULT_PORT))?;

        builder = match &overrides.config_file {
            Some(path) => builder.add_source(File::from(path.as_path())),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        if let Some(data_dir) = &overrides.data_dir {
            builder = builder.set_override("data_dir", data_dir.as_str())?;
        }
        if let Some(host) = &overrides.host {
            builder = builder.set_override("host", host.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("port", i64::from(port))?;
        }

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Message("data_dir cannot be empty".into()));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::Message("host cannot be empty".into()));
        }

        if self.port == 0 {
            return Err(ConfigError::Message("port cannot be 0".into()));
        }

        Ok(())
    }

    /// Host and port as a bindable address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn data_dir_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }
}
