//! Application configuration

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::VesselStoreError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub acquire_timeout: Duration,
    /// Server-side bound on every statement, history appends included
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub statement_timeout: Duration,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// How often expired cache rows are physically removed
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: Duration,
    /// Client-side bound on the cache write during ingestion
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub write_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            write_timeout: default_timeout(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(File::with_name("config/default").required(false))
    }

    /// Load from a specific file, still honoring environment overrides
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::build(File::from(path).required(true))
    }

    fn build<S>(file: S) -> Result<Self, ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("VESSELSTORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), VesselStoreError> {
        self.database.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), VesselStoreError> {
        if self.url.trim().is_empty() {
            return Err(VesselStoreError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if self.max_connections == 0 {
            return Err(VesselStoreError::ConfigurationError {
                message: "Max connections must be greater than zero".to_string(),
            });
        }
        if self.acquire_timeout.is_zero() {
            return Err(VesselStoreError::ConfigurationError {
                message: "Acquire timeout must be greater than zero".to_string(),
            });
        }
        if self.statement_timeout.is_zero() {
            return Err(VesselStoreError::ConfigurationError {
                message: "Statement timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), VesselStoreError> {
        if self.sweep_interval.is_zero() {
            return Err(VesselStoreError::ConfigurationError {
                message: "Sweep interval must be greater than zero".to_string(),
            });
        }
        if self.write_timeout.is_zero() {
            return Err(VesselStoreError::ConfigurationError {
                message: "Write timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
