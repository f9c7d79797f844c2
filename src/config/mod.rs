//! Configuration management for the toolbox.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Section-wise validation
mod instance;
mod logging;
mod monitor;
mod notifications;
mod retry;
pub use instance::*;
pub use logging::*;
pub use monitor::*;
pub use notifications::*;
pub use retry::*;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Environment variable naming an optional settings file
pub const CONFIG_PATH_ENV: &str = "TBOX_CONFIG_PATH";

/// Prefix of override variables, e.g. `TBOX__MONITOR__POLL_INTERVAL_MS`
pub const ENV_PREFIX: &str = "TBOX";

/// Main configuration container for the toolbox
///
/// Combines all section configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `TBOX_CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ToolboxConfig {
    /// Job monitoring cadence and notification filter
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Retry policies for remote calls
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Tamr instance location and access
    #[serde(default)]
    pub instance: InstanceConfig,
    /// Notification channels
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Debug for ToolboxConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        // notifications and instance carry credentials
        f.debug_struct("ToolboxConfig")
            .field("monitor", &self.monitor)
            .field("retry", &self.retry)
            .field("install_dir", &self.instance.install_dir)
            .finish()
    }
}

impl ToolboxConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `TBOX_CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `TBOX__` prefix (highest priority)
    ///
    /// # Note
    /// This method does NOT validate the configuration. Callers MUST call `validate()`
    /// before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("TBOX_CONFIG_PATH", "config/tbox.toml");
    /// std::env::set_var("TBOX__MONITOR__POLL_INTERVAL_MS", "5000");
    /// let cfg = ToolboxConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.monitor.validate()?;
        self.retry.validate()?;
        self.instance.validate()?;
        self.notifications.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

pub(crate) fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}
