//! ShopSync configuration system
//!
//! Each concern defines its settings as a section implementing `ConfigSection`.
//!
//! - **Graceful degradation**: invalid files fall back to defaults with warnings
//! - **Atomic writes**: config files are never left half written
//! - **Overrides**: defaults < file < `SHOPSYNC_*` environment variables
//!
//! # Example
//!
//! ```rust,no_run
//! use shopsync_config::ConfigManager;
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load_or_default();
//! println!("Strategy: {}", config.engine.strategy);
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
pub mod app_config;
mod driver_config;
mod engine_config;
mod storage_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Validator};

pub use app_config::{AppConfig, LogLevel};
pub use driver_config::DriverConfig;
pub use engine_config::EngineConfig;
pub use storage_config::StorageConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Application-level settings
    pub app: AppConfig,

    /// Conflict detection and resolution
    pub engine: EngineConfig,

    /// Sync scheduling
    pub driver: DriverConfig,

    /// Storage locations
    pub storage: StorageConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.app.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.engine.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.driver.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.storage.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Renders the config as pretty TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }

    /// Merges this config with another, preferring values from `other`
    pub fn merge(&mut self, other: Config) {
        self.app.merge(other.app);
        self.engine.merge(other.engine);
        self.driver.merge(other.driver);
        self.storage.merge(other.storage);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            app: AppConfig::default(),
            engine: EngineConfig::default(),
            driver: DriverConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_rendering_has_every_section() {
        let rendered = Config::default().to_toml_string().unwrap();
        for section in ["[app]", "[engine]", "[driver]", "[storage]"] {
            assert!(rendered.contains(section), "missing {}", section);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_version_is_set() {
        assert_eq!(Config::default().version, CONFIG_VERSION);
    }

    #[test]
    fn test_errors_collected_across_sections() {
        let mut config = Config::default();
        config.engine.tolerance_window_ms = 999_999;
        config.driver.auto_sync_interval_secs = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.driver.auto_sync_interval_secs = 60;

        base.merge(other);
        assert_eq!(base.driver.auto_sync_interval_secs, 60);
    }
}
