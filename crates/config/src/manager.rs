//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use shopsync_core::ResolutionStrategy;
use std::path::{Path, PathBuf};

/// Main configuration manager
///
/// Primary interface for loading, saving, and managing configuration.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// - Linux: `~/.config/shopsync/`
    /// - macOS: `~/Library/Application Support/shopsync/`
    /// - Windows: `%APPDATA%\shopsync\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "shopsync")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Resolves a configured path against the config directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Loads the configuration from file
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Saves the configuration to file
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads the current config, applies `update_fn` and saves the result
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.save(&Config::default())?;
        log::info!("Generated default config at {}", self.config_path().display());
        Ok(true)
    }

    /// Overwrites the config file with default values
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies `SHOPSYNC_*` environment overrides
    ///
    /// - `SHOPSYNC_ENGINE_STRATEGY=latest_wins`
    /// - `SHOPSYNC_ENGINE_TOLERANCE_MS=1500`
    /// - `SHOPSYNC_DRIVER_INTERVAL_SECS=60`
    /// - `SHOPSYNC_STORAGE_DATA_DIR=/var/lib/shopsync`
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        apply_overrides(&mut config, |key| std::env::var(key).ok());
        Ok(config)
    }
}

/// Applies overrides looked up by environment variable name
pub(crate) fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(strategy) = lookup("SHOPSYNC_ENGINE_STRATEGY") {
        match strategy.parse::<ResolutionStrategy>() {
            Ok(s) => config.engine.strategy = s,
            Err(e) => log::warn!("Ignoring SHOPSYNC_ENGINE_STRATEGY: {}", e),
        }
    }

    if let Some(tolerance) = lookup("SHOPSYNC_ENGINE_TOLERANCE_MS") {
        match tolerance.parse::<u64>() {
            Ok(ms) => config.engine.tolerance_window_ms = ms,
            Err(e) => log::warn!("Ignoring SHOPSYNC_ENGINE_TOLERANCE_MS: {}", e),
        }
    }

    if let Some(interval) = lookup("SHOPSYNC_DRIVER_INTERVAL_SECS") {
        match interval.parse::<u64>() {
            Ok(secs) => config.driver.auto_sync_interval_secs = secs,
            Err(e) => log::warn!("Ignoring SHOPSYNC_DRIVER_INTERVAL_SECS: {}", e),
        }
    }

    if let Some(data_dir) = lookup("SHOPSYNC_STORAGE_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(data_dir);
    }

    if let Err(errors) = config.validate() {
        log::warn!(
            "Config validation warnings after env overrides: {:?}",
            errors
        );
    }
}
