//! File system persistence for configuration
//!
//! Reads and writes config files with atomic renames, a backup of the
//! previous file, and directory creation on demand.

use crate::{Config, ConfigError, ConfigResult, CONFIG_VERSION};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Handles configuration file persistence
pub struct ConfigPersistence {
    config_path: PathBuf,
}

impl ConfigPersistence {
    /// Creates a new persistence handler for the given config file path
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads configuration from file
    ///
    /// A missing file yields the default config; an empty or unparsable
    /// file is an error.
    pub fn load(&self) -> ConfigResult<Config> {
        if !self.config_path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                self.config_path.display()
            );
            return Ok(Config::default());
        }

        let contents =
            fs::read_to_string(&self.config_path).map_err(|e| ConfigError::ReadError {
                path: self.config_path.clone(),
                source: e,
            })?;

        if contents.trim().is_empty() {
            return Err(ConfigError::ReadError {
                path: self.config_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Config file is empty or contains only whitespace",
                ),
            });
        }

        let config: Config = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.config_path.clone(),
            source: e,
        })?;

        if config.version > CONFIG_VERSION {
            log::warn!(
                "Config version {} is newer than supported version {}. Attempting to use as-is.",
                config.version,
                CONFIG_VERSION
            );
        }

        // Invalid values only warn on load so the user can still fix the file
        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            log::warn!("Config validation warnings: {}", error_msg);
        }

        Ok(config)
    }

    /// Saves configuration to file atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        if let Err(errors) = config.validate() {
            let error_msg = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ConfigError::ValidationError(error_msg));
        }

        if let Some(parent) = self.config_path.parent() {
            self.ensure_directory_exists(parent)?;
        }

        if self.config_path.exists() {
            self.backup_config()?;
        }

        let toml_string = config.to_toml_string()?;

        let temp_file = self.create_temp_file()?;
        self.write_atomic(temp_file, &toml_string)?;

        log::info!("Config saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensures a directory exists, creating it if necessary
    fn ensure_directory_exists(&self, path: &Path) -> ConfigResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| ConfigError::DirectoryCreationError {
                path: path.to_path_buf(),
                source: e,
            })?;
            log::info!("Created config directory: {}", path.display());
        }
        Ok(())
    }

    /// Copies the current config file next to itself with a `.backup` suffix
    fn backup_config(&self) -> ConfigResult<()> {
        let backup_path = self.config_path.with_extension("toml.backup");
        fs::copy(&self.config_path, &backup_path)
            .map_err(|e| ConfigError::BackupError { source: e })?;
        log::debug!("Backed up config to {}", backup_path.display());
        Ok(())
    }

    fn create_temp_file(&self) -> ConfigResult<NamedTempFile> {
        let dir = self
            .config_path
            .parent()
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Config path has no parent directory".to_string(),
            })?;

        NamedTempFile::new_in(dir).map_err(ConfigError::IoError)
    }

    fn write_atomic(&self, mut temp_file: NamedTempFile, content: &str) -> ConfigResult<()> {
        temp_file
            .write_all(content.as_bytes())
            .map_err(ConfigError::IoError)?;
        temp_file.flush().map_err(ConfigError::IoError)?;

        temp_file
            .persist(&self.config_path)
            .map_err(|e| ConfigError::WriteError {
                path: self.config_path.clone(),
                source: e.error,
            })?;

        Ok(())
    }
}
