//! Storage location configuration section

use crate::validation::{ConfigSection, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where local records and the directory-backed remote live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Local record store directory (relative to config dir if not absolute)
    pub data_dir: PathBuf,

    /// Directory standing in for the remote service (relative to config dir if not absolute)
    pub remote_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            remote_dir: PathBuf::from("remote"),
        }
    }
}

impl ConfigSection for StorageConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new("storage.data_dir", "must not be empty"));
        }
        if self.remote_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new("storage.remote_dir", "must not be empty"));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if self.data_dir == self.remote_dir {
            return Err(vec![ValidationError::with_value(
                "storage.remote_dir",
                "must differ from storage.data_dir",
                self.remote_dir.display(),
            )]);
        }

        Ok(())
    }

    fn merge(&mut self, other: Self) {
        self.data_dir = other.data_dir;
        self.remote_dir = other.remote_dir;
    }

    fn section_name(&self) -> &'static str {
        "storage"
    }
}
