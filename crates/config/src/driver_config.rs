//! Sync driver configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// When and how often sync passes are triggered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DriverConfig {
    /// Run passes periodically in the background
    pub auto_sync: bool,

    /// Interval between periodic passes in seconds
    pub auto_sync_interval_secs: u64,

    /// Run a pass when the app returns to the foreground
    pub sync_on_foreground: bool,

    /// Delay after the first failed pass in milliseconds
    pub backoff_initial_ms: u64,

    /// Upper bound for backoff delays in seconds
    pub backoff_max_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            auto_sync: true,
            auto_sync_interval_secs: 300,
            sync_on_foreground: true,
            backoff_initial_ms: 500,
            backoff_max_secs: 300,
        }
    }
}

impl ConfigSection for DriverConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(
                self.auto_sync_interval_secs,
                5,
                86_400,
                "driver.auto_sync_interval_secs",
            ),
            Validator::in_range(
                self.backoff_initial_ms,
                10,
                60_000,
                "driver.backoff_initial_ms",
            ),
            Validator::in_range(self.backoff_max_secs, 1, 3_600, "driver.backoff_max_secs"),
        ];

        if self.backoff_max_secs.saturating_mul(1000) < self.backoff_initial_ms {
            results.push(Err(ValidationError::with_value(
                "driver.backoff_max_secs",
                "must not be shorter than driver.backoff_initial_ms",
                self.backoff_max_secs,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.auto_sync = other.auto_sync;
        self.auto_sync_interval_secs = other.auto_sync_interval_secs;
        self.sync_on_foreground = other.sync_on_foreground;
        self.backoff_initial_ms = other.backoff_initial_ms;
        self.backoff_max_secs = other.backoff_max_secs;
    }

    fn section_name(&self) -> &'static str {
        "driver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(DriverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_interval_too_short() {
        let config = DriverConfig {
            auto_sync_interval_secs: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_ceiling_below_initial() {
        let config = DriverConfig {
            backoff_initial_ms: 5_000,
            backoff_max_secs: 2,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "driver.backoff_max_secs");
    }

    #[test]
    fn test_merge() {
        let mut base = DriverConfig::default();
        base.merge(DriverConfig {
            auto_sync: false,
            auto_sync_interval_secs: 60,
            ..Default::default()
        });
        assert!(!base.auto_sync);
        assert_eq!(base.auto_sync_interval_secs, 60);
    }
}
