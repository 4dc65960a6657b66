//! Application-level configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};

/// Log level for application logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Application-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Log level used when RUST_LOG is not set
    pub log_level: LogLevel,

    /// User whose state is synchronized when none is given explicitly
    pub default_user: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            default_user: None,
        }
    }
}

impl ConfigSection for AppConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = Vec::new();

        if let Some(user) = &self.default_user {
            results.push(Validator::identifier(user, "app.default_user"));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.log_level = other.log_level;
        if other.default_user.is_some() {
            self.default_user = other.default_user;
        }
    }

    fn section_name(&self) -> &'static str {
        "app"
    }
}
