//! Sync engine configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use shopsync_core::ResolutionStrategy;

/// Conflict detection and resolution behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Resolution strategy applied to detected conflicts
    pub strategy: ResolutionStrategy,

    /// Timestamps further apart than this are a conflict (milliseconds)
    pub tolerance_window_ms: u64,

    /// Whether the engine considers the device online at startup
    pub start_online: bool,

    /// Client kind tag written into every record
    pub platform: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: ResolutionStrategy::Merge,
            tolerance_window_ms: 1000,
            start_online: true,
            platform: std::env::consts::OS.to_string(),
        }
    }
}

impl ConfigSection for EngineConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        Validator::collect_errors(vec![
            Validator::in_range(
                self.tolerance_window_ms,
                0,
                60_000,
                "engine.tolerance_window_ms",
            ),
            Validator::identifier(&self.platform, "engine.platform"),
        ])
    }

    fn merge(&mut self, other: Self) {
        self.strategy = other.strategy;
        self.tolerance_window_ms = other.tolerance_window_ms;
        self.start_online = other.start_online;
        self.platform = other.platform;
    }

    fn section_name(&self) -> &'static str {
        "engine"
    }
}
