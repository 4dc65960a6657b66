//! Conflict resolution strategy selection

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Policy used to produce a winning record from a conflict
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// The copy with the larger timestamp wins; ties favor local
    LatestWins,
    /// Type-aware merge of both copies
    #[default]
    Merge,
    /// Keep local until the caller resolves the conflict explicitly
    Manual,
}

impl ResolutionStrategy {
    /// Returns the configuration name of the strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStrategy::LatestWins => "latest_wins",
            ResolutionStrategy::Merge => "merge",
            ResolutionStrategy::Manual => "manual",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest_wins" | "latest-wins" => Ok(ResolutionStrategy::LatestWins),
            "merge" => Ok(ResolutionStrategy::Merge),
            "manual" => Ok(ResolutionStrategy::Manual),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}
