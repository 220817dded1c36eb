//! Scheduling mode definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the orchestrator schedules concurrent downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    /// Fixed-size batches; the next batch starts once the whole batch is done.
    #[default]
    Batch,
    /// Bounded worker pool that refills as soon as any task finishes.
    Pool,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Batch => write!(f, "batch"),
            SchedulingMode::Pool => write!(f, "pool"),
        }
    }
}

impl FromStr for SchedulingMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(SchedulingMode::Batch),
            "pool" => Ok(SchedulingMode::Pool),
            _ => Err(format!("Unknown scheduling mode: {}", s)),
        }
    }
}
