//! Goal metrics and the derived progress view.

use serde::{Deserialize, Serialize};

/// Goal thresholds. Both must be met.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalTarget {
    /// Count-based metric (e.g. subscribers).
    pub primary: f64,
    /// Cumulative-duration metric (e.g. watch minutes).
    pub secondary: f64,
}

impl GoalTarget {
    pub fn new(primary: f64, secondary: f64) -> Self {
        Self { primary, secondary }
    }
}

/// Externally-reported current metric values for an owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub primary: f64,
    pub secondary: f64,
}

impl MetricsSnapshot {
    pub fn new(primary: f64, secondary: f64) -> Self {
        Self { primary, secondary }
    }
}

/// Estimated gain per completed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldEstimate {
    pub primary_per_unit: f64,
    pub secondary_per_unit: f64,

    /// Completed tasks the estimate was averaged over. 0 means the default was used.
    #[serde(default)]
    pub sample_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    NearlyThere,
    Achieved,
}

/// Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub current_primary: f64,
    pub target_primary: f64,
    pub current_secondary: f64,
    pub target_secondary: f64,

    /// Floor of the blended percentage, 0..=100.
    pub percentage: u8,

    pub estimated_units_remaining: u32,
    pub estimated_days_remaining: u32,
    pub status: GoalStatus,
}
