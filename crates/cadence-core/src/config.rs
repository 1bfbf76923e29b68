//! CadenceConfig - `cadence.toml` で上書きできる設定
//!
//! すべての項目にデフォルトがあるので、ファイルは部分的に書けばよい。
//!
//! ```toml
//! [goal]
//! primary_target = 1000
//! cadence_per_week = 5
//!
//! [workers]
//! count = 4
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{GoalTarget, YieldEstimate};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub goal: GoalConfig,
    pub planner: PlannerConfig,
    pub workers: WorkerConfig,
    pub events: EventConfig,
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
}

impl CadenceConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 読めなければ警告してデフォルト
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "using default config");
            Self::default()
        })
    }
}

/// Monetization-style goal: both thresholds must be met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalConfig {
    pub primary_target: f64,
    pub secondary_target: f64,

    /// Units of work per week.
    pub cadence_per_week: f64,

    pub default_niche: String,
}

impl GoalConfig {
    pub fn target(&self) -> GoalTarget {
        GoalTarget::new(self.primary_target, self.secondary_target)
    }
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            primary_target: 1_000.0,
            secondary_target: 240_000.0,
            cadence_per_week: 3.0,
            default_niche: "mystery".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub buffer_factor: f64,
    pub max_planned_jobs: usize,
    pub critical_count: usize,
    pub high_count: usize,
    pub completion_buffer_days: i64,

    /// Planned jobs each owner contributes to the upcoming list.
    pub upcoming_per_owner: usize,

    /// Fallback per-unit yield when there is no completed history.
    pub default_primary_yield: f64,
    pub default_secondary_yield: f64,
}

impl PlannerConfig {
    pub fn default_yield(&self) -> YieldEstimate {
        YieldEstimate {
            primary_per_unit: self.default_primary_yield,
            secondary_per_unit: self.default_secondary_yield,
            sample_size: 0,
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            buffer_factor: 1.2,
            max_planned_jobs: 20,
            critical_count: 3,
            high_count: 4,
            completion_buffer_days: 30,
            upcoming_per_owner: 5,
            default_primary_yield: 150.0,
            default_secondary_yield: 90_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { count: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: u64,

    /// Opt submitted jobs in to publishing and distribution.
    pub auto_publish: bool,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            auto_publish: false,
        }
    }
}

/// `data_dir` があれば JsonFileTaskStore、なければインメモリ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: Option<PathBuf>,
}
