//! Task record and status aggregation.
//!
//! Design: same pattern as the step record.
//! - Single source of truth for a pipeline run
//! - State transitions via methods, status derived from the step array

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{OwnerId, TaskId};
use super::step::{RunStatus, Step};
use crate::error::CadenceError;

/// Which pipeline a task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    /// Script in, published (or publish-ready) video out.
    ScriptToPublish,
    /// Several pieces of content generated from a topic list.
    BatchGeneration,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::ScriptToPublish => "script-to-publish",
            TaskKind::BatchGeneration => "batch-generation",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission payload, kept on the task so a retry can rerun it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub title: String,
    pub niche: String,

    /// Raw script (script-to-publish) or seed text.
    pub input: String,

    pub style: Option<String>,
    pub quality: Option<String>,
    pub voice: Option<String>,

    /// Opt in to the publishing and distribution services.
    pub auto_publish: bool,

    /// Explicit topics for batch generation. Empty means "ask the topic source".
    pub topics: Vec<String>,

    /// How many topics to request when `topics` is empty.
    pub batch_size: usize,
}

impl TaskConfig {
    pub fn script(title: impl Into<String>, niche: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            niche: niche.into(),
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_auto_publish(mut self, auto_publish: bool) -> Self {
        self.auto_publish = auto_publish;
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Aggregate of the step outputs, set once every step has completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub platforms: Vec<String>,

    /// Step name -> step data.
    #[serde(default)]
    pub outputs: BTreeMap<String, serde_json::Value>,

    /// Derived summary metrics (estimated_views, duration_minutes, ...).
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl TaskResult {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// One unit of pipeline work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    pub owner_id: OwnerId,
    pub status: RunStatus,
    pub config: TaskConfig,
    pub steps: Vec<Step>,
    pub current_step_index: usize,

    /// Number of runs started (first run plus retries).
    pub attempts: u32,

    /// Store version this copy was read at (optimistic concurrency).
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub(crate) const CANCELLED_MESSAGE: &str = "cancelled before start";

impl Task {
    pub fn new<I, S>(
        id: TaskId,
        kind: TaskKind,
        owner_id: OwnerId,
        config: TaskConfig,
        step_names: I,
        now: DateTime<Utc>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            kind,
            owner_id,
            status: RunStatus::Pending,
            config,
            steps: step_names.into_iter().map(Step::new).collect(),
            current_step_index: 0,
            attempts: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Status as a pure function of the step array.
    pub fn derived_status(&self) -> RunStatus {
        if self.steps.iter().any(|s| s.status == RunStatus::Failed) {
            RunStatus::Failed
        } else if self.steps.iter().all(|s| s.status == RunStatus::Completed) {
            RunStatus::Completed
        } else if self.steps.iter().all(|s| s.status == RunStatus::Pending) {
            RunStatus::Pending
        } else {
            RunStatus::Processing
        }
    }

    /// Recompute `status` from the steps.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        self.status = self.derived_status();
        self.updated_at = now;
    }

    /// Was this task cancelled before any step ran?
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Failed && self.error.as_deref() == Some(CANCELLED_MESSAGE)
    }

    /// Index of the first failed step, if any.
    pub fn failed_step(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == RunStatus::Failed)
    }

    /// Overall progress across all steps (0..=100), for dashboards.
    pub fn overall_progress(&self) -> u8 {
        if self.steps.is_empty() {
            return 0;
        }
        let sum: u32 = self.steps.iter().map(|s| u32::from(s.progress)).sum();
        (sum / self.steps.len() as u32) as u8
    }

    /// pending -> failed without running anything.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != RunStatus::Pending {
            return Err(CadenceError::transition(
                format!("task {}", self.id),
                self.status,
                "Cancelled",
            ));
        }
        self.status = RunStatus::Failed;
        self.error = Some(CANCELLED_MESSAGE.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// failed -> pending, every step back to pending, index back to 0.
    pub fn restart(&mut self, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != RunStatus::Failed {
            return Err(CadenceError::transition(
                format!("task {}", self.id),
                self.status,
                RunStatus::Pending,
            ));
        }
        for step in &mut self.steps {
            step.reset();
        }
        self.status = RunStatus::Pending;
        self.current_step_index = 0;
        self.completed_at = None;
        self.result = None;
        self.error = None;
        self.updated_at = now;
        Ok(())
    }
}
