//! Step state machine.
//!
//! A step moves pending -> processing -> {completed | failed}. The only way
//! back to pending is [`Step::reset`], which the executor calls for a full
//! task restart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CadenceError;

/// Status shared by steps and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RunStatus {
    /// Is this a terminal state (no further transitions without a restart)?
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One stage of a task's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub status: RunStatus,

    /// 0..=100. Below 100 while processing, exactly 100 once completed.
    pub progress: u8,

    /// Human-readable description of the current sub-activity.
    pub message: String,

    /// Opaque step output, available to later steps and the final result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

const WAITING: &str = "Waiting...";

impl Step {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: RunStatus::Pending,
            progress: 0,
            message: WAITING.to_string(),
            data: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// pending -> processing, progress 0.
    pub fn start(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != RunStatus::Pending {
            return Err(self.illegal(RunStatus::Processing));
        }
        self.status = RunStatus::Processing;
        self.progress = 0;
        self.message = message.into();
        self.started_at = Some(now);
        Ok(())
    }

    /// Intermediate progress update while processing.
    ///
    /// Progress never goes down, and it stays at 99 or below until the step completes.
    pub fn advance(&mut self, progress: u8, message: impl Into<String>) -> Result<(), CadenceError> {
        if self.status != RunStatus::Processing {
            return Err(self.illegal(RunStatus::Processing));
        }
        self.progress = self.progress.max(progress.min(99));
        self.message = message.into();
        Ok(())
    }

    /// processing -> completed, progress snapped to 100.
    pub fn complete(
        &mut self,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        if self.status != RunStatus::Processing {
            return Err(self.illegal(RunStatus::Completed));
        }
        self.status = RunStatus::Completed;
        self.progress = 100;
        self.message = message.into();
        self.data = data;
        self.finished_at = Some(now);
        Ok(())
    }

    /// processing -> failed. Progress stays where it was.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), CadenceError> {
        if self.status != RunStatus::Processing {
            return Err(self.illegal(RunStatus::Failed));
        }
        self.status = RunStatus::Failed;
        self.message = message.into();
        self.finished_at = Some(now);
        Ok(())
    }

    /// Back to a fresh pending step (full task restart only).
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.name));
    }

    fn illegal(&self, to: RunStatus) -> CadenceError {
        CadenceError::transition(format!("step '{}'", self.name), self.status, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn processing() -> Step {
        let mut step = Step::new("Analyze Script");
        step.start("Reading script content...", Utc::now()).unwrap();
        step
    }

    #[test]
    fn new_step_is_pending() {
        let step = Step::new("Generate Video");
        assert_eq!(step.status, RunStatus::Pending);
        assert_eq!(step.progress, 0);
        assert_eq!(step.message, "Waiting...");
    }

    #[test]
    fn progress_is_monotonic_while_processing() {
        let mut step = processing();
        step.advance(50, "half").unwrap();
        step.advance(20, "late report").unwrap();
        assert_eq!(step.progress, 50);
        assert_eq!(step.message, "late report");
    }

    #[test]
    fn progress_never_reaches_100_before_completion() {
        let mut step = processing();
        step.advance(100, "almost").unwrap();
        assert_eq!(step.progress, 99);

        step.complete("done", None, Utc::now()).unwrap();
        assert_eq!(step.progress, 100);
        assert_eq!(step.status, RunStatus::Completed);
    }

    #[test]
    fn failure_keeps_progress() {
        let mut step = processing();
        step.advance(40, "rendering").unwrap();
        step.fail("Error: render farm offline", Utc::now()).unwrap();
        assert_eq!(step.status, RunStatus::Failed);
        assert_eq!(step.progress, 40);
    }

    #[rstest]
    #[case::start_twice(RunStatus::Processing)]
    #[case::start_completed(RunStatus::Completed)]
    #[case::start_failed(RunStatus::Failed)]
    fn start_is_only_legal_from_pending(#[case] status: RunStatus) {
        let mut step = Step::new("x");
        step.status = status;
        let err = step.start("go", Utc::now()).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidTransition { .. }));
    }

    #[test]
    fn completed_step_cannot_regress() {
        let mut step = processing();
        step.complete("ok", None, Utc::now()).unwrap();
        assert!(step.fail("late", Utc::now()).is_err());
        assert!(step.advance(10, "again").is_err());
        assert_eq!(step.status, RunStatus::Completed);
    }

    #[test]
    fn reset_restores_pending_and_keeps_name() {
        let mut step = processing();
        step.complete("ok", Some(serde_json::json!({"id": 1})), Utc::now()).unwrap();
        step.reset();
        assert_eq!(step, Step::new("Analyze Script"));
    }
}
