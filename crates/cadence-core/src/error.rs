use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{TaskId, TaskKind};
use crate::ports::{CollaboratorError, StoreError};

#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("no pipeline registered for task kind={0}")]
    PipelineNotFound(TaskKind),

    #[error("invalid transition for {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("cadence must be at least one unit per year (in units per week), got {0}")]
    InvalidCadence(f64),

    #[error("calendar dates out of range from {0}")]
    CalendarOutOfRange(NaiveDate),

    /// The in-memory task may now differ from the durable record; re-fetch before retrying.
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl CadenceError {
    pub(crate) fn transition(
        entity: impl Into<String>,
        from: impl std::fmt::Debug,
        to: impl std::fmt::Debug,
    ) -> Self {
        Self::InvalidTransition {
            entity: entity.into(),
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }
}
