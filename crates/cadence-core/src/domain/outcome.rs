//! Outcome model: what a step implementation hands back to the executor.
//!
//! This module does not assume any store or channel. It only defines the
//! "shape" of a step result so step implementations stay swappable.

use serde::{Deserialize, Serialize};

/// How a step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Completed,
    Failed,
}

/// Result of one step run.
///
/// - `COMPLETED`: the step's work is done; `data` joins the shared context.
/// - `FAILED`: the task halts here; `message` is recorded on the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub kind: OutcomeKind,

    /// Final progress. Always 100 for a completed step.
    pub progress: u8,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StepOutcome {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Completed,
            progress: 100,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Failed,
            progress: 0,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize a typed value as the step data.
    pub fn with_typed_data<T: Serialize>(self, data: &T) -> Result<Self, serde_json::Error> {
        Ok(self.with_data(serde_json::to_value(data)?))
    }

    pub fn is_completed(&self) -> bool {
        self.kind == OutcomeKind::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_kind_serializes_as_required_names() {
        let s = serde_json::to_string(&OutcomeKind::Completed).unwrap();
        assert_eq!(s, "\"COMPLETED\"");

        let s = serde_json::to_string(&OutcomeKind::Failed).unwrap();
        assert_eq!(s, "\"FAILED\"");
    }

    #[test]
    fn completed_outcome_is_at_100() {
        let o = StepOutcome::completed("Video generated").with_data(serde_json::json!({"id": "v1"}));
        assert!(o.is_completed());
        assert_eq!(o.progress, 100);
        assert_eq!(o.data.unwrap()["id"], "v1");
    }

    #[test]
    fn typed_data_is_serialized() {
        #[derive(Serialize)]
        struct Out {
            score: u32,
        }
        let o = StepOutcome::completed("ok").with_typed_data(&Out { score: 85 }).unwrap();
        assert_eq!(o.data, Some(serde_json::json!({"score": 85})));
    }
}
