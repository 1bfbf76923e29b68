//! StepHandler - 差し替え可能なステップ実装
//!
//! # 設計
//! - ステップは StepContext（投入時の設定 + 先行ステップの出力）を読むだけ
//! - 途中経過は ProgressReporter 経由で報告する（永続化・配信は reporter 側）
//! - 失敗は `Err(StepError)` か `StepOutcome::failed` のどちらでもよい
//!   どちらもエグゼキュータ境界で step の failed に変換され、呼び出し側には漏れない

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::reporter::ProgressReporter;
use crate::domain::{OwnerId, RunStatus, StepOutcome, Task, TaskConfig, TaskId};
use crate::ports::CollaboratorError;

/// StepError はステップ単位の失敗（エグゼキュータ内で回収される）
#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// 先行ステップの出力が無い
    #[error("missing output from step '{0}'")]
    MissingInput(String),

    #[error("malformed step data: {0}")]
    Data(#[from] serde_json::Error),
}

/// ステップに渡される共有コンテキスト
#[derive(Debug, Clone)]
pub struct StepContext {
    pub task_id: TaskId,
    pub owner_id: OwnerId,
    pub config: TaskConfig,
    outputs: BTreeMap<String, serde_json::Value>,
}

impl StepContext {
    /// 完了済みステップの data から組み立てる
    pub fn from_task(task: &Task) -> Self {
        let outputs = task
            .steps
            .iter()
            .filter(|s| s.status == RunStatus::Completed)
            .filter_map(|s| Some((s.name.clone(), s.data.clone()?)))
            .collect();
        Self {
            task_id: task.id,
            owner_id: task.owner_id.clone(),
            config: task.config.clone(),
            outputs,
        }
    }

    pub fn output(&self, step: &str) -> Option<&serde_json::Value> {
        self.outputs.get(step)
    }

    /// 先行ステップの出力を型付きで取り出す
    pub fn output_as<T: DeserializeOwned>(&self, step: &str) -> Result<T, StepError> {
        let value = self
            .outputs
            .get(step)
            .ok_or_else(|| StepError::MissingInput(step.to_string()))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn outputs(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.outputs
    }

    pub(crate) fn record(&mut self, step: &str, data: serde_json::Value) {
        self.outputs.insert(step.to_string(), data);
    }
}

/// StepHandler は 1 ステップ分の処理
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// Task.steps[i].name と一致する名前
    fn name(&self) -> &str;

    /// 開始時にステップの message に入る短い説明
    fn describe(&self) -> String {
        format!("{}...", self.name())
    }

    async fn run(
        &self,
        ctx: &StepContext,
        progress: &mut ProgressReporter<'_>,
    ) -> Result<StepOutcome, StepError>;
}
