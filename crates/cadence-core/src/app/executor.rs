//! PipelineExecutor - タスクのステップを順番に実行する
//!
//! # 実行モデル
//! - ステップは厳密に逐次。i+1 は i が completed になるまで始まらない
//! - 状態が変わるたびに Task 全体を upsert して EventChannel に流す
//! - ステップの失敗はここで回収して Task の状態に記録する（呼び出し側には返さない）
//! - 永続化の失敗だけは CadenceError::Persistence として返す
//!   （メモリ上の Task と正本がずれている可能性があるので、呼び出し側で再取得すること）

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::{RunStatus, Task};
use crate::error::CadenceError;
use crate::ports::{Clock, EventChannel, TaskStore};
use crate::steps::reporter::checkpoint;
use crate::steps::{ProgressReporter, StepContext, StepError, StepLibrary};

pub struct PipelineExecutor {
    library: Arc<StepLibrary>,
    store: Arc<dyn TaskStore>,
    events: Arc<dyn EventChannel>,
    clock: Arc<dyn Clock>,
}

impl PipelineExecutor {
    pub fn new(
        library: Arc<StepLibrary>,
        store: Arc<dyn TaskStore>,
        events: Arc<dyn EventChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            library,
            store,
            events,
            clock,
        }
    }

    pub fn library(&self) -> &StepLibrary {
        &self.library
    }

    /// pending のタスクを最後まで（または最初の失敗まで）実行する
    pub async fn run(&self, task: &mut Task) -> Result<(), CadenceError> {
        let pipeline = self
            .library
            .get(task.kind)
            .ok_or(CadenceError::PipelineNotFound(task.kind))?;
        if task.status != RunStatus::Pending {
            return Err(CadenceError::transition(
                format!("task {}", task.id),
                task.status,
                RunStatus::Processing,
            ));
        }

        // processing への遷移は最初のステップ開始と同時に保存される
        task.attempts += 1;
        info!(task_id = %task.id, kind = %task.kind, attempt = task.attempts, "task started");

        let mut ctx = StepContext::from_task(task);

        while task.current_step_index < task.steps.len() {
            let index = task.current_step_index;
            let handler = pipeline.handler(index).cloned();
            let description = handler
                .as_ref()
                .map_or_else(|| "Starting...".to_string(), |h| h.describe());

            let now = self.clock.now();
            task.steps[index].start(description, now)?;
            task.refresh_status(now);
            self.checkpoint(task, now).await?;

            let outcome = match handler {
                Some(handler) => {
                    let mut reporter =
                        ProgressReporter::new(task, index, &*self.store, &*self.events, &*self.clock);
                    let outcome = handler.run(&ctx, &mut reporter).await;
                    if let Some(e) = reporter.into_failure() {
                        return Err(e.into());
                    }
                    outcome
                }
                None => Err(StepError::Failed(format!(
                    "no handler registered for step {index} of {}",
                    task.kind
                ))),
            };

            let now = self.clock.now();
            let outcome = match outcome {
                Ok(outcome) if outcome.is_completed() => outcome,
                Ok(outcome) => return self.fail_step(task, index, outcome.message, now).await,
                Err(e) => return self.fail_step(task, index, format!("Error: {e}"), now).await,
            };

            let name = task.steps[index].name.clone();
            task.steps[index].complete(outcome.message, outcome.data.clone(), now)?;
            if let Some(data) = outcome.data {
                ctx.record(&name, data);
            }
            task.current_step_index += 1;
            debug!(task_id = %task.id, step = %name, "step completed");

            // 最後のステップは完了処理と一緒に保存する
            if task.current_step_index < task.steps.len() {
                task.refresh_status(now);
                self.checkpoint(task, now).await?;
            }
        }

        let now = self.clock.now();
        task.refresh_status(now);
        task.completed_at = Some(now);
        task.result = Some(pipeline.summarize(&ctx));
        self.checkpoint(task, now).await?;
        info!(task_id = %task.id, kind = %task.kind, "task completed");
        Ok(())
    }

    /// failed のタスクを最初からやり直す（途中再開はしない）
    pub async fn retry(&self, task: &mut Task) -> Result<(), CadenceError> {
        let now = self.clock.now();
        task.restart(now)?;
        self.checkpoint(task, now).await?;
        info!(task_id = %task.id, "task reset for retry");
        self.run(task).await
    }

    /// pending のタスクを何も実行せずに failed にする
    pub async fn cancel(&self, task: &mut Task) -> Result<(), CadenceError> {
        let now = self.clock.now();
        task.cancel(now)?;
        self.checkpoint(task, now).await?;
        info!(task_id = %task.id, "task cancelled");
        Ok(())
    }

    async fn fail_step(
        &self,
        task: &mut Task,
        index: usize,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<(), CadenceError> {
        task.steps[index].fail(message.clone(), now)?;
        task.error = Some(message);
        task.refresh_status(now);
        self.checkpoint(task, now).await?;
        warn!(
            task_id = %task.id,
            step = %task.steps[index].name,
            error = task.error.as_deref().unwrap_or_default(),
            "task failed"
        );
        Ok(())
    }

    async fn checkpoint(&self, task: &mut Task, now: DateTime<Utc>) -> Result<(), CadenceError> {
        checkpoint(&*self.store, &*self.events, task, now).await?;
        Ok(())
    }
}
