//! ProgressReporter - ステップ途中経過の永続化と配信
//!
//! report() のたびに Task 全体を upsert して EventChannel に流す。
//! 永続化エラーはステップの失敗ではないので、ここで握って
//! ステップ終了後にエグゼキュータが呼び出し側へ返す。

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::Task;
use crate::ports::{Clock, EventChannel, StoreError, TaskEvent, TaskStore};

pub struct ProgressReporter<'a> {
    task: &'a mut Task,
    index: usize,
    store: &'a dyn TaskStore,
    events: &'a dyn EventChannel,
    clock: &'a dyn Clock,
    failure: Option<StoreError>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(
        task: &'a mut Task,
        index: usize,
        store: &'a dyn TaskStore,
        events: &'a dyn EventChannel,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            task,
            index,
            store,
            events,
            clock,
            failure: None,
        }
    }

    /// 途中経過を報告する。progress は下がらず、完了前は 99 で止まる
    pub async fn report(&mut self, progress: u8, message: impl Into<String>) {
        if self.failure.is_some() {
            return;
        }
        let Some(step) = self.task.steps.get_mut(self.index) else {
            return;
        };
        if let Err(e) = step.advance(progress, message) {
            warn!(task_id = %self.task.id, step = self.index, error = %e, "progress report ignored");
            return;
        }
        let now = self.clock.now();
        self.task.updated_at = now;
        if let Err(e) = checkpoint(self.store, self.events, self.task, now).await {
            self.failure = Some(e);
        }
    }

    /// 現在のステップの progress
    pub fn progress(&self) -> u8 {
        self.task.steps.get(self.index).map_or(0, |s| s.progress)
    }

    pub(crate) fn into_failure(self) -> Option<StoreError> {
        self.failure
    }
}

/// upsert して version を反映し、スナップショットを配信
pub(crate) async fn checkpoint(
    store: &dyn TaskStore,
    events: &dyn EventChannel,
    task: &mut Task,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    task.version = store.upsert(task).await?;
    events.publish(TaskEvent::new(task.clone(), now));
    Ok(())
}
