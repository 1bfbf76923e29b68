//! Cadence - 外部向けファサード
//!
//! タスクの投入・参照・再実行・キャンセル、進捗とカレンダーの問い合わせ、
//! ワーカーとスケジューラの起動をまとめる。構築は [`AppBuilder`](super::AppBuilder) から。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::info;

use super::executor::PipelineExecutor;
use super::status::TaskCounts;
use super::worker::{self, WorkerGroup};
use crate::config::CadenceConfig;
use crate::domain::{
    ContentCalendar, GoalTarget, OwnerId, ProgressSnapshot, RunStatus, Task, TaskConfig, TaskId,
    TaskKind, UpcomingJob,
};
use crate::error::CadenceError;
use crate::impls::SubmissionQueue;
use crate::planner::{ContentScheduler, GoalPlanner, SchedulerLoop, TaskSubmitter, TickReport};
use crate::ports::{Clock, EventChannel, IdGenerator, TaskFilter, TaskStore, TaskSubscription};
use crate::steps::StepLibrary;
use crate::steps::reporter::checkpoint;

/// タスクの投入口
///
/// pending の Task を作って保存・配信し、投入キューに積む。
/// ファサードとスケジューラの両方から使う。
pub struct TaskIntake {
    library: Arc<StepLibrary>,
    store: Arc<dyn TaskStore>,
    events: Arc<dyn EventChannel>,
    queue: Arc<SubmissionQueue>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl TaskIntake {
    pub fn new(
        library: Arc<StepLibrary>,
        store: Arc<dyn TaskStore>,
        events: Arc<dyn EventChannel>,
        queue: Arc<SubmissionQueue>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            library,
            store,
            events,
            queue,
            ids,
            clock,
        }
    }
}

#[async_trait]
impl TaskSubmitter for TaskIntake {
    async fn submit(&self, kind: TaskKind, config: TaskConfig, owner_id: OwnerId) -> Result<Task, CadenceError> {
        let pipeline = self
            .library
            .get(kind)
            .ok_or(CadenceError::PipelineNotFound(kind))?;

        let now = self.clock.now();
        let mut task = Task::new(self.ids.task_id(), kind, owner_id, config, pipeline.step_names(), now);
        checkpoint(self.store.as_ref(), self.events.as_ref(), &mut task, now).await?;
        self.queue.push(task.id).await;

        info!(task_id = %task.id, kind = %kind, owner_id = %task.owner_id, "task submitted");
        Ok(task)
    }
}

pub struct Cadence {
    pub(super) config: CadenceConfig,
    pub(super) intake: Arc<TaskIntake>,
    pub(super) executor: Arc<PipelineExecutor>,
    pub(super) queue: Arc<SubmissionQueue>,
    pub(super) store: Arc<dyn TaskStore>,
    pub(super) events: Arc<dyn EventChannel>,
    pub(super) planner: Arc<GoalPlanner>,
    pub(super) scheduler: Arc<ContentScheduler>,
    pub(super) clock: Arc<dyn Clock>,
}

impl Cadence {
    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ---- tasks ----

    /// pending で保存して投入キューに積む。実行はワーカー（または drain_queue）が行う
    pub async fn submit_task(
        &self,
        kind: TaskKind,
        config: TaskConfig,
        owner_id: OwnerId,
    ) -> Result<Task, CadenceError> {
        self.intake.submit(kind, config, owner_id).await
    }

    pub async fn get_task(&self, task_id: TaskId) -> Result<Option<Task>, CadenceError> {
        Ok(self.store.get(task_id).await?)
    }

    /// 新しい順
    pub async fn list_tasks(
        &self,
        owner_id: &OwnerId,
        status: Option<RunStatus>,
    ) -> Result<Vec<Task>, CadenceError> {
        let mut filter = TaskFilter::owner(owner_id.clone());
        if let Some(status) = status {
            filter = filter.with_status(status);
        }
        Ok(self.store.list(&filter).await?)
    }

    /// failed のタスクを pending に戻して再投入する（ステップ 0 からやり直し）
    pub async fn retry_task(&self, task_id: TaskId) -> Result<Task, CadenceError> {
        let mut task = self.load(task_id).await?;
        let now = self.clock.now();
        task.restart(now)?;
        checkpoint(self.store.as_ref(), self.events.as_ref(), &mut task, now).await?;
        self.queue.push(task.id).await;

        info!(task_id = %task.id, attempts = task.attempts, "task requeued for retry");
        Ok(task)
    }

    /// pending のタスクだけキャンセルできる。キューに残った ID はワーカーが読み飛ばす
    pub async fn cancel_task(&self, task_id: TaskId) -> Result<Task, CadenceError> {
        let mut task = self.load(task_id).await?;
        self.executor.cancel(&mut task).await?;
        Ok(task)
    }

    pub async fn status_counts(&self, owner_id: Option<&OwnerId>) -> Result<TaskCounts, CadenceError> {
        let filter = match owner_id {
            Some(owner_id) => TaskFilter::owner(owner_id.clone()),
            None => TaskFilter::all(),
        };
        let tasks = self.store.list(&filter).await?;
        Ok(TaskCounts::tally(&tasks).with_queued(self.queue.len().await))
    }

    pub fn subscribe(&self) -> TaskSubscription {
        self.events.subscribe()
    }

    /// ワーカー無しで、今キューにある ID をこのタスク上で順に実行する
    ///
    /// 処理した ID の数を返す（pending でなくなっていて飛ばしたものも含む）。
    pub async fn drain_queue(&self) -> usize {
        let mut drained = 0;
        while let Some(task_id) = self.queue.try_pop().await {
            worker::execute(0, task_id, &self.executor, self.store.as_ref()).await;
            drained += 1;
        }
        drained
    }

    pub fn start_workers(&self) -> WorkerGroup {
        WorkerGroup::spawn(
            self.config.workers.count,
            Arc::clone(&self.queue),
            Arc::clone(&self.executor),
            Arc::clone(&self.store),
        )
    }

    // ---- goals ----

    /// 設定の cadence で進捗を計算
    pub async fn compute_progress(
        &self,
        owner_id: &OwnerId,
        target: GoalTarget,
    ) -> Result<ProgressSnapshot, CadenceError> {
        self.planner
            .progress(owner_id, target, self.config.goal.cadence_per_week)
            .await
    }

    /// 設定のデフォルト niche でカレンダーを作る
    pub async fn plan_calendar(
        &self,
        owner_id: &OwnerId,
        target: GoalTarget,
        cadence_per_week: f64,
    ) -> Result<ContentCalendar, CadenceError> {
        self.plan_calendar_in_niche(owner_id, target, cadence_per_week, &self.config.goal.default_niche)
            .await
    }

    pub async fn plan_calendar_in_niche(
        &self,
        owner_id: &OwnerId,
        target: GoalTarget,
        cadence_per_week: f64,
        niche: &str,
    ) -> Result<ContentCalendar, CadenceError> {
        self.planner
            .plan_calendar(owner_id, target, cadence_per_week, niche)
            .await
    }

    pub async fn calendar(&self, owner_id: &OwnerId) -> Option<ContentCalendar> {
        self.planner.calendar(owner_id).await
    }

    pub async fn upcoming(&self, limit: usize) -> Vec<UpcomingJob> {
        self.planner.upcoming(limit).await
    }

    /// スケジューラを 1 回だけ回す
    pub async fn schedule_tick(&self, today: NaiveDate) -> TickReport {
        self.scheduler.tick(today).await
    }

    pub fn start_scheduler(&self) -> SchedulerLoop {
        SchedulerLoop::spawn(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.clock),
            self.config.scheduler.interval(),
        )
    }

    async fn load(&self, task_id: TaskId) -> Result<Task, CadenceError> {
        self.store
            .get(task_id)
            .await?
            .ok_or(CadenceError::TaskNotFound(task_id))
    }
}
