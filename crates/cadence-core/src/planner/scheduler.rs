//! ContentScheduler - カレンダーから定期的にタスクを投入する
//!
//! tick ごとに:
//! 1. generating のジョブを投入済みタスクの状態と突き合わせる
//! 2. 目標達成済みの owner は飛ばす
//! 3. 期日の来た planned ジョブを 1 件だけ投入して generating にする
//!
//! tick は直列化される（重なった tick が同じジョブを二重投入しないように）。
//! SchedulerLoop は tick を一定間隔で回す（watch channel で停止）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::goal::GoalPlanner;
use crate::domain::{
    ContentCalendar, GoalStatus, OwnerId, PlannedJobStatus, RunStatus, Task, TaskConfig, TaskId,
    TaskKind,
};
use crate::error::CadenceError;
use crate::ports::{Clock, TaskStore};

/// タスク投入口（Cadence ファサードが実装する）
#[async_trait]
pub trait TaskSubmitter: Send + Sync {
    async fn submit(&self, kind: TaskKind, config: TaskConfig, owner_id: OwnerId) -> Result<Task, CadenceError>;
}

/// 1 回の tick で起きたこと
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// generating から ready / published / planned に動いたジョブ数
    pub reconciled: usize,
    pub submitted: Vec<TaskId>,
    pub skipped_achieved: Vec<OwnerId>,
}

pub struct ContentScheduler {
    planner: Arc<GoalPlanner>,
    store: Arc<dyn TaskStore>,
    submitter: Arc<dyn TaskSubmitter>,
    auto_publish: bool,
    tick_lock: Mutex<()>,
}

impl ContentScheduler {
    pub fn new(
        planner: Arc<GoalPlanner>,
        store: Arc<dyn TaskStore>,
        submitter: Arc<dyn TaskSubmitter>,
        auto_publish: bool,
    ) -> Self {
        Self {
            planner,
            store,
            submitter,
            auto_publish,
            tick_lock: Mutex::new(()),
        }
    }

    /// owner 単位の失敗はログに残して次の owner へ進む
    pub async fn tick(&self, today: NaiveDate) -> TickReport {
        let _serial = self.tick_lock.lock().await;
        let mut report = TickReport::default();
        for owner_id in self.planner.owners().await {
            if let Err(e) = self.tick_owner(&owner_id, today, &mut report).await {
                warn!(owner_id = %owner_id, error = %e, "scheduler tick failed for owner");
            }
        }
        if !report.submitted.is_empty() || report.reconciled > 0 {
            info!(
                submitted = report.submitted.len(),
                reconciled = report.reconciled,
                skipped = report.skipped_achieved.len(),
                "scheduler tick"
            );
        }
        report
    }

    async fn tick_owner(
        &self,
        owner_id: &OwnerId,
        today: NaiveDate,
        report: &mut TickReport,
    ) -> Result<(), CadenceError> {
        let Some(mut calendar) = self.planner.calendar(owner_id).await else {
            return Ok(());
        };

        let moved = self.reconcile(&mut calendar).await?;
        report.reconciled += moved;

        let progress = self
            .planner
            .progress(owner_id, calendar.target, calendar.cadence_per_week)
            .await?;
        if progress.status == GoalStatus::Achieved {
            debug!(owner_id = %owner_id, "goal achieved; nothing to schedule");
            report.skipped_achieved.push(owner_id.clone());
            self.planner.store_calendar(calendar).await;
            return Ok(());
        }

        if let Some(job) = calendar.next_due(today).cloned() {
            let (kind, config) = job.to_submission();
            let task = self
                .submitter
                .submit(kind, config.with_auto_publish(self.auto_publish), owner_id.clone())
                .await?;
            if let Some(planned) = calendar.job_mut(job.id) {
                planned.status = PlannedJobStatus::Generating;
                planned.task_id = Some(task.id);
            }
            info!(owner_id = %owner_id, job_id = %job.id, task_id = %task.id, "planned job submitted");
            report.submitted.push(task.id);
        }

        if !self.planner.store_calendar(calendar).await {
            debug!(owner_id = %owner_id, "calendar was replanned during tick; changes dropped");
        }
        Ok(())
    }

    /// generating ジョブを投入済みタスクの結果に合わせる
    async fn reconcile(&self, calendar: &mut ContentCalendar) -> Result<usize, CadenceError> {
        let mut moved = 0;
        for job in calendar.jobs.iter_mut() {
            if job.status != PlannedJobStatus::Generating {
                continue;
            }
            let task = match job.task_id {
                Some(task_id) => self.store.get(task_id).await?,
                None => None,
            };
            let next = match task {
                None => Some(PlannedJobStatus::Planned),
                Some(task) => match task.status {
                    RunStatus::Completed if task.result.as_ref().is_some_and(|r| r.public_url.is_some()) => {
                        Some(PlannedJobStatus::Published)
                    }
                    RunStatus::Completed => Some(PlannedJobStatus::Ready),
                    RunStatus::Failed => Some(PlannedJobStatus::Planned),
                    RunStatus::Pending | RunStatus::Processing => None,
                },
            };
            let Some(next) = next else { continue };

            if next == PlannedJobStatus::Planned {
                job.task_id = None;
            } else {
                calendar.units_generated += 1;
            }
            job.status = next;
            moved += 1;
        }
        Ok(moved)
    }
}

/// SchedulerLoop handle.
pub struct SchedulerLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SchedulerLoop {
    /// 起動直後に 1 回 tick してから `interval` ごとに回す
    pub fn spawn(scheduler: Arc<ContentScheduler>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        scheduler.tick(clock.today()).await;
                    }
                }
            }
            debug!("scheduler loop exited");
        });
        info!(interval_secs = interval.as_secs(), "scheduler loop started");

        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        let _ = self.join.await;
    }
}
