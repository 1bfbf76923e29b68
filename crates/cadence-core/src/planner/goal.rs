//! GoalPlanner - 進捗計算とカレンダー生成
//!
//! # 所有
//! - owner ごとの ContentCalendar はここが排他的に持つ（TaskStore には置かない）
//! - ProgressSnapshot は毎回計算し直す
//!
//! 履歴が無くて歩留まりが出せないときは YieldEstimator のデフォルト値で続行する。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::calendar::{self, CalendarInputs};
use super::progress::{self, compute_progress};
use crate::config::PlannerConfig;
use crate::domain::{
    ContentCalendar, GoalTarget, OwnerId, PlannedJobStatus, ProgressSnapshot, RunStatus,
    UpcomingJob, YieldEstimate,
};
use crate::error::CadenceError;
use crate::ports::{
    Clock, IdGenerator, ImpactEstimator, MetricsSource, TaskFilter, TaskStore, TopicSource,
    YieldEstimator,
};

pub struct GoalPlanner {
    settings: PlannerConfig,
    store: Arc<dyn TaskStore>,
    metrics: Arc<dyn MetricsSource>,
    topics: Arc<dyn TopicSource>,
    yields: Arc<dyn YieldEstimator>,
    impact: Arc<dyn ImpactEstimator>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    calendars: RwLock<HashMap<OwnerId, ContentCalendar>>,
}

/// GoalPlanner の依存一式
pub struct PlannerDeps {
    pub store: Arc<dyn TaskStore>,
    pub metrics: Arc<dyn MetricsSource>,
    pub topics: Arc<dyn TopicSource>,
    pub yields: Arc<dyn YieldEstimator>,
    pub impact: Arc<dyn ImpactEstimator>,
    pub ids: Arc<dyn IdGenerator>,
    pub clock: Arc<dyn Clock>,
}

impl GoalPlanner {
    pub fn new(settings: PlannerConfig, deps: PlannerDeps) -> Self {
        Self {
            settings,
            store: deps.store,
            metrics: deps.metrics,
            topics: deps.topics,
            yields: deps.yields,
            impact: deps.impact,
            ids: deps.ids,
            clock: deps.clock,
            calendars: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &PlannerConfig {
        &self.settings
    }

    /// 外部メトリクス + 完了済みタスク履歴から進捗を計算
    pub async fn progress(
        &self,
        owner_id: &OwnerId,
        target: GoalTarget,
        cadence_per_week: f64,
    ) -> Result<ProgressSnapshot, CadenceError> {
        let current = self.metrics.metrics(owner_id).await?;
        let estimate = self.estimate(owner_id).await?;
        compute_progress(current, target, &estimate, cadence_per_week)
    }

    /// カレンダーを作り直して owner の現行カレンダーとして保存する
    pub async fn plan_calendar(
        &self,
        owner_id: &OwnerId,
        target: GoalTarget,
        cadence_per_week: f64,
        niche: &str,
    ) -> Result<ContentCalendar, CadenceError> {
        // 計算より先に検証する
        progress::days_for(0, cadence_per_week)?;

        let current = self.metrics.metrics(owner_id).await?;
        let estimate = self.estimate(owner_id).await?;
        let remaining = progress::units_remaining(current, target, &estimate);
        let units_needed = calendar::buffered_units(remaining, self.settings.buffer_factor);
        let days_to_goal = progress::days_for(units_needed, cadence_per_week)?;

        let wanted = (units_needed as usize).min(self.settings.max_planned_jobs);
        let topics = if wanted == 0 {
            Vec::new()
        } else {
            self.topics.topics(niche, wanted).await?
        };

        let now = self.clock.now();
        let plan = calendar::layout(
            CalendarInputs {
                owner_id: owner_id.clone(),
                target,
                current_primary: current.primary,
                cadence_per_week,
                niche: niche.to_string(),
                units_needed,
                days_to_goal,
                today: self.clock.today(),
                now,
            },
            topics,
            &self.settings,
            self.impact.as_ref(),
            self.ids.as_ref(),
        )?;
        info!(
            owner_id = %owner_id,
            units_needed,
            planned = plan.jobs.len(),
            completion = %plan.estimated_completion,
            "content calendar planned"
        );

        self.calendars.write().await.insert(owner_id.clone(), plan.clone());
        Ok(plan)
    }

    pub async fn calendar(&self, owner_id: &OwnerId) -> Option<ContentCalendar> {
        self.calendars.read().await.get(owner_id).cloned()
    }

    pub async fn owners(&self) -> Vec<OwnerId> {
        let mut owners: Vec<_> = self.calendars.read().await.keys().cloned().collect();
        owners.sort();
        owners
    }

    /// 全 owner の planned ジョブを日付順に
    ///
    /// 各 owner からは先頭 `upcoming_per_owner` 件まで。
    pub async fn upcoming(&self, limit: usize) -> Vec<UpcomingJob> {
        let per_owner = self.settings.upcoming_per_owner;
        let calendars = self.calendars.read().await;
        let mut jobs: Vec<UpcomingJob> = calendars
            .values()
            .flat_map(|cal| {
                cal.jobs
                    .iter()
                    .filter(|j| j.status == PlannedJobStatus::Planned)
                    .take(per_owner)
                    .map(|j| UpcomingJob {
                        owner_id: cal.owner_id.clone(),
                        job: j.clone(),
                    })
            })
            .collect();
        jobs.sort_by(|a, b| {
            a.job
                .scheduled_date
                .cmp(&b.job.scheduled_date)
                .then(a.job.priority.cmp(&b.job.priority))
                .then(a.owner_id.cmp(&b.owner_id))
        });
        jobs.truncate(limit);
        jobs
    }

    /// 読み出した時点と同じ世代のカレンダーだけ書き戻す（途中で再計画されていたら捨てる）
    pub(crate) async fn store_calendar(&self, updated: ContentCalendar) -> bool {
        let mut calendars = self.calendars.write().await;
        match calendars.get_mut(&updated.owner_id) {
            Some(current) if current.generated_at == updated.generated_at => {
                *current = updated;
                true
            }
            _ => false,
        }
    }

    async fn estimate(&self, owner_id: &OwnerId) -> Result<YieldEstimate, CadenceError> {
        let history = self
            .store
            .list(&TaskFilter::owner(owner_id.clone()).with_status(RunStatus::Completed))
            .await?;
        let estimate = self.yields.estimate(&history);
        if estimate.sample_size == 0 {
            debug!(owner_id = %owner_id, "no completed history, using default yield");
        }
        Ok(estimate)
    }
}
