//! Test doubles shared across module tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::config::PlannerConfig;
use crate::domain::{MetricsSnapshot, OwnerId, Task, TaskId};
use crate::impls::heuristics::CannedTopicSource;
use crate::impls::{HistoricalYieldEstimator, InMemoryTaskStore, ViewsImpactEstimator};
use crate::planner::{GoalPlanner, PlannerDeps};
use crate::ports::{
    ArtifactHandle, CollaboratorError, FixedClock, MetricsSource, StoreError, TaskFilter,
    TaskStore, UlidGenerator, VisualAssetService,
};
use crate::steps::Services;

pub(crate) fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()))
}

/// Visual service that fails until switched on.
#[derive(Default)]
pub(crate) struct SwitchableVisuals {
    healthy: AtomicBool,
}

impl SwitchableVisuals {
    pub(crate) fn heal(&self) {
        self.healthy.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl VisualAssetService for SwitchableVisuals {
    async fn decorate(&self, artifact: &ArtifactHandle, _style: &str) -> Result<ArtifactHandle, CollaboratorError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(artifact.clone())
        } else {
            Err(CollaboratorError::unavailable("visuals", "render farm offline"))
        }
    }
}

/// Heuristic services with the visual step failing until healed.
pub(crate) fn services_failing_visuals() -> (Services, Arc<SwitchableVisuals>) {
    let visuals = Arc::new(SwitchableVisuals::default());
    let mut services = Services::heuristic();
    services.visuals = visuals.clone();
    (services, visuals)
}

/// Store that accepts `budget` writes and then fails every write.
pub(crate) struct FlakyStore {
    inner: InMemoryTaskStore,
    budget: AtomicUsize,
}

impl FlakyStore {
    pub(crate) fn new(budget: usize) -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            budget: AtomicUsize::new(budget),
        }
    }
}

#[async_trait]
impl TaskStore for FlakyStore {
    async fn upsert(&self, task: &Task) -> Result<u64, StoreError> {
        let left = self.budget.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StoreError::Io {
                path: "flaky".into(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.budget.store(left - 1, Ordering::SeqCst);
        self.inner.upsert(task).await
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.inner.get(id).await
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.inner.list(filter).await
    }
}

/// Metrics source whose numbers can be changed mid-test.
#[derive(Default)]
pub(crate) struct SettableMetrics {
    current: Mutex<MetricsSnapshot>,
}

impl SettableMetrics {
    pub(crate) fn new(primary: f64, secondary: f64) -> Self {
        Self {
            current: Mutex::new(MetricsSnapshot::new(primary, secondary)),
        }
    }

    pub(crate) fn set(&self, primary: f64, secondary: f64) {
        *self.current.lock().unwrap() = MetricsSnapshot::new(primary, secondary);
    }
}

#[async_trait]
impl MetricsSource for SettableMetrics {
    async fn metrics(&self, _owner_id: &OwnerId) -> Result<MetricsSnapshot, CollaboratorError> {
        Ok(*self.current.lock().unwrap())
    }
}

/// Planner on the default settings, canned topics and the fixed test clock.
pub(crate) fn planner(store: Arc<dyn TaskStore>, metrics: Arc<dyn MetricsSource>) -> GoalPlanner {
    let clock = clock();
    GoalPlanner::new(
        PlannerConfig::default(),
        PlannerDeps {
            store,
            metrics,
            topics: Arc::new(CannedTopicSource),
            yields: Arc::new(HistoricalYieldEstimator::new()),
            impact: Arc::new(ViewsImpactEstimator),
            ids: Arc::new(UlidGenerator::new(clock.clone())),
            clock,
        },
    )
}
