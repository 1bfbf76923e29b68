//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - 設定値の検証（cadence / ワーカー数 / イベント容量）は build() で行う
//! - expect_kinds() で期待される TaskKind を登録
//! - build() 時に「期待集合 ⊆ 登録済み集合」をチェックし、不足があれば BuildError
//!
//! 差し替えなかった port はデフォルト実装で埋める:
//! InMemoryTaskStore（`store.data_dir` があれば JsonFileTaskStore）、BroadcastEventChannel、
//! ヒューリスティック実装、SystemClock、UlidGenerator。

use std::sync::Arc;

use tracing::info;

use super::executor::PipelineExecutor;
use super::service::{Cadence, TaskIntake};
use crate::config::CadenceConfig;
use crate::domain::TaskKind;
use crate::impls::heuristics::StaticMetricsSource;
use crate::impls::{
    BroadcastEventChannel, HistoricalYieldEstimator, InMemoryTaskStore, JsonFileTaskStore,
    SubmissionQueue, ViewsImpactEstimator,
};
use crate::planner::progress::{self, MIN_CADENCE_PER_WEEK};
use crate::planner::{ContentScheduler, GoalPlanner, PlannerDeps};
use crate::ports::{
    Clock, EventChannel, IdGenerator, ImpactEstimator, MetricsSource, StoreError, SystemClock,
    TaskStore, UlidGenerator, YieldEstimator,
};
use crate::steps::{LibraryError, Pipeline, Services, StepLibrary};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing pipelines: {0:?}. These task kinds were expected but not registered.")]
    MissingPipelines(Vec<TaskKind>),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to open task store: {0}")]
    Store(#[from] StoreError),
}

/// AppBuilder は [`Cadence`] を構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .with_config(config)
///     .expect_kinds(&[TaskKind::ScriptToPublish])
///     .build()
///     .await?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    config: CadenceConfig,
    services: Option<Services>,
    library: Option<StepLibrary>,
    store: Option<Arc<dyn TaskStore>>,
    events: Option<Arc<dyn EventChannel>>,
    metrics: Option<Arc<dyn MetricsSource>>,
    yields: Option<Arc<dyn YieldEstimator>>,
    impact: Option<Arc<dyn ImpactEstimator>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    expected_kinds: Option<Vec<TaskKind>>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: CadenceConfig) -> Self {
        self.config = config;
        self
    }

    /// 外部サービス一式。library を渡さなければ standard パイプラインの配線にも使う
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = Some(services);
        self
    }

    /// 登録済みライブラリを丸ごと渡す（standard は使わない）
    pub fn with_library(mut self, library: StepLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// パイプラインを 1 つ追加登録
    ///
    /// register を使うとライブラリは空から始まり、standard は入らない。
    pub fn register(mut self, kind: TaskKind, pipeline: Pipeline) -> Result<Self, LibraryError> {
        self.library
            .get_or_insert_with(StepLibrary::new)
            .register(kind, pipeline)?;
        Ok(self)
    }

    pub fn with_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventChannel>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSource>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_yield_estimator(mut self, yields: Arc<dyn YieldEstimator>) -> Self {
        self.yields = Some(yields);
        self
    }

    pub fn with_impact_estimator(mut self, impact: Arc<dyn ImpactEstimator>) -> Self {
        self.impact = Some(impact);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 期待される TaskKind のリストを設定
    pub fn expect_kinds(mut self, kinds: &[TaskKind]) -> Self {
        self.expected_kinds = Some(kinds.to_vec());
        self
    }

    /// 検証してからワイヤリングする
    ///
    /// store が JSON ファイルの場合はディレクトリを作るので async。
    pub async fn build(self) -> Result<Cadence, BuildError> {
        validate(&self.config)?;

        let services = self.services.unwrap_or_else(Services::heuristic);
        let library = self
            .library
            .unwrap_or_else(|| StepLibrary::standard(&services));

        if let Some(expected) = &self.expected_kinds {
            let registered = library.registered_kinds();
            let missing: Vec<TaskKind> = expected
                .iter()
                .filter(|k| !registered.contains(k))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingPipelines(missing));
            }
        }

        let store: Arc<dyn TaskStore> = match (self.store, &self.config.store.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(JsonFileTaskStore::open(dir).await?),
            (None, None) => Arc::new(InMemoryTaskStore::new()),
        };
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(BroadcastEventChannel::new(self.config.events.capacity)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let yields = self.yields.unwrap_or_else(|| {
            Arc::new(HistoricalYieldEstimator::with_fallback(
                self.config.planner.default_yield(),
            ))
        });

        let library = Arc::new(library);
        let queue = Arc::new(SubmissionQueue::new());
        let executor = Arc::new(PipelineExecutor::new(
            Arc::clone(&library),
            Arc::clone(&store),
            Arc::clone(&events),
            Arc::clone(&clock),
        ));
        let intake = Arc::new(TaskIntake::new(
            library,
            Arc::clone(&store),
            Arc::clone(&events),
            Arc::clone(&queue),
            Arc::clone(&ids),
            Arc::clone(&clock),
        ));
        let planner = Arc::new(GoalPlanner::new(
            self.config.planner.clone(),
            PlannerDeps {
                store: Arc::clone(&store),
                metrics: self
                    .metrics
                    .unwrap_or_else(|| Arc::new(StaticMetricsSource::new())),
                topics: Arc::clone(&services.topics),
                yields,
                impact: self.impact.unwrap_or_else(|| Arc::new(ViewsImpactEstimator)),
                ids,
                clock: Arc::clone(&clock),
            },
        ));
        let scheduler = Arc::new(ContentScheduler::new(
            Arc::clone(&planner),
            Arc::clone(&store),
            intake.clone(),
            self.config.scheduler.auto_publish,
        ));

        info!(
            kinds = ?executor.library().registered_kinds(),
            workers = self.config.workers.count,
            "cadence built"
        );

        Ok(Cadence {
            config: self.config,
            intake,
            executor,
            queue,
            store,
            events,
            planner,
            scheduler,
            clock,
        })
    }
}

fn validate(config: &CadenceConfig) -> Result<(), BuildError> {
    let cadence = config.goal.cadence_per_week;
    if progress::days_for(0, cadence).is_err() {
        return Err(BuildError::InvalidConfig(format!(
            "goal.cadence_per_week must be at least {MIN_CADENCE_PER_WEEK:.4}, got {cadence}"
        )));
    }
    if config.workers.count == 0 {
        return Err(BuildError::InvalidConfig("workers.count must be at least 1".into()));
    }
    // broadcast::channel(0) は panic する
    if config.events.capacity == 0 {
        return Err(BuildError::InvalidConfig("events.capacity must be at least 1".into()));
    }
    if !(config.planner.buffer_factor >= 1.0) {
        return Err(BuildError::InvalidConfig(format!(
            "planner.buffer_factor must be >= 1.0, got {}",
            config.planner.buffer_factor
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::script;
    use rstest::rstest;

    #[tokio::test]
    async fn build_with_defaults() {
        let app = AppBuilder::new()
            .expect_kinds(&[TaskKind::ScriptToPublish, TaskKind::BatchGeneration])
            .build()
            .await;
        assert!(app.is_ok());
    }

    #[tokio::test]
    async fn build_missing_pipelines() {
        let services = Services::heuristic();
        let app = AppBuilder::new()
            .register(TaskKind::ScriptToPublish, script::pipeline(&services))
            .unwrap()
            .expect_kinds(&[TaskKind::ScriptToPublish, TaskKind::BatchGeneration])
            .build()
            .await;
        assert!(matches!(
            app,
            Err(BuildError::MissingPipelines(missing)) if missing == vec![TaskKind::BatchGeneration]
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let services = Services::heuristic();
        let result = AppBuilder::new()
            .register(TaskKind::ScriptToPublish, script::pipeline(&services))
            .unwrap()
            .register(TaskKind::ScriptToPublish, script::pipeline(&services));
        assert!(matches!(
            result,
            Err(LibraryError::AlreadyRegistered(TaskKind::ScriptToPublish))
        ));
    }

    #[rstest]
    #[case::zero_cadence("[goal]\ncadence_per_week = 0.0")]
    #[case::negative_cadence("[goal]\ncadence_per_week = -1.0")]
    #[case::tiny_cadence("[goal]\ncadence_per_week = 1e-7")]
    #[case::no_workers("[workers]\ncount = 0")]
    #[case::no_event_capacity("[events]\ncapacity = 0")]
    #[case::shrinking_buffer("[planner]\nbuffer_factor = 0.5")]
    #[tokio::test]
    async fn invalid_config_fails_fast(#[case] toml: &str) {
        let config = CadenceConfig::from_toml_str(toml).unwrap();
        let app = AppBuilder::new().with_config(config).build().await;
        assert!(matches!(app, Err(BuildError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn data_dir_selects_the_json_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CadenceConfig::default();
        config.store.data_dir = Some(dir.path().join("tasks"));

        let app = AppBuilder::new().with_config(config).build().await.unwrap();
        let task = app
            .submit_task(
                TaskKind::ScriptToPublish,
                crate::domain::TaskConfig::script("t", "mystery", "a script"),
                crate::domain::OwnerId::new("o"),
            )
            .await
            .unwrap();

        assert!(dir.path().join("tasks").join(format!("{}.json", task.id)).exists());
    }
}
