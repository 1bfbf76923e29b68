//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 永続化・通知・生成サービス・推定ロジックはすべて trait 越しに注入され、
//! テストではインメモリ実装に差し替えます。

pub mod clock;
pub mod collaborators;
pub mod estimator;
pub mod event_channel;
pub mod id_generator;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::collaborators::{
    ArtifactGenerator, ArtifactHandle, ArtifactRequest, CollaboratorError, ContentAnalysis,
    ContentAnalyzer, CoverAssetGenerator, DistributionService, MetadataOptimizer, MetricsSource,
    NarrationService, OptimizedMetadata, PublishingService, TopicSource, VisualAssetService,
};
pub use self::estimator::{ImpactEstimator, YieldEstimator};
pub use self::event_channel::{EventChannel, TaskEvent, TaskSubscription};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::{StoreError, TaskFilter, TaskStore};
