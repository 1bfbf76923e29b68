//! Step Library
//!
//! ステップ実装（StepHandler）と、TaskKind ごとのパイプライン登録（StepLibrary）。
//! 生成系の外部サービスは [`Services`] でまとめて注入します。

use std::sync::Arc;

pub mod batch;
pub mod handler;
pub mod library;
pub mod reporter;
pub mod script;

pub use handler::{StepContext, StepError, StepHandler};
pub use library::{LibraryError, Pipeline, StepLibrary, Summarizer};
pub use reporter::ProgressReporter;

use crate::domain::TaskKind;
use crate::impls::heuristics;
use crate::ports::{
    ArtifactGenerator, ContentAnalyzer, CoverAssetGenerator, DistributionService,
    MetadataOptimizer, NarrationService, PublishingService, TopicSource, VisualAssetService,
};

/// パイプラインが使う外部サービス一式
///
/// publisher / distributor は None でもよい（手動対応扱いになる）。
#[derive(Clone)]
pub struct Services {
    pub analyzer: Arc<dyn ContentAnalyzer>,
    pub generator: Arc<dyn ArtifactGenerator>,
    pub narration: Arc<dyn NarrationService>,
    pub visuals: Arc<dyn VisualAssetService>,
    pub metadata: Arc<dyn MetadataOptimizer>,
    pub cover: Arc<dyn CoverAssetGenerator>,
    pub publisher: Option<Arc<dyn PublishingService>>,
    pub distributor: Option<Arc<dyn DistributionService>>,
    pub topics: Arc<dyn TopicSource>,
}

impl Services {
    /// ヒューリスティック実装一式（公開・クロスポストも stub で配線済み）
    pub fn heuristic() -> Self {
        Self {
            analyzer: Arc::new(heuristics::HeuristicAnalyzer),
            generator: Arc::new(heuristics::StubArtifactGenerator::default()),
            narration: Arc::new(heuristics::LayeringNarration),
            visuals: Arc::new(heuristics::LayeringVisuals),
            metadata: Arc::new(heuristics::HeuristicMetadataOptimizer),
            cover: Arc::new(heuristics::StaticCoverGenerator::default()),
            publisher: Some(Arc::new(heuristics::StubPublisher::default())),
            distributor: Some(Arc::new(heuristics::StubDistributor::default())),
            topics: Arc::new(heuristics::CannedTopicSource),
        }
    }
}

impl StepLibrary {
    /// script-to-publish と batch-generation を登録済みのライブラリ
    pub fn standard(services: &Services) -> Self {
        Self::new()
            .with_pipeline(TaskKind::ScriptToPublish, script::pipeline(services))
            .with_pipeline(TaskKind::BatchGeneration, batch::pipeline(services))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registers_both_pipelines() {
        let library = StepLibrary::standard(&Services::heuristic());
        assert_eq!(
            library.registered_kinds(),
            vec![TaskKind::ScriptToPublish, TaskKind::BatchGeneration]
        );
        let script = library.get(TaskKind::ScriptToPublish).unwrap();
        assert_eq!(script.len(), 8);
        assert!(!library.get(TaskKind::BatchGeneration).unwrap().is_empty());
    }
}
