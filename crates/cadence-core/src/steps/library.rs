//! StepLibrary - TaskKind ごとのパイプライン登録
//!
//! # 内部実装
//! - HashMap<TaskKind, Arc<Pipeline>> で管理
//! - 二重登録は LibraryError::AlreadyRegistered

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::handler::{StepContext, StepHandler};
use crate::domain::{TaskKind, TaskResult};

/// 蓄積されたステップ出力から TaskResult を組み立てる
pub type Summarizer = fn(&StepContext) -> TaskResult;

/// 順序付きのハンドラ列 + summarizer
#[derive(Clone)]
pub struct Pipeline {
    handlers: Vec<Arc<dyn StepHandler>>,
    summarize: Summarizer,
}

impl Pipeline {
    pub fn new(summarize: Summarizer) -> Self {
        Self {
            handlers: Vec::new(),
            summarize,
        }
    }

    pub fn with_step(mut self, handler: impl StepHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn step_names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn handler(&self, index: usize) -> Option<&Arc<dyn StepHandler>> {
        self.handlers.get(index)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn summarize(&self, ctx: &StepContext) -> TaskResult {
        (self.summarize)(ctx)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline").field("steps", &self.step_names()).finish()
    }
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("pipeline for task kind '{0}' is already registered")]
    AlreadyRegistered(TaskKind),
}

#[derive(Default, Clone)]
pub struct StepLibrary {
    pipelines: HashMap<TaskKind, Arc<Pipeline>>,
}

impl StepLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: TaskKind, pipeline: Pipeline) -> Result<(), LibraryError> {
        if self.pipelines.contains_key(&kind) {
            return Err(LibraryError::AlreadyRegistered(kind));
        }
        self.pipelines.insert(kind, Arc::new(pipeline));
        Ok(())
    }

    /// 既存の登録は置き換える
    pub fn with_pipeline(mut self, kind: TaskKind, pipeline: Pipeline) -> Self {
        self.pipelines.insert(kind, Arc::new(pipeline));
        self
    }

    pub fn get(&self, kind: TaskKind) -> Option<Arc<Pipeline>> {
        self.pipelines.get(&kind).cloned()
    }

    pub fn registered_kinds(&self) -> Vec<TaskKind> {
        let mut kinds: Vec<_> = self.pipelines.keys().copied().collect();
        kinds.sort();
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StepOutcome;
    use crate::steps::{ProgressReporter, StepError};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl StepHandler for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _: &StepContext, _: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
            Ok(StepOutcome::completed("ok"))
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(|_| TaskResult::default())
            .with_step(Named("one"))
            .with_step(Named("two"))
    }

    #[test]
    fn register_and_get() {
        let mut library = StepLibrary::new();
        library.register(TaskKind::ScriptToPublish, pipeline()).unwrap();

        let found = library.get(TaskKind::ScriptToPublish).unwrap();
        assert_eq!(found.step_names(), vec!["one", "two"]);
        assert!(library.get(TaskKind::BatchGeneration).is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut library = StepLibrary::new();
        library.register(TaskKind::ScriptToPublish, pipeline()).unwrap();
        let err = library.register(TaskKind::ScriptToPublish, pipeline()).unwrap_err();
        assert!(matches!(err, LibraryError::AlreadyRegistered(TaskKind::ScriptToPublish)));
    }

    #[test]
    fn with_pipeline_replaces() {
        let replacement = Pipeline::new(|_| TaskResult::default()).with_step(Named("only"));
        let library = StepLibrary::new()
            .with_pipeline(TaskKind::ScriptToPublish, pipeline())
            .with_pipeline(TaskKind::ScriptToPublish, replacement);

        let found = library.get(TaskKind::ScriptToPublish).unwrap();
        assert_eq!(found.step_names(), vec!["only"]);
        assert_eq!(library.registered_kinds(), vec![TaskKind::ScriptToPublish]);
    }

    #[test]
    fn registered_kinds_are_sorted() {
        let mut library = StepLibrary::new();
        library.register(TaskKind::BatchGeneration, pipeline()).unwrap();
        library.register(TaskKind::ScriptToPublish, pipeline()).unwrap();
        assert_eq!(
            library.registered_kinds(),
            vec![TaskKind::ScriptToPublish, TaskKind::BatchGeneration]
        );
    }

    #[test]
    fn default_describe_uses_name() {
        assert_eq!(Named("Render").describe(), "Render...");
    }
}
