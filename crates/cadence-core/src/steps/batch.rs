//! batch-generation pipeline
//!
//! トピック一覧からまとめて生成する。1 件でも生成に失敗したらそこで止まる。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::handler::{StepContext, StepError, StepHandler};
use super::reporter::ProgressReporter;
use super::{Pipeline, Services};
use crate::domain::{StepOutcome, TaskResult};
use crate::ports::{ArtifactGenerator, ArtifactRequest, MetadataOptimizer, TopicSource};

pub const GATHER: &str = "Gather Topics";
pub const GENERATE: &str = "Generate Batch";
pub const OPTIMIZE: &str = "Optimize Batch";

/// `batch_size` が 0 のときにトピック源へ要求する件数
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Minutes assumed for each batch item.
const ITEM_MINUTES: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub topic: String,
    pub artifact_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
}

pub fn pipeline(services: &Services) -> Pipeline {
    Pipeline::new(summarize)
        .with_step(GatherStep(Arc::clone(&services.topics)))
        .with_step(GenerateBatchStep(Arc::clone(&services.generator)))
        .with_step(OptimizeBatchStep(Arc::clone(&services.metadata)))
}

/// 0..=99 に収まる per-item 進捗
fn item_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((done * 100) / total).min(99) as u8
}

struct GatherStep(Arc<dyn TopicSource>);

#[async_trait]
impl StepHandler for GatherStep {
    fn name(&self) -> &str {
        GATHER
    }

    fn describe(&self) -> String {
        "Collecting topics...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let topics: Vec<String> = if ctx.config.topics.is_empty() {
            let count = match ctx.config.batch_size {
                0 => DEFAULT_BATCH_SIZE,
                n => n,
            };
            progress.report(30, format!("Requesting {count} trending topics...")).await;
            self.0
                .topics(&ctx.config.niche, count)
                .await?
                .into_iter()
                .map(|t| t.title)
                .collect()
        } else {
            ctx.config.topics.clone()
        };

        if topics.is_empty() {
            return Ok(StepOutcome::failed("No topics to generate"));
        }
        Ok(StepOutcome::completed(format!("{} topics queued", topics.len())).with_typed_data(&topics)?)
    }
}

struct GenerateBatchStep(Arc<dyn ArtifactGenerator>);

#[async_trait]
impl StepHandler for GenerateBatchStep {
    fn name(&self) -> &str {
        GENERATE
    }

    fn describe(&self) -> String {
        "Generating batch...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let topics: Vec<String> = ctx.output_as(GATHER)?;
        let style = ctx.config.style.clone().unwrap_or_else(|| "cinematic".into());
        let quality = ctx.config.quality.clone().unwrap_or_else(|| "1080p".into());

        let mut items = Vec::with_capacity(topics.len());
        for (i, topic) in topics.iter().enumerate() {
            let artifact = self
                .0
                .generate(&ArtifactRequest {
                    title: topic.clone(),
                    body: topic.clone(),
                    style: style.clone(),
                    quality: quality.clone(),
                    duration_minutes: ITEM_MINUTES,
                })
                .await?;
            items.push(BatchItem {
                topic: topic.clone(),
                artifact_id: artifact.id,
                title: None,
                score: None,
            });
            progress
                .report(item_progress(i + 1, topics.len()), format!("Generated {}/{}: {topic}", i + 1, topics.len()))
                .await;
        }

        Ok(StepOutcome::completed(format!("Generated {} items", items.len())).with_typed_data(&items)?)
    }
}

struct OptimizeBatchStep(Arc<dyn MetadataOptimizer>);

#[async_trait]
impl StepHandler for OptimizeBatchStep {
    fn name(&self) -> &str {
        OPTIMIZE
    }

    fn describe(&self) -> String {
        "Optimizing metadata...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let mut items: Vec<BatchItem> = ctx.output_as(GENERATE)?;
        let tags: Vec<String> = if ctx.config.niche.is_empty() {
            Vec::new()
        } else {
            vec![ctx.config.niche.to_lowercase()]
        };

        let total = items.len();
        for (i, item) in items.iter_mut().enumerate() {
            let metadata = self.0.optimize(&item.topic, "", &tags).await?;
            item.title = Some(metadata.title);
            item.score = Some(metadata.score);
            progress.report(item_progress(i + 1, total), format!("Optimized {}/{total}", i + 1)).await;
        }

        Ok(StepOutcome::completed(format!("Optimized {total} items")).with_typed_data(&items)?)
    }
}

pub fn summarize(ctx: &StepContext) -> TaskResult {
    let mut result = TaskResult {
        outputs: ctx.outputs().clone(),
        ..TaskResult::default()
    };
    let items: Vec<BatchItem> = ctx
        .output_as(OPTIMIZE)
        .or_else(|_| ctx.output_as(GENERATE))
        .unwrap_or_default();

    result.metrics.insert("items".into(), items.len() as f64);
    let scores: Vec<f64> = items.iter().filter_map(|i| i.score).map(f64::from).collect();
    if !scores.is_empty() {
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        result.metrics.insert("metadata_score".into(), avg);
    }
    result.artifact_id = items.first().map(|i| i.artifact_id.clone());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 4, 25)]
    #[case(3, 3, 99)]
    fn per_item_progress_stays_below_done(#[case] done: usize, #[case] total: usize, #[case] expected: u8) {
        assert_eq!(item_progress(done, total), expected);
    }

    #[test]
    fn pipeline_steps() {
        assert_eq!(pipeline(&Services::heuristic()).step_names(), vec![GATHER, GENERATE, OPTIMIZE]);
    }
}
