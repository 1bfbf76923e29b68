//! script-to-publish pipeline
//!
//! 台本 → 解析 → 動画 → ナレーション → ビジュアル → メタデータ → サムネイル → 公開 → クロスポスト。
//! 公開とクロスポストはオプトイン。`auto_publish` が false か、サービスが
//! 配線されていなければ「手動対応待ち」で completed にする（失敗にはしない）。

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::handler::{StepContext, StepError, StepHandler};
use super::reporter::ProgressReporter;
use super::Services;
use crate::domain::{StepOutcome, TaskResult};
use crate::ports::{
    ArtifactGenerator, ArtifactHandle, ArtifactRequest, ContentAnalysis, ContentAnalyzer,
    CoverAssetGenerator, DistributionService, MetadataOptimizer, NarrationService,
    OptimizedMetadata, PublishingService, VisualAssetService,
};

pub const ANALYZE: &str = "Analyze Script";
pub const GENERATE: &str = "Generate Video";
pub const VOICEOVER: &str = "Add Voiceover";
pub const VISUALS: &str = "Add Visuals";
pub const METADATA: &str = "Optimize Metadata";
pub const THUMBNAIL: &str = "Generate Thumbnail";
pub const PUBLISH: &str = "Publish";
pub const CROSS_POST: &str = "Cross-post";

const DEFAULT_STYLE: &str = "cinematic";
const DEFAULT_QUALITY: &str = "1080p";

/// Estimated views per point of viral potential.
pub const VIEWS_PER_VIRAL_POINT: f64 = 1_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverOutput {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishOutput {
    pub public_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionOutput {
    pub platforms: Vec<String>,
}

pub fn pipeline(services: &Services) -> super::Pipeline {
    super::Pipeline::new(summarize)
        .with_step(AnalyzeStep(Arc::clone(&services.analyzer)))
        .with_step(GenerateStep(Arc::clone(&services.generator)))
        .with_step(VoiceoverStep(Arc::clone(&services.narration)))
        .with_step(VisualsStep(Arc::clone(&services.visuals)))
        .with_step(MetadataStep(Arc::clone(&services.metadata)))
        .with_step(ThumbnailStep(Arc::clone(&services.cover)))
        .with_step(PublishStep(services.publisher.clone()))
        .with_step(CrossPostStep(services.distributor.clone()))
}

fn style(ctx: &StepContext) -> &str {
    ctx.config.style.as_deref().unwrap_or(DEFAULT_STYLE)
}

/// トーンに合う声（指定が無いとき）
fn voice_for(tone: &str) -> &'static str {
    match tone {
        "mysterious" => "deep",
        "energetic" => "upbeat",
        "serious" => "authoritative",
        _ => "neutral",
    }
}

struct AnalyzeStep(Arc<dyn ContentAnalyzer>);

#[async_trait]
impl StepHandler for AnalyzeStep {
    fn name(&self) -> &str {
        ANALYZE
    }

    fn describe(&self) -> String {
        "Reading script content...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        progress.report(10, "Reading script content...").await;
        let analysis = self.0.analyze(&ctx.config.input, &ctx.config.niche).await?;
        progress.report(50, "Extracting keywords and hooks...").await;

        Ok(StepOutcome::completed(format!(
            "Analyzed: {} words, {}min duration",
            analysis.word_count, analysis.duration_minutes
        ))
        .with_typed_data(&analysis)?)
    }
}

struct GenerateStep(Arc<dyn ArtifactGenerator>);

#[async_trait]
impl StepHandler for GenerateStep {
    fn name(&self) -> &str {
        GENERATE
    }

    fn describe(&self) -> String {
        "Creating video structure...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let analysis: ContentAnalysis = ctx.output_as(ANALYZE)?;
        progress.report(20, "Creating video structure...").await;

        let request = ArtifactRequest {
            title: ctx.config.title.clone(),
            body: ctx.config.input.clone(),
            style: style(ctx).to_string(),
            quality: ctx.config.quality.clone().unwrap_or_else(|| DEFAULT_QUALITY.to_string()),
            duration_minutes: analysis.duration_minutes,
        };
        let artifact = self.0.generate(&request).await?;
        progress.report(60, "Rendering video scenes...").await;

        Ok(StepOutcome::completed(format!("Video generated: {}", artifact.id)).with_typed_data(&artifact)?)
    }
}

struct VoiceoverStep(Arc<dyn NarrationService>);

#[async_trait]
impl StepHandler for VoiceoverStep {
    fn name(&self) -> &str {
        VOICEOVER
    }

    fn describe(&self) -> String {
        "Selecting optimal voice...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let analysis: ContentAnalysis = ctx.output_as(ANALYZE)?;
        let artifact: ArtifactHandle = ctx.output_as(GENERATE)?;
        let voice = ctx
            .config
            .voice
            .clone()
            .unwrap_or_else(|| voice_for(&analysis.tone).to_string());

        progress.report(30, "Selecting optimal voice...").await;
        progress.report(70, format!("Generating {voice} voiceover...")).await;
        let narrated = self.0.narrate(&artifact, &voice).await?;

        Ok(StepOutcome::completed(format!("Voiceover added: {voice}")).with_typed_data(&narrated)?)
    }
}

struct VisualsStep(Arc<dyn VisualAssetService>);

#[async_trait]
impl StepHandler for VisualsStep {
    fn name(&self) -> &str {
        VISUALS
    }

    fn describe(&self) -> String {
        "Adding animations and effects...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let artifact: ArtifactHandle = ctx.output_as(VOICEOVER)?;
        let style = style(ctx);

        progress.report(40, "Adding animations and effects...").await;
        let decorated = self.0.decorate(&artifact, style).await?;
        progress.report(80, "Rendering final video...").await;

        Ok(StepOutcome::completed(format!("Visual style: {style}")).with_typed_data(&decorated)?)
    }
}

struct MetadataStep(Arc<dyn MetadataOptimizer>);

#[async_trait]
impl StepHandler for MetadataStep {
    fn name(&self) -> &str {
        METADATA
    }

    fn describe(&self) -> String {
        "Generating title...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let analysis: ContentAnalysis = ctx.output_as(ANALYZE)?;
        let mut tags = analysis.keywords.clone();
        if !ctx.config.niche.is_empty() {
            tags.push(ctx.config.niche.to_lowercase());
        }

        progress.report(50, "Generating title...").await;
        let metadata = self.0.optimize(&ctx.config.title, &ctx.config.input, &tags).await?;
        progress.report(80, "Creating tags and description...").await;

        Ok(StepOutcome::completed(format!("Metadata score: {}/100", metadata.score)).with_typed_data(&metadata)?)
    }
}

struct ThumbnailStep(Arc<dyn CoverAssetGenerator>);

#[async_trait]
impl StepHandler for ThumbnailStep {
    fn name(&self) -> &str {
        THUMBNAIL
    }

    fn describe(&self) -> String {
        "Creating thumbnail...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let metadata: OptimizedMetadata = ctx.output_as(METADATA)?;
        progress.report(60, "Creating thumbnail...").await;
        let url = self.0.generate(&metadata.title, style(ctx)).await?;

        Ok(StepOutcome::completed("Thumbnail ready").with_typed_data(&CoverOutput { url })?)
    }
}

struct PublishStep(Option<Arc<dyn PublishingService>>);

#[async_trait]
impl StepHandler for PublishStep {
    fn name(&self) -> &str {
        PUBLISH
    }

    fn describe(&self) -> String {
        "Connecting to publisher...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let publisher = match &self.0 {
            Some(publisher) if ctx.config.auto_publish => publisher,
            _ => {
                return Ok(StepOutcome::completed("Video ready for manual upload")
                    .with_typed_data(&PublishOutput { public_url: None })?);
            }
        };

        let artifact: ArtifactHandle = ctx.output_as(VISUALS)?;
        let metadata: OptimizedMetadata = ctx.output_as(METADATA)?;
        progress.report(30, "Connecting to publisher...").await;
        progress.report(60, "Uploading video...").await;
        let url = publisher.publish(&artifact, &metadata, &ctx.owner_id).await?;

        Ok(StepOutcome::completed(format!("Uploaded: {url}"))
            .with_typed_data(&PublishOutput { public_url: Some(url) })?)
    }
}

struct CrossPostStep(Option<Arc<dyn DistributionService>>);

#[async_trait]
impl StepHandler for CrossPostStep {
    fn name(&self) -> &str {
        CROSS_POST
    }

    fn describe(&self) -> String {
        "Creating platform variations...".into()
    }

    async fn run(&self, ctx: &StepContext, progress: &mut ProgressReporter<'_>) -> Result<StepOutcome, StepError> {
        let published: Option<PublishOutput> = ctx.output_as(PUBLISH).ok();
        let target = match (&self.0, published.and_then(|p| p.public_url)) {
            (Some(distributor), Some(url)) if ctx.config.auto_publish => Some((distributor, url)),
            _ => None,
        };
        let Some((distributor, url)) = target else {
            return Ok(StepOutcome::completed("Skipped cross-posting")
                .with_typed_data(&DistributionOutput { platforms: Vec::new() })?);
        };

        progress.report(40, "Creating platform variations...").await;
        let platforms = distributor.distribute(&url).await?;
        progress.report(80, format!("Posting to {} platforms...", platforms.len())).await;

        Ok(StepOutcome::completed(format!("Posted to: {}", platforms.join(", ")))
            .with_typed_data(&DistributionOutput { platforms })?)
    }
}

/// 解析結果・最終アーティファクト・公開先をまとめる
pub fn summarize(ctx: &StepContext) -> TaskResult {
    let mut result = TaskResult {
        outputs: ctx.outputs().clone(),
        ..TaskResult::default()
    };

    if let Ok(analysis) = ctx.output_as::<ContentAnalysis>(ANALYZE) {
        let viral = f64::from(analysis.viral_potential);
        result.metrics.insert("viral_potential".into(), viral);
        result.metrics.insert("duration_minutes".into(), f64::from(analysis.duration_minutes));
        result.metrics.insert("estimated_views".into(), viral * VIEWS_PER_VIRAL_POINT);
    }
    if let Ok(metadata) = ctx.output_as::<OptimizedMetadata>(METADATA) {
        result.metrics.insert("metadata_score".into(), f64::from(metadata.score));
    }
    result.artifact_id = ctx.output_as::<ArtifactHandle>(VISUALS).ok().map(|a| a.id);
    result.public_url = ctx.output_as::<PublishOutput>(PUBLISH).ok().and_then(|p| p.public_url);
    result.platforms = ctx
        .output_as::<DistributionOutput>(CROSS_POST)
        .map(|d| d.platforms)
        .unwrap_or_default();
    result
}
