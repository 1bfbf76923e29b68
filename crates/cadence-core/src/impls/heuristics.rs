//! Heuristic collaborators
//!
//! 実サービスなしでパイプラインを端から端まで動かすための実装。
//! 数値は旧ダッシュボードの経験則そのまま（品質の保証はしない）。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use rand::seq::SliceRandom;

use crate::domain::{MetricsSnapshot, OwnerId, Topic};
use crate::ports::{
    ArtifactGenerator, ArtifactHandle, ArtifactRequest, CollaboratorError, ContentAnalysis,
    ContentAnalyzer, CoverAssetGenerator, DistributionService, MetadataOptimizer, MetricsSource,
    NarrationService, OptimizedMetadata, PublishingService, TopicSource, VisualAssetService,
};

pub const WORDS_PER_MINUTE: usize = 150;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    fn tone(lower: &str) -> &'static str {
        if lower.contains("mystery") || lower.contains("secret") {
            "mysterious"
        } else if lower.contains("exciting") || lower.contains("amazing") {
            "energetic"
        } else if lower.contains("serious") || lower.contains("important") {
            "serious"
        } else {
            "neutral"
        }
    }

    /// hook: 100 文字を超える導入 / CTA: subscribe か like / 尺: 8〜12 分
    fn viral_potential(raw: &str, lower: &str, duration: u32) -> u8 {
        let hook = if raw.chars().count() > 100 { 50 } else { 30 };
        let cta = if lower.contains("subscribe") || lower.contains("like") { 20 } else { 0 };
        let length = if (8..=12).contains(&duration) { 30 } else { 10 };
        hook + cta + length
    }

    /// 5 文字以上の語を頻度順に最大 10 個。同数なら先に出た語が先
    fn keywords(lower: &str) -> Vec<String> {
        let mut freq: HashMap<String, (usize, usize)> = HashMap::new();
        for (pos, word) in lower.split_whitespace().enumerate() {
            let word: String = word.chars().filter(|c| c.is_ascii_lowercase()).collect();
            if word.len() > 4 && !STOP_WORDS.contains(&word.as_str()) {
                freq.entry(word).or_insert((0, pos)).0 += 1;
            }
        }
        let mut ranked: Vec<_> = freq.into_iter().collect();
        ranked.sort_by(|(_, (ca, pa)), (_, (cb, pb))| cb.cmp(ca).then(pa.cmp(pb)));
        ranked.into_iter().take(10).map(|(w, _)| w).collect()
    }
}

#[async_trait]
impl ContentAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, raw_input: &str, _niche: &str) -> Result<ContentAnalysis, CollaboratorError> {
        if raw_input.trim().is_empty() {
            return Err(CollaboratorError::rejected("analyzer", "script is empty"));
        }
        let lower = raw_input.to_lowercase();
        let word_count = raw_input.split_whitespace().count();
        let duration_minutes = word_count.div_ceil(WORDS_PER_MINUTE) as u32;

        Ok(ContentAnalysis {
            word_count,
            duration_minutes,
            tone: Self::tone(&lower).to_string(),
            viral_potential: Self::viral_potential(raw_input, &lower, duration_minutes),
            keywords: Self::keywords(&lower),
        })
    }
}

// ---------------------------------------------------------------------------
// Artifact / narration / visuals / cover
// ---------------------------------------------------------------------------

/// 連番 ID を振るだけの生成器
#[derive(Debug, Default)]
pub struct StubArtifactGenerator {
    next: AtomicU64,
}

#[async_trait]
impl ArtifactGenerator for StubArtifactGenerator {
    async fn generate(&self, request: &ArtifactRequest) -> Result<ArtifactHandle, CollaboratorError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ArtifactHandle {
            id: format!("artifact-{n:04}"),
            style: request.style.clone(),
            duration_minutes: request.duration_minutes,
            layers: vec![format!("render:{}", request.quality)],
        })
    }
}

/// layer を 1 枚積むだけのナレーション
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeringNarration;

#[async_trait]
impl NarrationService for LayeringNarration {
    async fn narrate(&self, artifact: &ArtifactHandle, voice: &str) -> Result<ArtifactHandle, CollaboratorError> {
        let mut enriched = artifact.clone();
        enriched.layers.push(format!("narration:{voice}"));
        Ok(enriched)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayeringVisuals;

#[async_trait]
impl VisualAssetService for LayeringVisuals {
    async fn decorate(&self, artifact: &ArtifactHandle, style: &str) -> Result<ArtifactHandle, CollaboratorError> {
        let mut enriched = artifact.clone();
        enriched.layers.push(format!("visuals:{style}"));
        Ok(enriched)
    }
}

#[derive(Debug, Clone)]
pub struct StaticCoverGenerator {
    base_url: String,
}

impl StaticCoverGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for StaticCoverGenerator {
    fn default() -> Self {
        Self::new("https://covers.invalid")
    }
}

#[async_trait]
impl CoverAssetGenerator for StaticCoverGenerator {
    async fn generate(&self, topic: &str, style: &str) -> Result<String, CollaboratorError> {
        Ok(format!("{}/{}/{}.png", self.base_url, slug(style), slug(topic)))
    }
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

const TITLE_TEMPLATES: &[&str] = &[
    "The {kw} Secret That Changed Everything",
    "{kw}: What They Don't Want You To Know",
    "I Tried {kw} For 30 Days - Here's What Happened",
    "Why {kw} Is Taking Over This Year",
];

/// タイトル・説明文・タグのルーブリックで 0..=100 を採点
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMetadataOptimizer;

impl HeuristicMetadataOptimizer {
    pub fn score(title: &str, description: &str, tags: &[String]) -> u8 {
        let title_len = title.chars().count();
        let mut score = 0u8;
        if (40..=70).contains(&title_len) {
            score += 25;
        }
        if description.chars().count() >= 150 {
            score += 25;
        }
        if tags.len() >= 10 {
            score += 25;
        }
        if title.contains(':') || title.contains('-') {
            score += 10;
        }
        if description.contains('#') {
            score += 15;
        }
        score.min(100)
    }

    fn description(title: &str, tags: &[String]) -> String {
        let first = tags.first().map_or("this story", String::as_str);
        let second = tags.get(1).map_or("what comes next", String::as_str);
        let hashtags: Vec<String> = tags.iter().take(5).map(|t| format!("#{t}")).collect();
        format!(
            "{title}\n\nIn this video I reveal everything about {first} and {second}.\n\n\
             0:00 - Introduction\n0:45 - Main Content\n5:30 - Key Takeaways\n7:00 - Conclusion\n\n\
             {}",
            hashtags.join(" ")
        )
    }
}

#[async_trait]
impl MetadataOptimizer for HeuristicMetadataOptimizer {
    async fn optimize(&self, title: &str, _body: &str, tags: &[String]) -> Result<OptimizedMetadata, CollaboratorError> {
        let mut all_tags: Vec<String> = Vec::with_capacity(tags.len() + 2);
        for tag in tags.iter().map(|t| t.to_lowercase()).chain(["viral".into(), "trending".into()]) {
            if !tag.is_empty() && !all_tags.contains(&tag) {
                all_tags.push(tag);
            }
        }

        let title = if title.trim().is_empty() {
            let keyword = all_tags.first().map_or("This", String::as_str);
            let template = TITLE_TEMPLATES
                .choose(&mut rand::thread_rng())
                .copied()
                .unwrap_or("{kw}");
            template.replace("{kw}", keyword)
        } else {
            title.to_string()
        };

        let description = Self::description(&title, &all_tags);
        let score = Self::score(&title, &description, &all_tags);
        Ok(OptimizedMetadata {
            title,
            description,
            tags: all_tags,
            score,
        })
    }
}

// ---------------------------------------------------------------------------
// Publishing / distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StubPublisher {
    base_url: String,
}

impl StubPublisher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for StubPublisher {
    fn default() -> Self {
        Self::new("https://videos.invalid")
    }
}

#[async_trait]
impl PublishingService for StubPublisher {
    async fn publish(
        &self,
        artifact: &ArtifactHandle,
        metadata: &OptimizedMetadata,
        owner_id: &OwnerId,
    ) -> Result<String, CollaboratorError> {
        if metadata.title.trim().is_empty() {
            return Err(CollaboratorError::rejected("publisher", "title is required"));
        }
        Ok(format!("{}/{}/{}", self.base_url, owner_id, artifact.id))
    }
}

pub const DEFAULT_PLATFORMS: &[&str] = &["TikTok", "Instagram", "Twitter", "Facebook", "LinkedIn"];

#[derive(Debug, Clone)]
pub struct StubDistributor {
    platforms: Vec<String>,
}

impl StubDistributor {
    pub fn new(platforms: Vec<String>) -> Self {
        Self { platforms }
    }
}

impl Default for StubDistributor {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORMS.iter().map(|p| p.to_string()).collect())
    }
}

#[async_trait]
impl DistributionService for StubDistributor {
    async fn distribute(&self, _public_url: &str) -> Result<Vec<String>, CollaboratorError> {
        Ok(self.platforms.clone())
    }
}

// ---------------------------------------------------------------------------
// Topics / metrics
// ---------------------------------------------------------------------------

const TRENDING: &[&str] = &[
    "The Hidden Truth Nobody Talks About",
    "What Scientists Just Discovered",
    "The Secret That Changed Everything",
    "What They Don't Want You To Know",
    "The Mystery Finally Solved",
    "The Shocking Reality Revealed",
    "What Really Happened (Full Story)",
    "The Truth Behind The Legend",
    "The Discovery That Shocked Experts",
    "What The Evidence Actually Shows",
];

/// 固定リストを " - Part N" 付きで循環させるトピック源
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedTopicSource;

impl CannedTopicSource {
    /// viral score 85..=99 を決定的に割り振る
    fn viral_score(index: usize) -> u8 {
        85 + ((index * 7) % 15) as u8
    }
}

#[async_trait]
impl TopicSource for CannedTopicSource {
    async fn topics(&self, niche: &str, count: usize) -> Result<Vec<Topic>, CollaboratorError> {
        Ok((0..count)
            .map(|i| {
                let viral_score = Self::viral_score(i);
                Topic {
                    title: format!("{} - Part {}", TRENDING[i % TRENDING.len()], i + 1),
                    niche: niche.to_string(),
                    viral_score,
                    estimated_views: u64::from(viral_score) * 1_000,
                }
            })
            .collect())
    }
}

/// owner ごとの値を固定で返す。未登録の owner は 0/0
#[derive(Debug, Clone, Default)]
pub struct StaticMetricsSource {
    by_owner: HashMap<OwnerId, MetricsSnapshot>,
}

impl StaticMetricsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, owner_id: OwnerId, metrics: MetricsSnapshot) -> Self {
        self.by_owner.insert(owner_id, metrics);
        self
    }
}

#[async_trait]
impl MetricsSource for StaticMetricsSource {
    async fn metrics(&self, owner_id: &OwnerId) -> Result<MetricsSnapshot, CollaboratorError> {
        Ok(self.by_owner.get(owner_id).copied().unwrap_or_default())
    }
}
