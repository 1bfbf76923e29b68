//! Collaborator ports - 生成系の外部サービス
//!
//! 台本解析・動画生成・ナレーション・ビジュアル・メタデータ最適化・
//! サムネイル・公開・クロスポスト・トピック取得・メトリクス取得。
//! コアはこれらの trait だけを知っていて、実装は差し替え可能です。
//!
//! 開発用のヒューリスティック実装は `impls::heuristics` にあります。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MetricsSnapshot, OwnerId, Topic};

/// CollaboratorError は外部サービスの失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{service} unavailable: {reason}")]
    Unavailable { service: String, reason: String },

    #[error("{service} rejected the request: {reason}")]
    Rejected { service: String, reason: String },
}

impl CollaboratorError {
    pub fn unavailable(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

/// 台本解析の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub word_count: usize,
    pub duration_minutes: u32,
    pub tone: String,

    /// 0..=100
    pub viral_potential: u8,

    pub keywords: Vec<String>,
}

/// 生成物への参照。ナレーションやビジュアルを重ねるたびに layers が増える
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub id: String,
    pub style: String,
    pub duration_minutes: u32,

    #[serde(default)]
    pub layers: Vec<String>,
}

/// ArtifactGenerator への入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRequest {
    pub title: String,
    pub body: String,
    pub style: String,
    pub quality: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,

    /// 0..=100
    pub score: u8,
}

#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, raw_input: &str, niche: &str) -> Result<ContentAnalysis, CollaboratorError>;
}

#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(&self, request: &ArtifactRequest) -> Result<ArtifactHandle, CollaboratorError>;
}

#[async_trait]
pub trait NarrationService: Send + Sync {
    async fn narrate(&self, artifact: &ArtifactHandle, voice: &str) -> Result<ArtifactHandle, CollaboratorError>;
}

#[async_trait]
pub trait VisualAssetService: Send + Sync {
    async fn decorate(&self, artifact: &ArtifactHandle, style: &str) -> Result<ArtifactHandle, CollaboratorError>;
}

#[async_trait]
pub trait MetadataOptimizer: Send + Sync {
    async fn optimize(
        &self,
        title: &str,
        body: &str,
        tags: &[String],
    ) -> Result<OptimizedMetadata, CollaboratorError>;
}

#[async_trait]
pub trait CoverAssetGenerator: Send + Sync {
    /// 生成したカバー画像の URL を返す
    async fn generate(&self, topic: &str, style: &str) -> Result<String, CollaboratorError>;
}

/// 公開サービス（オプトイン）
#[async_trait]
pub trait PublishingService: Send + Sync {
    /// 公開 URL を返す
    async fn publish(
        &self,
        artifact: &ArtifactHandle,
        metadata: &OptimizedMetadata,
        owner_id: &OwnerId,
    ) -> Result<String, CollaboratorError>;
}

/// クロスポスト（オプトイン）
#[async_trait]
pub trait DistributionService: Send + Sync {
    /// 投稿できたプラットフォーム名の一覧を返す
    async fn distribute(&self, public_url: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// トレンドトピックの取得元（Goal Planner が使う）
#[async_trait]
pub trait TopicSource: Send + Sync {
    async fn topics(&self, niche: &str, count: usize) -> Result<Vec<Topic>, CollaboratorError>;
}

/// 外部から報告される現在のメトリクス
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn metrics(&self, owner_id: &OwnerId) -> Result<MetricsSnapshot, CollaboratorError>;
}
