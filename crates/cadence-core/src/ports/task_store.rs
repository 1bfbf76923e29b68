//! TaskStore port - Task レコードの正本（source of truth）
//!
//! TaskStore は Task/Step レコードを排他的に所有します。
//! エグゼキュータは常に Task 全体を read-modify-write します。
//!
//! # 実装
//! - InMemoryTaskStore（テスト・開発用）
//! - JsonFileTaskStore（1 タスク 1 ファイル）

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{OwnerId, RunStatus, Task, TaskId};

/// StoreError は永続化層のエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// 別の書き手が先に更新した（楽観的ロック）
    #[error("version conflict for {task_id}: expected {expected}, found {found}")]
    VersionConflict {
        task_id: TaskId,
        expected: u64,
        found: u64,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record: {0}")]
    Serde(#[from] serde_json::Error),
}

/// list() の絞り込み条件。None は「全件」。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub owner_id: Option<OwnerId>,
    pub status: Option<RunStatus>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn owner(owner_id: OwnerId) -> Self {
        Self {
            owner_id: Some(owner_id),
            status: None,
        }
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        self.owner_id.as_ref().is_none_or(|o| *o == task.owner_id)
            && self.status.is_none_or(|s| s == task.status)
    }
}

/// TaskStore は Task の永続化
///
/// # 設計原則
/// - upsert は id 単位の丸ごと置き換え（フィールド単位の merge はしない）
/// - 書き込み時に `task.version` と保存済み version を比較する
///   （新規作成は version 0）。一致しなければ VersionConflict
/// - 成功すると新しい version を返す。呼び出し側は `task.version` に反映する
/// - list は新しい順（created_at 降順）
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn upsert(&self, task: &Task) -> Result<u64, StoreError>;

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError>;
}
