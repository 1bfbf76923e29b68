//! EventChannel port - タスク状態スナップショットの配信
//!
//! # 配信保証
//! - best-effort（購読者がいなければ捨てる）
//! - 同一タスク内では発行順を保つ。タスク間の順序は保証しない
//! - 購読前のイベント（backlog）は届かない。backlog は TaskStore に問い合わせる

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::{Task, TaskId};

/// 配信されるイベント: タスク ID + その時点のスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub task_id: TaskId,
    pub snapshot: Task,
    pub published_at: DateTime<Utc>,
}

impl TaskEvent {
    pub fn new(snapshot: Task, published_at: DateTime<Utc>) -> Self {
        Self {
            task_id: snapshot.id,
            snapshot,
            published_at,
        }
    }
}

/// EventChannel はスナップショットを購読者にファンアウト
pub trait EventChannel: Send + Sync {
    /// fire-and-forget
    fn publish(&self, event: TaskEvent);

    /// 以降に発行されたイベントだけを受け取る
    fn subscribe(&self) -> TaskSubscription;
}

/// 購読ハンドル
///
/// 受信が遅れて取りこぼした分はスキップして次のイベントを返す。
pub struct TaskSubscription {
    rx: broadcast::Receiver<TaskEvent>,
}

impl TaskSubscription {
    pub fn new(rx: broadcast::Receiver<TaskEvent>) -> Self {
        Self { rx }
    }

    /// 次のイベント。チャンネルが閉じたら None
    pub async fn recv(&mut self) -> Option<TaskEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "task subscription lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// 待たずに取れるイベントだけ返す
    pub fn try_recv(&mut self) -> Option<TaskEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
