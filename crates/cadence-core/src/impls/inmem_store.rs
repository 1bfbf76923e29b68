//! InMemoryTaskStore - テスト・開発用の TaskStore

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Task, TaskId};
use crate::ports::{StoreError, TaskFilter, TaskStore};

/// HashMap<TaskId, Task> を RwLock で守るだけの正本
///
/// version チェックと書き込みは同じ write ロックの中で行う。
#[derive(Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn upsert(&self, task: &Task) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.write().await;
        let found = tasks.get(&task.id).map_or(0, |stored| stored.version);
        if found != task.version {
            return Err(StoreError::VersionConflict {
                task_id: task.id,
                expected: task.version,
                found,
            });
        }
        let mut record = task.clone();
        record.version = found + 1;
        tasks.insert(task.id, record);
        Ok(found + 1)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().await;
        let mut matched: Vec<Task> = tasks.values().filter(|t| filter.matches(t)).cloned().collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, RunStatus, TaskConfig, TaskKind};
    use chrono::{Duration, Utc};
    use ulid::Ulid;

    fn task(owner: &str, offset_secs: i64) -> Task {
        Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskKind::ScriptToPublish,
            OwnerId::new(owner),
            TaskConfig::default(),
            ["Analyze Script"],
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn upsert_then_get_bumps_version() {
        let store = InMemoryTaskStore::new();
        let mut t = task("a", 0);

        t.version = store.upsert(&t).await.unwrap();
        assert_eq!(t.version, 1);

        t.current_step_index = 1;
        t.version = store.upsert(&t).await.unwrap();

        let stored = store.get(t.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.current_step_index, 1);
    }

    #[tokio::test]
    async fn stale_write_is_a_conflict() {
        let store = InMemoryTaskStore::new();
        let mut t = task("a", 0);
        t.version = store.upsert(&t).await.unwrap();

        let stale = t.clone();
        t.version = store.upsert(&t).await.unwrap();

        let err = store.upsert(&stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { expected: 1, found: 2, .. }));
    }

    #[tokio::test]
    async fn list_filters_by_owner_and_status_newest_first() {
        let store = InMemoryTaskStore::new();
        let older = task("a", 0);
        let newer = task("a", 10);
        let mut failed = task("a", 20);
        failed.status = RunStatus::Failed;
        let other = task("b", 30);
        for t in [&older, &newer, &failed, &other] {
            store.upsert(t).await.unwrap();
        }

        let owned = store.list(&TaskFilter::owner(OwnerId::new("a"))).await.unwrap();
        let ids: Vec<_> = owned.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![failed.id, newer.id, older.id]);

        let only_failed = store
            .list(&TaskFilter::owner(OwnerId::new("a")).with_status(RunStatus::Failed))
            .await
            .unwrap();
        assert_eq!(only_failed.len(), 1);

        assert_eq!(store.list(&TaskFilter::all()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_task_is_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.get(TaskId::from_ulid(Ulid::new())).await.unwrap().is_none());
    }
}
