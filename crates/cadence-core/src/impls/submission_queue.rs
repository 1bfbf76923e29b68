//! SubmissionQueue - 実行待ちタスク ID の FIFO
//!
//! タスク本体は TaskStore が正本。キューには ID だけを積む。

use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

use crate::domain::TaskId;

#[derive(Default)]
pub struct SubmissionQueue {
    ready: Mutex<VecDeque<TaskId>>,
    notify: Notify,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, task_id: TaskId) {
        self.ready.lock().await.push_back(task_id);
        // 待機者がいなければ permit として残る
        self.notify.notify_one();
    }

    /// 次の ID を待つ。shutdown との競合は呼び出し側の select で扱う
    pub async fn pop(&self) -> TaskId {
        loop {
            if let Some(task_id) = self.ready.lock().await.pop_front() {
                return task_id;
            }
            self.notify.notified().await;
        }
    }

    pub async fn try_pop(&self) -> Option<TaskId> {
        self.ready.lock().await.pop_front()
    }

    pub async fn len(&self) -> usize {
        self.ready.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ready.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use ulid::Ulid;

    fn id() -> TaskId {
        TaskId::from_ulid(Ulid::new())
    }

    #[tokio::test]
    async fn fifo_order() {
        let queue = SubmissionQueue::new();
        let (a, b) = (id(), id());
        queue.push(a).await;
        queue.push(b).await;

        assert_eq!(queue.len().await, 2);
        assert_eq!(queue.pop().await, a);
        assert_eq!(queue.pop().await, b);
        assert!(queue.try_pop().await.is_none());
    }

    #[tokio::test]
    async fn push_wakes_waiting_pop() {
        let queue = Arc::new(SubmissionQueue::new());
        let waiter = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move { queue.pop().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let task_id = id();
        queue.push(task_id).await;

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(popped, task_id);
    }

    #[tokio::test]
    async fn pop_on_empty_queue_waits() {
        let queue = SubmissionQueue::new();
        let res = tokio::time::timeout(Duration::from_millis(50), queue.pop()).await;
        assert!(res.is_err());
    }
}
