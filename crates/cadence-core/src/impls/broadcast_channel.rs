//! BroadcastEventChannel - tokio broadcast による EventChannel

use tokio::sync::broadcast;
use tracing::trace;

use crate::ports::{EventChannel, TaskEvent, TaskSubscription};

/// Default buffered events per subscriber before the slowest one starts lagging.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct BroadcastEventChannel {
    tx: broadcast::Sender<TaskEvent>,
}

impl BroadcastEventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventChannel {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventChannel for BroadcastEventChannel {
    fn publish(&self, event: TaskEvent) {
        let task_id = event.task_id;
        // 購読者ゼロなら Err になるが、それは正常
        match self.tx.send(event) {
            Ok(receivers) => trace!(%task_id, receivers, "task event published"),
            Err(_) => trace!(%task_id, "task event dropped (no subscribers)"),
        }
    }

    fn subscribe(&self) -> TaskSubscription {
        TaskSubscription::new(self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, RunStatus, Task, TaskConfig, TaskId, TaskKind};
    use chrono::Utc;
    use ulid::Ulid;

    fn snapshot(status: RunStatus) -> Task {
        let mut t = Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskKind::ScriptToPublish,
            OwnerId::new("o"),
            TaskConfig::default(),
            ["a"],
            Utc::now(),
        );
        t.status = status;
        t
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let channel = BroadcastEventChannel::default();
        channel.publish(TaskEvent::new(snapshot(RunStatus::Pending), Utc::now()));
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_see_events_in_order() {
        let channel = BroadcastEventChannel::new(16);
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        channel.publish(TaskEvent::new(snapshot(RunStatus::Pending), Utc::now()));
        channel.publish(TaskEvent::new(snapshot(RunStatus::Processing), Utc::now()));

        for sub in [&mut first, &mut second] {
            assert_eq!(sub.recv().await.unwrap().snapshot.status, RunStatus::Pending);
            assert_eq!(sub.recv().await.unwrap().snapshot.status, RunStatus::Processing);
        }
    }

    #[tokio::test]
    async fn late_subscriber_gets_no_backlog() {
        let channel = BroadcastEventChannel::new(16);
        let _keep = channel.subscribe();
        channel.publish(TaskEvent::new(snapshot(RunStatus::Pending), Utc::now()));

        let mut late = channel.subscribe();
        assert!(late.try_recv().is_none());
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let channel = BroadcastEventChannel::new(2);
        let mut sub = channel.subscribe();
        for _ in 0..5 {
            channel.publish(TaskEvent::new(snapshot(RunStatus::Processing), Utc::now()));
        }
        channel.publish(TaskEvent::new(snapshot(RunStatus::Completed), Utc::now()));

        let mut last = None;
        while let Some(event) = sub.try_recv() {
            last = Some(event.snapshot.status);
        }
        assert_eq!(last, Some(RunStatus::Completed));
    }
}
