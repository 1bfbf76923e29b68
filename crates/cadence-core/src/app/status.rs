//! Status - タスク件数の集計（ダッシュボード用）

use serde::{Deserialize, Serialize};

use crate::domain::{RunStatus, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,

    /// failed のうち、開始前にキャンセルされたもの
    pub cancelled: usize,

    /// 投入キューに積まれていてまだワーカーが取っていない ID
    pub queued: usize,
}

impl TaskCounts {
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = Self::default();
        for task in tasks {
            match task.status {
                RunStatus::Pending => counts.pending += 1,
                RunStatus::Processing => counts.processing += 1,
                RunStatus::Completed => counts.completed += 1,
                RunStatus::Failed => {
                    counts.failed += 1;
                    if task.is_cancelled() {
                        counts.cancelled += 1;
                    }
                }
            }
        }
        counts
    }

    pub fn with_queued(mut self, queued: usize) -> Self {
        self.queued = queued;
        self
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, TaskConfig, TaskId, TaskKind};
    use chrono::Utc;
    use ulid::Ulid;

    fn task(status: RunStatus) -> Task {
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

    #[test]
    fn tally_by_status() {
        let mut cancelled = task(RunStatus::Pending);
        cancelled.cancel(Utc::now()).unwrap();
        let tasks = vec![
            task(RunStatus::Pending),
            task(RunStatus::Completed),
            task(RunStatus::Completed),
            task(RunStatus::Failed),
            cancelled,
        ];

        let counts = TaskCounts::tally(&tasks).with_queued(1);

        assert_eq!(counts.pending, 1);
        assert_eq!(counts.completed, 2);
        assert_eq!(counts.failed, 2);
        assert_eq!(counts.cancelled, 1);
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.total(), 5);
    }
}
