use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::executor::PipelineExecutor;
use crate::domain::{RunStatus, TaskId};
use crate::impls::SubmissionQueue;
use crate::ports::TaskStore;

/// Worker group handle.
/// - `request_shutdown()` で新しい ID を取りに行かなくなる
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(
        n: usize,
        queue: Arc<SubmissionQueue>,
        executor: Arc<PipelineExecutor>,
        store: Arc<dyn TaskStore>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let ex = Arc::clone(&executor);
            let st = Arc::clone(&store);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, ex, st, &mut rx).await;
            });
            joins.push(join);
        }
        info!(workers = n, "worker group started");

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// 実行中のステップは止めない。次の ID を取りに行かなくなるだけ。
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
        info!("worker group stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<SubmissionQueue>,
    executor: Arc<PipelineExecutor>,
    store: Arc<dyn TaskStore>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // pop は待つので shutdown と競合させる
        let task_id = tokio::select! {
            changed = shutdown_rx.changed() => {
                // sender が drop されたら止める
                if changed.is_err() {
                    break;
                }
                continue;
            }
            task_id = queue.pop() => task_id,
        };

        execute(worker_id, task_id, &executor, store.as_ref()).await;
    }
    debug!(worker_id, "worker exited");
}

/// 正本から読み直して、まだ pending のものだけ実行する
pub(crate) async fn execute(worker_id: usize, task_id: TaskId, executor: &PipelineExecutor, store: &dyn TaskStore) {
    let mut task = match store.get(task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            warn!(worker_id, %task_id, "queued task not found in store");
            return;
        }
        Err(e) => {
            warn!(worker_id, %task_id, error = %e, "failed to load queued task");
            return;
        }
    };

    if task.status != RunStatus::Pending {
        debug!(worker_id, %task_id, status = ?task.status, "skipping task that is no longer pending");
        return;
    }

    if let Err(e) = executor.run(&mut task).await {
        warn!(worker_id, %task_id, error = %e, "task run aborted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OwnerId, Task, TaskConfig, TaskKind};
    use crate::impls::{BroadcastEventChannel, InMemoryTaskStore};
    use crate::steps::{Services, StepLibrary};
    use crate::testing;
    use chrono::Utc;
    use std::time::Duration;
    use ulid::Ulid;

    struct Fixture {
        queue: Arc<SubmissionQueue>,
        executor: Arc<PipelineExecutor>,
        store: Arc<dyn TaskStore>,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let executor = Arc::new(PipelineExecutor::new(
            Arc::new(StepLibrary::standard(&Services::heuristic())),
            Arc::clone(&store),
            Arc::new(BroadcastEventChannel::default()),
            testing::clock(),
        ));
        Fixture {
            queue: Arc::new(SubmissionQueue::new()),
            executor,
            store,
        }
    }

    async fn submit(f: &Fixture) -> Task {
        let names = f.executor.library().get(TaskKind::ScriptToPublish).unwrap().step_names();
        let mut task = Task::new(
            TaskId::from_ulid(Ulid::new()),
            TaskKind::ScriptToPublish,
            OwnerId::new("o"),
            TaskConfig::script("t", "mystery", "a short script about a secret"),
            names,
            Utc::now(),
        );
        task.version = f.store.upsert(&task).await.unwrap();
        task
    }

    async fn wait_for(store: &dyn TaskStore, id: TaskId, status: RunStatus) -> Task {
        for _ in 0..200 {
            let task = store.get(id).await.unwrap().unwrap();
            if task.status == status {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("task {id} never reached {status:?}");
    }

    #[tokio::test]
    async fn workers_drain_the_queue() {
        let f = fixture();
        let group = WorkerGroup::spawn(2, f.queue.clone(), f.executor.clone(), f.store.clone());

        let a = submit(&f).await;
        let b = submit(&f).await;
        f.queue.push(a.id).await;
        f.queue.push(b.id).await;

        wait_for(f.store.as_ref(), a.id, RunStatus::Completed).await;
        wait_for(f.store.as_ref(), b.id, RunStatus::Completed).await;

        group.shutdown_and_join().await;
    }

    #[tokio::test]
    async fn cancelled_task_is_skipped() {
        let f = fixture();
        let mut task = submit(&f).await;
        f.executor.cancel(&mut task).await.unwrap();

        execute(0, task.id, &f.executor, f.store.as_ref()).await;

        let stored = f.store.get(task.id).await.unwrap().unwrap();
        assert!(stored.is_cancelled());
        assert_eq!(stored.attempts, 0);
    }

    #[tokio::test]
    async fn shutdown_stops_idle_workers() {
        let f = fixture();
        let group = WorkerGroup::spawn(3, f.queue.clone(), f.executor.clone(), f.store.clone());
        assert_eq!(group.len(), 3);

        tokio::time::timeout(Duration::from_secs(1), group.shutdown_and_join())
            .await
            .unwrap();
    }
}
