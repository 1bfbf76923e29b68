//! JsonFileTaskStore - 1 タスク 1 JSON ファイルの TaskStore
//!
//! `<dir>/<task_id>.json` に pretty JSON で保存する。
//! 手で中身を確認しやすく、DB なしで再起動をまたげる。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::domain::{Task, TaskId};
use crate::ports::{StoreError, TaskFilter, TaskStore};

pub struct JsonFileTaskStore {
    dir: PathBuf,
    /// version チェック〜書き込みを直列化する（同一プロセス内）
    write_lock: Mutex<()>,
}

impl JsonFileTaskStore {
    /// ディレクトリが無ければ作成する
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await.map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn task_file(&self, id: TaskId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, path: &Path) -> Result<Option<Task>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

#[async_trait]
impl TaskStore for JsonFileTaskStore {
    async fn upsert(&self, task: &Task) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.task_file(task.id);

        let found = self.read(&path).await?.map_or(0, |stored| stored.version);
        if found != task.version {
            return Err(StoreError::VersionConflict {
                task_id: task.id,
                expected: task.version,
                found,
            });
        }

        let mut record = task.clone();
        record.version = found + 1;
        let json = serde_json::to_string_pretty(&record)?;

        // 途中で落ちても壊れたファイルを残さないよう rename で差し替える
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|source| StoreError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(record.version)
    }

    async fn get(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        self.read(&self.task_file(id)).await
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.dir.display().to_string(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;

        let mut tasks = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match self.read(&path).await {
                Ok(Some(task)) if filter.matches(&task) => tasks.push(task),
                Ok(_) => {}
                Err(StoreError::Serde(e)) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable task record");
                }
                Err(e) => return Err(e),
            }
        }

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }
}
