//! TaskPersistence - composes the blob and scalar stores into task-shaped I/O
//!
//! Tasks are split on write: each task's attachment list goes to the blob
//! store under the task id, and the rest of the task goes into one JSON list
//! per namespace in the scalar store, with a `has_attachments` marker in
//! place of the attachments. Reads reverse the split.
//!
//! The facade holds no task state. It only holds one write lock per
//! namespace so that a save's blob-then-scalar sequence never interleaves
//! with another save to the same namespace.

use crate::error::{BoardError, Result};
use crate::namespace::Namespace;
use crate::types::{Attachment, Task, TaskId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use taskboard_store::{BlobStore, ScalarStore};
use tracing::{debug, warn};

/// Scalar-side shape of a task
#[derive(Debug, Serialize, Deserialize)]
struct TaskRecord {
    #[serde(flatten)]
    task: Task,
    #[serde(default)]
    has_attachments: bool,
}

impl TaskRecord {
    fn from_task(task: &Task) -> Self {
        let mut light = task.clone();
        light.attachments.clear();
        Self {
            task: light,
            has_attachments: !task.attachments.is_empty(),
        }
    }
}

/// Task-shaped access to a blob store and a scalar store
pub struct TaskPersistence {
    blobs: Arc<dyn BlobStore>,
    scalars: Arc<dyn ScalarStore>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TaskPersistence {
    pub fn new(blobs: Arc<dyn BlobStore>, scalars: Arc<dyn ScalarStore>) -> Self {
        Self {
            blobs,
            scalars,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn namespace_lock(&self, namespace: &Namespace) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(namespace.key().to_string()).or_default())
    }

    // =========================================================================
    // Task lists
    // =========================================================================

    /// Persist the full task list of `namespace`
    ///
    /// Blob writes happen first, then the scalar list. There is no atomicity
    /// between the halves; a failure part way leaves earlier writes in place.
    pub async fn save(&self, namespace: &Namespace, tasks: &[Task]) -> Result<()> {
        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        let mut records = Vec::with_capacity(tasks.len());
        for task in tasks {
            if task.attachments.is_empty() {
                self.blobs
                    .delete(task.id.as_str())
                    .await
                    .map_err(|e| BoardError::write_failed(task.id.as_str(), e))?;
            } else {
                let bytes = serde_json::to_vec(&task.attachments)?;
                self.blobs
                    .put(task.id.as_str(), &bytes)
                    .await
                    .map_err(|e| BoardError::write_failed(task.id.as_str(), e))?;
            }
            records.push(TaskRecord::from_task(task));
        }

        let json = serde_json::to_string(&records)?;
        self.scalars
            .set(namespace.key(), &json)
            .await
            .map_err(|e| BoardError::write_failed(namespace.key(), e))?;

        debug!(namespace = %namespace, count = tasks.len(), "saved tasks");
        Ok(())
    }

    /// Load the task list of `namespace` with attachments merged back in
    ///
    /// A missing entry is an empty list. A missing or unreadable blob leaves
    /// that task with no attachments.
    pub async fn load(&self, namespace: &Namespace) -> Result<Vec<Task>> {
        let Some(records) = self.read_records(namespace).await? else {
            return Ok(Vec::new());
        };

        let mut tasks = Vec::with_capacity(records.len());
        for record in records {
            let mut task = record.task;
            task.migrate_legacy_tag();
            task.attachments = if record.has_attachments {
                self.load_attachments(&task.id).await
            } else {
                Vec::new()
            };
            tasks.push(task);
        }

        debug!(namespace = %namespace, count = tasks.len(), "loaded tasks");
        Ok(tasks)
    }

    async fn read_records(&self, namespace: &Namespace) -> Result<Option<Vec<TaskRecord>>> {
        let json = self
            .scalars
            .get(namespace.key())
            .await
            .map_err(|e| BoardError::read_failed(namespace.key(), e))?;
        match json {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| BoardError::read_failed(namespace.key(), e)),
        }
    }

    async fn load_attachments(&self, task_id: &TaskId) -> Vec<Attachment> {
        match self.blobs.get(task_id.as_str()).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(attachments) => attachments,
                Err(e) => {
                    warn!(task_id = %task_id, error = %e, "unreadable attachment blob");
                    Vec::new()
                }
            },
            Ok(None) => {
                warn!(task_id = %task_id, "attachment blob missing");
                Vec::new()
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "failed to read attachment blob");
                Vec::new()
            }
        }
    }

    /// Remove a task's attachment blob. Idempotent.
    pub async fn delete_attachments(&self, task_id: &TaskId) -> Result<()> {
        self.blobs
            .delete(task_id.as_str())
            .await
            .map_err(|e| BoardError::write_failed(task_id.as_str(), e))?;
        Ok(())
    }

    /// Remove a namespace's task list and the blobs of tasks it marks as
    /// carrying attachments
    pub async fn delete_namespace(&self, namespace: &Namespace) -> Result<()> {
        let lock = self.namespace_lock(namespace);
        let _guard = lock.lock().await;

        match self.read_records(namespace).await {
            Ok(Some(records)) => {
                for record in records.iter().filter(|r| r.has_attachments) {
                    self.delete_attachments(&record.task.id).await?;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(namespace = %namespace, error = %e, "removing unreadable namespace"),
        }

        self.scalars
            .remove(namespace.key())
            .await
            .map_err(|e| BoardError::write_failed(namespace.key(), e))?;
        debug!(namespace = %namespace, "deleted namespace");
        Ok(())
    }

    // =========================================================================
    // Whole-store attachment access
    // =========================================================================

    /// Every stored attachment list keyed by task id
    pub async fn all_attachments(&self) -> Result<BTreeMap<TaskId, Vec<Attachment>>> {
        let keys = self
            .blobs
            .keys()
            .await
            .map_err(|e| BoardError::read_failed("attachments", e))?;

        let mut all = BTreeMap::new();
        for key in keys {
            let id = TaskId::from_string(key);
            let attachments = self.load_attachments(&id).await;
            if !attachments.is_empty() {
                all.insert(id, attachments);
            }
        }
        Ok(all)
    }

    /// Write attachment lists keyed by task id
    pub async fn import_attachments(
        &self,
        attachments: &BTreeMap<TaskId, Vec<Attachment>>,
    ) -> Result<()> {
        for (task_id, list) in attachments {
            let bytes = serde_json::to_vec(list)?;
            self.blobs
                .put(task_id.as_str(), &bytes)
                .await
                .map_err(|e| BoardError::write_failed(task_id.as_str(), e))?;
        }
        Ok(())
    }

    /// Remove every attachment blob
    pub async fn purge_attachments(&self) -> Result<()> {
        let keys = self
            .blobs
            .keys()
            .await
            .map_err(|e| BoardError::read_failed("attachments", e))?;
        for key in keys {
            self.blobs
                .delete(&key)
                .await
                .map_err(|e| BoardError::write_failed(key.as_str(), e))?;
        }
        Ok(())
    }

    // =========================================================================
    // Plain scalar documents
    // =========================================================================

    /// Read a JSON list; `None` when nothing is stored under `key`
    pub async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Option<Vec<T>>> {
        match self.load_value(key).await? {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| BoardError::read_failed(key, e)),
        }
    }

    /// Write a JSON list under `key`
    pub async fn save_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.save_value(key, &json).await
    }

    pub async fn load_value(&self, key: &str) -> Result<Option<String>> {
        self.scalars
            .get(key)
            .await
            .map_err(|e| BoardError::read_failed(key, e))
    }

    pub async fn save_value(&self, key: &str, value: &str) -> Result<()> {
        self.scalars
            .set(key, value)
            .await
            .map_err(|e| BoardError::write_failed(key, e))
    }

    pub async fn remove_value(&self, key: &str) -> Result<()> {
        self.scalars
            .remove(key)
            .await
            .map_err(|e| BoardError::write_failed(key, e))?;
        Ok(())
    }
}

impl std::fmt::Debug for TaskPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPersistence").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttachmentKind, BoardId};
    use taskboard_store::{MemoryBlobStore, MemoryScalarStore};

    struct Fixture {
        blobs: Arc<MemoryBlobStore>,
        scalars: Arc<MemoryScalarStore>,
        persistence: TaskPersistence,
    }

    fn setup() -> Fixture {
        let blobs = Arc::new(MemoryBlobStore::new());
        let scalars = Arc::new(MemoryScalarStore::new());
        let persistence = TaskPersistence::new(blobs.clone(), scalars.clone());
        Fixture {
            blobs,
            scalars,
            persistence,
        }
    }

    fn namespace() -> Namespace {
        Namespace::for_board(&BoardId::from_string("board-1"))
    }

    #[tokio::test]
    async fn test_load_missing_namespace_is_empty() {
        let fx = setup();
        assert!(fx.persistence.load(&namespace()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_splits_attachments_from_scalars() {
        let fx = setup();
        let task = Task::new("with file", "todo").with_attachments(vec![Attachment::new(
            "a.bin",
            AttachmentKind::File,
            vec![1, 2, 3],
        )]);
        fx.persistence
            .save(&namespace(), std::slice::from_ref(&task))
            .await
            .unwrap();

        let raw = fx.scalars.get("tasks:board-1").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["has_attachments"], true);
        assert!(value[0].get("attachments").is_none());
        assert!(fx.blobs.get(task.id.as_str()).await.unwrap().is_some());

        let loaded = fx.persistence.load(&namespace()).await.unwrap();
        assert_eq!(loaded, vec![task]);
    }

    #[tokio::test]
    async fn test_empty_attachment_list_removes_stale_blob() {
        let fx = setup();
        let mut task = Task::new("t", "todo").with_attachments(vec![Attachment::new(
            "a",
            AttachmentKind::Image,
            vec![9],
        )]);
        fx.persistence
            .save(&namespace(), std::slice::from_ref(&task))
            .await
            .unwrap();

        task.attachments.clear();
        fx.persistence
            .save(&namespace(), std::slice::from_ref(&task))
            .await
            .unwrap();
        assert!(fx.blobs.get(task.id.as_str()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_blob_degrades_to_empty() {
        let fx = setup();
        let task = Task::new("t", "todo").with_attachments(vec![Attachment::new(
            "a",
            AttachmentKind::File,
            vec![1],
        )]);
        fx.persistence
            .save(&namespace(), std::slice::from_ref(&task))
            .await
            .unwrap();
        fx.blobs.delete(task.id.as_str()).await.unwrap();

        let loaded = fx.persistence.load(&namespace()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].attachments.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_scalar_is_read_failure() {
        let fx = setup();
        fx.scalars.set("tasks:board-1", "{not json").await.unwrap();
        let err = fx.persistence.load(&namespace()).await.unwrap_err();
        assert!(matches!(err, BoardError::StorageReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_quota_surfaces_as_write_failure() {
        let blobs = Arc::new(MemoryBlobStore::new());
        let scalars = Arc::new(MemoryScalarStore::new().with_max_value_bytes(16));
        let persistence = TaskPersistence::new(blobs, scalars);

        let err = persistence
            .save(&namespace(), &[Task::new("too large for the store", "todo")])
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::StorageWriteFailed { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_delete_namespace_purges_blobs() {
        let fx = setup();
        let task = Task::new("t", "todo").with_attachments(vec![Attachment::new(
            "a",
            AttachmentKind::File,
            vec![1],
        )]);
        fx.persistence
            .save(&namespace(), std::slice::from_ref(&task))
            .await
            .unwrap();

        fx.persistence.delete_namespace(&namespace()).await.unwrap();
        assert!(fx.scalars.get("tasks:board-1").await.unwrap().is_none());
        assert!(fx.blobs.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lists_and_values() {
        let fx = setup();
        assert_eq!(fx.persistence.load_list::<String>("templates").await.unwrap(), None);

        fx.persistence
            .save_list("templates", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(
            fx.persistence.load_list::<String>("templates").await.unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );

        fx.persistence.save_value("current_board", "b1").await.unwrap();
        assert_eq!(
            fx.persistence.load_value("current_board").await.unwrap().as_deref(),
            Some("b1")
        );
        fx.persistence.remove_value("current_board").await.unwrap();
        assert_eq!(fx.persistence.load_value("current_board").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_all_and_import_attachments() {
        let fx = setup();
        let mut map = BTreeMap::new();
        map.insert(
            TaskId::from_string("t1"),
            vec![Attachment::new("a", AttachmentKind::File, vec![7])],
        );
        fx.persistence.import_attachments(&map).await.unwrap();
        assert_eq!(fx.persistence.all_attachments().await.unwrap(), map);

        fx.persistence.purge_attachments().await.unwrap();
        assert!(fx.persistence.all_attachments().await.unwrap().is_empty());
    }
}
