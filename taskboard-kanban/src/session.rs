//! BoardSession - the explicit context tying the engine together
//!
//! A session owns the storage facade, the board registry, the active board's
//! task collection, the template library and the recurrence rules. Board
//! switches rebuild the collection from the new board's namespace, so tasks
//! never leak between boards.

use crate::board::{BoardRegistry, BoardUpdate, ColumnUpdate};
use crate::config::{Backend, BoardConfig};
use crate::error::{BoardError, Result};
use crate::namespace::Namespace;
use crate::persistence::TaskPersistence;
use crate::recurring::RecurringTasks;
use crate::share::SharePayload;
use crate::task::{NewTask, TaskCollection, TaskFilter};
use crate::template::TemplateLibrary;
use crate::transfer::{self, ExportDocument, ImportMode, ImportSummary};
use crate::types::{Board, BoardId, Color, Column, ColumnId, Task, TaskId, TemplateId};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use taskboard_store::{
    BlobStore, FileBlobStore, FileScalarStore, MemoryBlobStore, MemoryScalarStore,
    ScalarStore,
};
use tracing::info;

#[derive(Debug)]
pub struct BoardSession {
    persistence: Arc<TaskPersistence>,
    registry: BoardRegistry,
    tasks: TaskCollection,
    templates: TemplateLibrary,
    recurring: RecurringTasks,
    default_filter: TaskFilter,
}

impl BoardSession {
    /// Open the stores `config` describes and load everything
    ///
    /// A store that cannot be opened is fatal and reported as
    /// [`BoardError::StorageUnavailable`].
    pub async fn open(config: &BoardConfig) -> Result<Self> {
        let retention = config.retention()?;
        let (blobs, scalars): (Arc<dyn BlobStore>, Arc<dyn ScalarStore>) = match config.backend {
            Backend::Memory => {
                let mut scalars = MemoryScalarStore::new().with_retention(retention);
                if let Some(limit) = config.max_scalar_bytes {
                    scalars = scalars.with_max_value_bytes(limit);
                }
                let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
                let scalars: Arc<dyn ScalarStore> = Arc::new(scalars);
                (blobs, scalars)
            }
            Backend::File => {
                let blobs = FileBlobStore::open(config.blob_dir())
                    .await
                    .map_err(BoardError::StorageUnavailable)?;
                let mut scalars = FileScalarStore::open(config.scalar_dir())
                    .await
                    .map_err(BoardError::StorageUnavailable)?
                    .with_retention(retention);
                if let Some(limit) = config.max_scalar_bytes {
                    scalars = scalars.with_max_value_bytes(limit);
                }
                let blobs: Arc<dyn BlobStore> = Arc::new(blobs);
                let scalars: Arc<dyn ScalarStore> = Arc::new(scalars);
                (blobs, scalars)
            }
        };

        let default_filter = TaskFilter::new()
            .with_sort(config.default_sort)
            .with_date_range(config.default_date_range);
        let session = Self::build(blobs, scalars, default_filter).await?;
        info!(backend = ?config.backend, boards = session.registry.len(), "opened board session");
        Ok(session)
    }

    /// A session over fresh in-memory stores
    pub async fn in_memory() -> Result<Self> {
        Self::with_stores(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryScalarStore::new()),
        )
        .await
    }

    /// A session over caller-provided stores
    pub async fn with_stores(
        blobs: Arc<dyn BlobStore>,
        scalars: Arc<dyn ScalarStore>,
    ) -> Result<Self> {
        Self::build(blobs, scalars, TaskFilter::default()).await
    }

    async fn build(
        blobs: Arc<dyn BlobStore>,
        scalars: Arc<dyn ScalarStore>,
        default_filter: TaskFilter,
    ) -> Result<Self> {
        let persistence = Arc::new(TaskPersistence::new(blobs, scalars));
        let registry = BoardRegistry::load(persistence.clone()).await?;
        let tasks = Self::collection_for(&persistence, &registry, &default_filter).await;
        let templates = TemplateLibrary::load(persistence.clone()).await;
        let recurring = RecurringTasks::load(persistence.clone()).await;
        Ok(Self {
            persistence,
            registry,
            tasks,
            templates,
            recurring,
            default_filter,
        })
    }

    async fn collection_for(
        persistence: &Arc<TaskPersistence>,
        registry: &BoardRegistry,
        filter: &TaskFilter,
    ) -> TaskCollection {
        let collection = match registry.current_board() {
            Some(board) => TaskCollection::for_board(persistence.clone(), board).await,
            None => TaskCollection::load(persistence.clone(), registry.current_namespace()).await,
        };
        collection.with_filter(filter.clone())
    }

    async fn reload_tasks(&mut self) {
        self.tasks =
            Self::collection_for(&self.persistence, &self.registry, &self.default_filter).await;
    }

    fn refresh_columns(&mut self) {
        if let Some(board) = self.registry.current_board() {
            let columns = board.columns_in_order().iter().map(|c| c.id.clone()).collect();
            self.tasks.set_columns(columns);
        }
    }

    fn is_current(&self, board_id: &BoardId) -> bool {
        self.registry.current_board().map(|b| &b.id) == Some(board_id)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn persistence(&self) -> &Arc<TaskPersistence> {
        &self.persistence
    }

    pub fn registry(&self) -> &BoardRegistry {
        &self.registry
    }

    pub fn boards(&self) -> &[Board] {
        self.registry.boards()
    }

    pub fn current_board(&self) -> Option<&Board> {
        self.registry.current_board()
    }

    /// The active board's tasks
    pub fn tasks(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskCollection {
        &mut self.tasks
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateLibrary {
        &mut self.templates
    }

    pub fn recurring(&self) -> &RecurringTasks {
        &self.recurring
    }

    pub fn recurring_mut(&mut self) -> &mut RecurringTasks {
        &mut self.recurring
    }

    // =========================================================================
    // Boards
    // =========================================================================

    /// Make `id` current and load its tasks
    ///
    /// The view filter resets to the configured defaults.
    pub async fn switch_board(&mut self, id: &BoardId) -> Result<()> {
        self.registry.set_current_board(id).await?;
        self.reload_tasks().await;
        info!(board_id = %id, tasks = self.tasks.len(), "switched board");
        Ok(())
    }

    /// Add a board; the current board does not change
    pub async fn create_board(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        columns: Option<Vec<Column>>,
    ) -> Result<BoardId> {
        let board = self.registry.create_board(name, description, columns);
        let id = board.id.clone();
        self.registry.add_board(board).await?;
        Ok(id)
    }

    pub async fn update_board(&mut self, id: &BoardId, update: BoardUpdate) -> Result<()> {
        self.registry.update_board(id, update).await?;
        if self.is_current(id) {
            self.refresh_columns();
        }
        Ok(())
    }

    /// Delete a board with its tasks and attachments
    ///
    /// The last remaining board cannot be deleted. When the current board is
    /// deleted the session switches to the first remaining one.
    pub async fn delete_board(&mut self, id: &BoardId) -> Result<Board> {
        if self.registry.get(id).is_none() {
            return Err(BoardError::BoardNotFound { id: id.to_string() });
        }
        if self.registry.len() <= 1 {
            return Err(BoardError::invariant("cannot delete the last board"));
        }

        let was_current = self.is_current(id);
        let board = self.registry.delete_board(id).await?;
        if was_current {
            self.reload_tasks().await;
        }
        Ok(board)
    }

    pub async fn add_column(
        &mut self,
        board_id: &BoardId,
        name: impl Into<String>,
        color: Color,
    ) -> Result<Column> {
        let column = self.registry.add_column(board_id, name, color).await?;
        if self.is_current(board_id) {
            self.refresh_columns();
        }
        Ok(column)
    }

    pub async fn update_column(
        &mut self,
        board_id: &BoardId,
        column_id: &ColumnId,
        update: ColumnUpdate,
    ) -> Result<Column> {
        self.registry
            .update_column(board_id, column_id, update)
            .await
    }

    pub async fn delete_column(&mut self, board_id: &BoardId, column_id: &ColumnId) -> Result<()> {
        self.registry.delete_column(board_id, column_id).await?;
        if self.is_current(board_id) {
            self.refresh_columns();
        }
        Ok(())
    }

    pub async fn reorder_columns(
        &mut self,
        board_id: &BoardId,
        orders: &[(ColumnId, usize)],
    ) -> Result<()> {
        self.registry.reorder_columns(board_id, orders).await?;
        if self.is_current(board_id) {
            self.refresh_columns();
        }
        Ok(())
    }

    // =========================================================================
    // Templates and recurrence
    // =========================================================================

    /// Create a task on the current board from a template
    pub async fn apply_template(
        &mut self,
        template_id: &TemplateId,
        title: impl Into<String>,
        status: impl Into<ColumnId>,
        due_date: Option<NaiveDate>,
    ) -> Result<Task> {
        let new_task = self.templates.apply(template_id, title, status, due_date)?;
        self.add_task(new_task).await
    }

    /// Create and add a task on the current board
    pub async fn add_task(&mut self, new_task: NewTask) -> Result<Task> {
        let task = self.tasks.create(new_task)?;
        Ok(self.tasks.add(task).await?.clone())
    }

    /// Create the recurring tasks due at `now` on the current board
    pub async fn run_recurring(&mut self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.recurring
            .check_and_create_due(now, &mut self.tasks)
            .await
    }

    // =========================================================================
    // Export, import and sharing
    // =========================================================================

    pub async fn export(&self) -> Result<ExportDocument> {
        transfer::export(&self.registry, &self.persistence).await
    }

    /// Import a document and reload the current board's tasks
    pub async fn import(&mut self, document: ExportDocument, mode: ImportMode) -> Result<ImportSummary> {
        let summary =
            transfer::import(document, mode, &mut self.registry, &self.persistence).await?;
        self.reload_tasks().await;
        Ok(summary)
    }

    /// The current board as a share payload
    pub fn share_payload(&self) -> Result<SharePayload> {
        let board = self
            .registry
            .current_board()
            .ok_or_else(|| BoardError::invariant("no current board"))?;
        Ok(SharePayload::new(board, &self.tasks.share_projection()))
    }

    /// Add a shared board as a new board; returns its id
    ///
    /// Shared tasks get fresh ids so they cannot collide with attachment
    /// blobs of existing tasks.
    pub async fn import_shared(&mut self, encoded: &str) -> Result<BoardId> {
        let payload = SharePayload::decode(encoded)?;
        let board = payload.to_board();
        let id = board.id.clone();
        let tasks: Vec<Task> = payload
            .tasks
            .into_iter()
            .map(|t| t.with_id(TaskId::new()))
            .collect();

        self.registry.add_board(board).await?;
        self.persistence
            .save(&Namespace::for_board(&id), &tasks)
            .await?;
        info!(board_id = %id, tasks = tasks.len(), "imported shared board");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_session_has_default_board() {
        let session = BoardSession::in_memory().await.unwrap();
        assert_eq!(session.boards().len(), 1);
        let board = session.current_board().unwrap();
        assert_eq!(board.name, crate::board::DEFAULT_BOARD_NAME);
        assert_eq!(session.tasks().columns().len(), 3);
        assert!(session.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_added_column_accepts_tasks() {
        let mut session = BoardSession::in_memory().await.unwrap();
        let board_id = session.current_board().unwrap().id.clone();
        let column = session
            .add_column(&board_id, "Review", Color::Purple)
            .await
            .unwrap();
        let task = session
            .add_task(NewTask::new("check", column.id.clone()))
            .await
            .unwrap();
        assert_eq!(task.status, column.id);
    }

    #[tokio::test]
    async fn test_delete_unknown_board() {
        let mut session = BoardSession::in_memory().await.unwrap();
        let err = session
            .delete_board(&BoardId::from_string("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::BoardNotFound { .. }));
    }

    #[tokio::test]
    async fn test_share_round_trip_into_new_board() {
        let mut session = BoardSession::in_memory().await.unwrap();
        let original = session
            .add_task(NewTask::new("shared", "todo").with_image(vec![1, 2, 3]))
            .await
            .unwrap();
        let encoded = session.share_payload().unwrap().encode().unwrap();

        let id = session.import_shared(&encoded).await.unwrap();
        session.switch_board(&id).await.unwrap();
        let tasks = session.tasks().tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "shared");
        assert_ne!(tasks[0].id, original.id);
        assert!(tasks[0].image.is_none());
    }
}
