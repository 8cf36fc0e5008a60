//! Board registry: the board list and the current-board pointer

mod columns;

pub use columns::ColumnUpdate;

use crate::error::{BoardError, Result};
use crate::namespace::{Namespace, BOARDS_KEY, CURRENT_BOARD_KEY};
use crate::persistence::TaskPersistence;
use crate::types::{Board, BoardId, Column};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Name of the board created when none is stored
pub const DEFAULT_BOARD_NAME: &str = "My Board";
const DEFAULT_BOARD_DESCRIPTION: &str = "Default board";

/// Partial update for a board; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct BoardUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub columns: Option<Vec<Column>>,
}

impl BoardUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }
}

/// Owns the list of boards and which one is current
///
/// Every mutation persists the full board list.
#[derive(Debug)]
pub struct BoardRegistry {
    persistence: Arc<TaskPersistence>,
    boards: Vec<Board>,
    current: Option<BoardId>,
}

impl BoardRegistry {
    /// An empty registry; nothing is read from storage
    pub fn new(persistence: Arc<TaskPersistence>) -> Self {
        Self {
            persistence,
            boards: Vec::new(),
            current: None,
        }
    }

    /// Read the board list and the saved current-board pointer
    ///
    /// When no board list is stored, a default board is created and
    /// persisted. A saved pointer naming a board that no longer exists falls
    /// back to the first board.
    pub async fn load(persistence: Arc<TaskPersistence>) -> Result<Self> {
        let mut registry = Self::new(persistence);

        match registry.persistence.load_list::<Board>(BOARDS_KEY).await? {
            Some(boards) if !boards.is_empty() => {
                registry.boards = boards;
                let saved = registry
                    .persistence
                    .load_value(CURRENT_BOARD_KEY)
                    .await?
                    .map(BoardId::from_string);
                registry.current = match saved {
                    Some(id) if registry.get(&id).is_some() => Some(id),
                    _ => registry.boards.first().map(|b| b.id.clone()),
                };
            }
            _ => {
                let board = registry
                    .create_board(DEFAULT_BOARD_NAME, DEFAULT_BOARD_DESCRIPTION, None);
                info!(board_id = %board.id, "created default board");
                registry.current = Some(board.id.clone());
                registry.boards.push(board);
                registry.save_boards().await?;
                registry.save_current().await?;
            }
        }

        debug!(count = registry.boards.len(), "loaded boards");
        Ok(registry)
    }

    /// Build a board with a fresh id; the default columns are used when
    /// `columns` is `None`. Does not persist.
    pub fn create_board(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        columns: Option<Vec<Column>>,
    ) -> Board {
        let board = Board::new(name).with_description(description);
        match columns {
            Some(columns) => board.with_columns(columns),
            None => board,
        }
    }

    /// Append a board and persist the list
    pub async fn add_board(&mut self, board: Board) -> Result<&Board> {
        if self.get(&board.id).is_some() {
            return Err(BoardError::invalid_value(
                "id",
                format!("board {} already exists", board.id),
            ));
        }
        if board.name.trim().is_empty() {
            return Err(BoardError::invalid_value("name", "board name cannot be empty"));
        }
        info!(board_id = %board.id, name = %board.name, "added board");
        self.boards.push(board);
        self.save_boards().await?;
        Ok(&self.boards[self.boards.len() - 1])
    }

    /// Apply a partial update and refresh `updated_at`
    pub async fn update_board(&mut self, id: &BoardId, update: BoardUpdate) -> Result<&Board> {
        let index = self.index_of(id)?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(BoardError::invalid_value("name", "board name cannot be empty"));
            }
        }

        let board = &mut self.boards[index];
        if let Some(name) = update.name {
            board.name = name;
        }
        if let Some(description) = update.description {
            board.description = description;
        }
        if let Some(columns) = update.columns {
            board.columns = columns;
            board.renumber_columns();
        }
        board.updated_at = Utc::now();

        self.save_boards().await?;
        Ok(&self.boards[index])
    }

    /// Remove a board, its task namespace and that namespace's blobs
    ///
    /// When the deleted board was current, the pointer moves to the first
    /// remaining board.
    pub async fn delete_board(&mut self, id: &BoardId) -> Result<Board> {
        let index = self.index_of(id)?;
        let board = self.boards.remove(index);
        self.save_boards().await?;
        self.persistence
            .delete_namespace(&Namespace::for_board(id))
            .await?;

        if self.current.as_ref() == Some(id) {
            self.current = self.boards.first().map(|b| b.id.clone());
            self.save_current().await?;
        }

        info!(board_id = %id, "deleted board");
        Ok(board)
    }

    pub fn get(&self, id: &BoardId) -> Option<&Board> {
        self.boards.iter().find(|b| &b.id == id)
    }

    /// Boards in list order
    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Boards sorted by `updated_at`, most recent first
    pub fn boards_by_recent(&self) -> Vec<&Board> {
        let mut boards: Vec<&Board> = self.boards.iter().collect();
        boards.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Select the current board and persist the pointer
    pub async fn set_current_board(&mut self, id: &BoardId) -> Result<()> {
        self.index_of(id)?;
        self.current = Some(id.clone());
        self.save_current().await
    }

    /// The current board; the first board when no pointer is set
    pub fn current_board(&self) -> Option<&Board> {
        self.current
            .as_ref()
            .and_then(|id| self.get(id))
            .or_else(|| self.boards.first())
    }

    /// Namespace holding the current board's tasks
    pub fn current_namespace(&self) -> Namespace {
        Namespace::for_optional_board(self.current_board().map(|b| &b.id))
    }

    /// Replace the whole board list, discarding every existing namespace
    pub(crate) async fn replace_boards(&mut self, boards: Vec<Board>) -> Result<()> {
        for board in &self.boards {
            self.persistence
                .delete_namespace(&Namespace::for_board(&board.id))
                .await?;
        }
        self.boards = boards;
        self.current = self.boards.first().map(|b| b.id.clone());
        self.save_boards().await?;
        self.save_current().await
    }

    fn index_of(&self, id: &BoardId) -> Result<usize> {
        self.boards
            .iter()
            .position(|b| &b.id == id)
            .ok_or_else(|| BoardError::BoardNotFound { id: id.to_string() })
    }

    async fn save_boards(&self) -> Result<()> {
        self.persistence.save_list(BOARDS_KEY, &self.boards).await
    }

    async fn save_current(&self) -> Result<()> {
        match &self.current {
            Some(id) => {
                self.persistence
                    .save_value(CURRENT_BOARD_KEY, id.as_str())
                    .await
            }
            None => self.persistence.remove_value(CURRENT_BOARD_KEY).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Color, Task};
    use taskboard_store::{MemoryBlobStore, MemoryScalarStore};

    fn persistence() -> Arc<TaskPersistence> {
        Arc::new(TaskPersistence::new(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryScalarStore::new()),
        ))
    }

    #[tokio::test]
    async fn test_load_creates_default_board() {
        let persistence = persistence();
        let registry = BoardRegistry::load(persistence.clone()).await.unwrap();
        assert_eq!(registry.len(), 1);
        let board = registry.current_board().unwrap();
        assert_eq!(board.name, DEFAULT_BOARD_NAME);
        assert_eq!(board.description, "Default board");

        // The default is persisted, so a second load finds the same board
        let again = BoardRegistry::load(persistence).await.unwrap();
        assert_eq!(again.boards(), registry.boards());
        assert_eq!(again.current_board().unwrap().id, board.id);
    }

    #[tokio::test]
    async fn test_current_pointer_restored() {
        let persistence = persistence();
        let mut registry = BoardRegistry::load(persistence.clone()).await.unwrap();
        let board = registry.create_board("Work", "", None);
        let id = board.id.clone();
        registry.add_board(board).await.unwrap();
        registry.set_current_board(&id).await.unwrap();

        let reloaded = BoardRegistry::load(persistence).await.unwrap();
        assert_eq!(reloaded.current_board().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_stale_pointer_falls_back_to_first() {
        let persistence = persistence();
        let registry = BoardRegistry::load(persistence.clone()).await.unwrap();
        let first = registry.boards()[0].id.clone();
        persistence
            .save_value(CURRENT_BOARD_KEY, "gone")
            .await
            .unwrap();

        let reloaded = BoardRegistry::load(persistence).await.unwrap();
        assert_eq!(reloaded.current_board().unwrap().id, first);
    }

    #[tokio::test]
    async fn test_set_current_unknown_board() {
        let mut registry = BoardRegistry::load(persistence()).await.unwrap();
        let err = registry
            .set_current_board(&BoardId::from_string("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::BoardNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_board_refreshes_updated_at() {
        let mut registry = BoardRegistry::load(persistence()).await.unwrap();
        let id = registry.boards()[0].id.clone();
        let before = registry.boards()[0].updated_at;

        let board = registry
            .update_board(&id, BoardUpdate::new().with_name("Renamed"))
            .await
            .unwrap();
        assert_eq!(board.name, "Renamed");
        assert!(board.updated_at >= before);

        let err = registry
            .update_board(&id, BoardUpdate::new().with_name("  "))
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_boards_by_recent() {
        let mut registry = BoardRegistry::load(persistence()).await.unwrap();
        let old_id = registry.boards()[0].id.clone();
        let board = registry.create_board("Newer", "", None);
        registry.add_board(board).await.unwrap();
        registry
            .update_board(&old_id, BoardUpdate::new().with_description("touched"))
            .await
            .unwrap();

        let recent = registry.boards_by_recent();
        assert_eq!(recent[0].id, old_id);
        // List order is unaffected
        assert_eq!(registry.boards()[0].id, old_id);
        assert_eq!(registry.boards()[1].name, "Newer");
    }

    #[tokio::test]
    async fn test_delete_board_removes_namespace() {
        let persistence = persistence();
        let mut registry = BoardRegistry::load(persistence.clone()).await.unwrap();
        let board = registry.create_board("Temp", "", None);
        let id = board.id.clone();
        registry.add_board(board).await.unwrap();
        registry.set_current_board(&id).await.unwrap();

        let ns = Namespace::for_board(&id);
        persistence
            .save(&ns, &[Task::new("t", "todo")])
            .await
            .unwrap();

        registry.delete_board(&id).await.unwrap();
        assert!(registry.get(&id).is_none());
        assert!(persistence.load(&ns).await.unwrap().is_empty());
        assert_ne!(registry.current_board().unwrap().id, id);
    }

    #[tokio::test]
    async fn test_create_board_with_custom_columns() {
        let registry = BoardRegistry::new(persistence());
        let board = registry.create_board(
            "Custom",
            "desc",
            Some(vec![
                Column::new("backlog", "Backlog", Color::Gray, 3),
                Column::new("shipped", "Shipped", Color::Green, 7),
            ]),
        );
        assert_eq!(board.columns.len(), 2);
        assert_eq!(board.columns[1].order, 1);
        assert!(registry.is_empty());
    }
}
