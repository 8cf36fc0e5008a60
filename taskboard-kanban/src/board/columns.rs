//! Column maintenance on a board's layout

use super::BoardRegistry;
use crate::error::{BoardError, Result};
use crate::types::{BoardId, Color, Column, ColumnId};
use chrono::Utc;
use tracing::debug;

/// Partial update for a column
#[derive(Debug, Clone, Default)]
pub struct ColumnUpdate {
    pub name: Option<String>,
    pub color: Option<Color>,
}

impl ColumnUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

impl BoardRegistry {
    /// Append a column with a generated id; `order` is the column count
    pub async fn add_column(
        &mut self,
        board_id: &BoardId,
        name: impl Into<String>,
        color: Color,
    ) -> Result<Column> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BoardError::invalid_value("name", "column name cannot be empty"));
        }
        let index = self.index_of(board_id)?;
        let board = &mut self.boards[index];
        let column = Column::new(ColumnId::new(), name, color, board.columns.len());
        board.columns.push(column.clone());
        board.updated_at = Utc::now();

        debug!(board_id = %board_id, column_id = %column.id, "added column");
        self.save_boards().await?;
        Ok(column)
    }

    pub async fn update_column(
        &mut self,
        board_id: &BoardId,
        column_id: &ColumnId,
        update: ColumnUpdate,
    ) -> Result<Column> {
        let index = self.index_of(board_id)?;
        let board = &mut self.boards[index];
        let column = board
            .columns
            .iter_mut()
            .find(|c| &c.id == column_id)
            .ok_or_else(|| BoardError::ColumnNotFound {
                id: column_id.to_string(),
            })?;

        if let Some(name) = update.name {
            column.name = name;
        }
        if let Some(color) = update.color {
            column.color = color;
        }
        let column = column.clone();
        board.updated_at = Utc::now();

        self.save_boards().await?;
        Ok(column)
    }

    /// Remove a column and renumber the rest 0..n-1
    ///
    /// Tasks whose status names the removed column are left as they are.
    pub async fn delete_column(&mut self, board_id: &BoardId, column_id: &ColumnId) -> Result<()> {
        let index = self.index_of(board_id)?;
        let board = &mut self.boards[index];
        let before = board.columns.len();
        board.columns.retain(|c| &c.id != column_id);
        if board.columns.len() == before {
            return Err(BoardError::ColumnNotFound {
                id: column_id.to_string(),
            });
        }
        board.renumber_columns();
        board.updated_at = Utc::now();

        debug!(board_id = %board_id, column_id = %column_id, "deleted column");
        self.save_boards().await
    }

    /// Assign orders from `(id, order)` pairs, sort by order, then renumber
    ///
    /// Unknown ids in `orders` are ignored; columns not named keep their
    /// current order value for the sort.
    pub async fn reorder_columns(
        &mut self,
        board_id: &BoardId,
        orders: &[(ColumnId, usize)],
    ) -> Result<()> {
        let index = self.index_of(board_id)?;
        let board = &mut self.boards[index];
        for (id, order) in orders {
            if let Some(column) = board.columns.iter_mut().find(|c| &c.id == id) {
                column.order = *order;
            }
        }
        board.columns.sort_by_key(|c| c.order);
        board.renumber_columns();
        board.updated_at = Utc::now();

        self.save_boards().await
    }
}
