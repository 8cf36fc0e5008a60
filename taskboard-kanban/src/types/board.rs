//! Board-level types: Board, Column, Tag, Color

use super::ids::{BoardId, ColumnId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Palette shared by tags and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    #[default]
    Blue,
    Indigo,
    Purple,
    Pink,
}

/// A board: metadata plus its ordered column layout
///
/// Boards own no tasks directly. A board's tasks live under the namespace
/// derived from its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Board::default_columns")]
    pub columns: Vec<Column>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// Create a new board with a fresh id and the default columns
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BoardId::new(),
            name: name.into(),
            description: String::new(),
            columns: Self::default_columns(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Replace the column layout, renumbering `order` from 0
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self.renumber_columns();
        self
    }

    /// Get the default columns for a new board
    pub fn default_columns() -> Vec<Column> {
        vec![
            Column::new("todo", "To Do", Color::Gray, 0),
            Column::new("inprogress", "In Progress", Color::Yellow, 1),
            Column::new("completed", "Completed", Color::Green, 2),
        ]
    }

    /// Find a column by id
    pub fn find_column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Columns sorted by `order`
    pub fn columns_in_order(&self) -> Vec<&Column> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    /// Set each column's `order` to its position in the list
    pub(crate) fn renumber_columns(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.order = index;
        }
    }
}

/// A column defines a workflow stage; its id is the task `status` value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub order: usize,
}

impl Column {
    pub fn new(id: impl Into<ColumnId>, name: impl Into<String>, color: Color, order: usize) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            order,
        }
    }
}

/// A tag attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub color: Color,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: Color) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }

    /// Drop later tags whose names repeat an earlier one, ignoring case
    pub fn dedup(tags: Vec<Tag>) -> Vec<Tag> {
        let mut seen = std::collections::HashSet::new();
        tags.into_iter()
            .filter(|tag| seen.insert(tag.name.to_lowercase()))
            .collect()
    }
}
