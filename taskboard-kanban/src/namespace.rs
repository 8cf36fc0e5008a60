//! Scalar store key names

use crate::types::BoardId;
use std::fmt;

/// Board list
pub const BOARDS_KEY: &str = "boards";
/// Template list
pub const TEMPLATES_KEY: &str = "templates";
/// Recurrence rule list
pub const RECURRING_KEY: &str = "recurring_tasks";
/// Id of the board last selected
pub const CURRENT_BOARD_KEY: &str = "current_board";

const LEGACY_TASKS_KEY: &str = "tasks";

/// Scalar key under which one board's task list is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Namespace of a board's tasks: `tasks:{board_id}`
    pub fn for_board(board_id: &BoardId) -> Self {
        Self(format!("{LEGACY_TASKS_KEY}:{board_id}"))
    }

    /// Namespace used before boards existed
    pub fn legacy() -> Self {
        Self(LEGACY_TASKS_KEY.to_string())
    }

    /// Namespace for an optional board; `None` selects the legacy namespace
    pub fn for_optional_board(board_id: Option<&BoardId>) -> Self {
        board_id.map_or_else(Self::legacy, Self::for_board)
    }

    pub fn key(&self) -> &str {
        &self.0
    }

    pub fn is_legacy(&self) -> bool {
        self.0 == LEGACY_TASKS_KEY
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
