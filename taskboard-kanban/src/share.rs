//! Shareable board snapshots
//!
//! A share payload is a board's layout plus its tasks with every binary
//! payload removed, encoded as URL-safe base64 of the JSON so it fits in a
//! link.

use crate::error::{BoardError, Result};
use crate::types::{Board, Column, Task};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareBoard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharePayload {
    pub board: ShareBoard,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl SharePayload {
    /// Snapshot `board` and `tasks`, dropping attachments and cover images
    pub fn new(board: &Board, tasks: &[Task]) -> Self {
        let tasks = tasks
            .iter()
            .map(|t| {
                let mut task = t.clone();
                task.attachments.clear();
                task.image = None;
                task
            })
            .collect();
        Self {
            board: ShareBoard {
                name: board.name.clone(),
                description: board.description.clone(),
                columns: board.columns.clone(),
            },
            tasks,
        }
    }

    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| BoardError::invalid_value("share", e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// A new board carrying the shared layout, with a fresh id
    pub fn to_board(&self) -> Board {
        Board::new(self.board.name.clone())
            .with_description(self.board.description.clone())
            .with_columns(self.board.columns.clone())
    }
}
