//! Whole-store export and import
//!
//! The export document bundles every board with its tasks plus a map of
//! attachment lists keyed by task id. Documents from single-board versions,
//! shaped `{ "tasks": [...] }`, are accepted on import and land in the
//! current board.

use crate::board::BoardRegistry;
use crate::error::{BoardError, Result};
use crate::namespace::Namespace;
use crate::persistence::TaskPersistence;
use crate::task::reorder;
use crate::types::{Attachment, Board, ColumnId, Task, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardExport {
    pub board: Board,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub boards: Vec<BoardExport>,
    #[serde(default)]
    pub attachments: BTreeMap<TaskId, Vec<Attachment>>,
    /// Single-board task list from older exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks: Option<Vec<Task>>,
}

impl ExportDocument {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_legacy(&self) -> bool {
        self.boards.is_empty() && self.tasks.is_some()
    }

    /// Fill in attachments of tasks that arrived without them. Entries for
    /// tasks not in the document are dropped.
    fn attach_payloads(&mut self) {
        let attachments = std::mem::take(&mut self.attachments);
        let tasks = self
            .boards
            .iter_mut()
            .flat_map(|b| b.tasks.iter_mut())
            .chain(self.tasks.iter_mut().flatten());
        for task in tasks {
            if task.attachments.is_empty() {
                if let Some(list) = attachments.get(&task.id) {
                    task.attachments = list.clone();
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Keep what exists; add new boards and tasks with new ids
    #[default]
    Merge,
    /// Discard every board, task list and attachment first
    Replace,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(BoardError::invalid_value(
                "mode",
                format!("unknown import mode '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub boards_added: usize,
    pub tasks_added: usize,
}

/// Snapshot every board, its tasks, and all stored attachments
pub async fn export(
    registry: &BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<ExportDocument> {
    let mut boards = Vec::with_capacity(registry.len());
    for board in registry.boards() {
        let tasks = persistence.load(&Namespace::for_board(&board.id)).await?;
        boards.push(BoardExport {
            board: board.clone(),
            tasks,
        });
    }
    let attachments = persistence.all_attachments().await?;

    info!(boards = boards.len(), "exported boards");
    Ok(ExportDocument {
        exported_at: Utc::now(),
        boards,
        attachments,
        tasks: None,
    })
}

/// Load `document` into storage
///
/// Callers holding a [`TaskCollection`](crate::task::TaskCollection) must
/// reload it afterwards.
pub async fn import(
    mut document: ExportDocument,
    mode: ImportMode,
    registry: &mut BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<ImportSummary> {
    if document.boards.is_empty() && document.tasks.is_none() {
        return match mode {
            ImportMode::Replace => Err(BoardError::invariant(
                "a replace import must contain at least one board",
            )),
            ImportMode::Merge => Ok(ImportSummary::default()),
        };
    }
    document.attach_payloads();

    if document.is_legacy() {
        let tasks = document.tasks.unwrap_or_default();
        return import_legacy(tasks, mode, registry, persistence).await;
    }

    let summary = match mode {
        ImportMode::Replace => replace(document.boards, registry, persistence).await?,
        ImportMode::Merge => merge(document.boards, registry, persistence).await?,
    };
    info!(%mode, boards = summary.boards_added, tasks = summary.tasks_added, "imported boards");
    Ok(summary)
}

async fn replace(
    boards: Vec<BoardExport>,
    registry: &mut BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<ImportSummary> {
    persistence.purge_attachments().await?;
    let (boards, task_lists): (Vec<Board>, Vec<Vec<Task>>) =
        boards.into_iter().map(|b| (b.board, b.tasks)).unzip();
    registry.replace_boards(boards.clone()).await?;

    let mut summary = ImportSummary {
        boards_added: boards.len(),
        tasks_added: 0,
    };
    let mut in_use = BTreeSet::new();
    for (board, tasks) in boards.iter().zip(task_lists) {
        let mut tasks: Vec<Task> = tasks
            .into_iter()
            .map(|t| claim_id(t, &mut in_use))
            .collect();
        reorder::fit_to_columns(&mut tasks, &column_ids(board));
        reorder::compact_all(&mut tasks);
        summary.tasks_added += tasks.len();
        persistence
            .save(&Namespace::for_board(&board.id), &tasks)
            .await?;
    }
    Ok(summary)
}

async fn merge(
    boards: Vec<BoardExport>,
    registry: &mut BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<ImportSummary> {
    let mut in_use = ids_in_use(registry, persistence).await?;
    let mut summary = ImportSummary::default();
    for BoardExport { board, tasks } in boards {
        let namespace = Namespace::for_board(&board.id);
        if let Some(columns) = registry.get(&board.id).map(column_ids) {
            let mut existing = persistence.load(&namespace).await?;
            let added = append_new(&mut existing, tasks, &columns, &mut in_use);
            if added > 0 {
                persistence.save(&namespace, &existing).await?;
            }
            debug!(board_id = %board.id, added, "merged into existing board");
            summary.tasks_added += added;
        } else {
            let mut tasks: Vec<Task> = tasks
                .into_iter()
                .map(|t| claim_id(t, &mut in_use))
                .collect();
            reorder::fit_to_columns(&mut tasks, &column_ids(&board));
            reorder::compact_all(&mut tasks);
            summary.tasks_added += tasks.len();
            registry.add_board(board).await?;
            persistence.save(&namespace, &tasks).await?;
            summary.boards_added += 1;
        }
    }
    Ok(summary)
}

async fn import_legacy(
    tasks: Vec<Task>,
    mode: ImportMode,
    registry: &BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<ImportSummary> {
    let namespace = registry.current_namespace();
    let columns = registry.current_board().map(column_ids).unwrap_or_default();
    let (merged, tasks_added) = match mode {
        ImportMode::Replace => {
            let current = persistence.load(&namespace).await?;
            for task in &current {
                persistence.delete_attachments(&task.id).await?;
            }
            let current_ids: BTreeSet<TaskId> = current.into_iter().map(|t| t.id).collect();
            let mut in_use: BTreeSet<TaskId> = ids_in_use(registry, persistence)
                .await?
                .difference(&current_ids)
                .cloned()
                .collect();
            let mut tasks: Vec<Task> = tasks
                .into_iter()
                .map(|t| claim_id(t, &mut in_use))
                .collect();
            reorder::fit_to_columns(&mut tasks, &columns);
            reorder::compact_all(&mut tasks);
            let count = tasks.len();
            (tasks, count)
        }
        ImportMode::Merge => {
            let mut in_use = ids_in_use(registry, persistence).await?;
            let mut existing = persistence.load(&namespace).await?;
            let added = append_new(&mut existing, tasks, &columns, &mut in_use);
            (existing, added)
        }
    };
    persistence.save(&namespace, &merged).await?;
    info!(namespace = %namespace, %mode, tasks = tasks_added, "imported legacy task list");
    Ok(ImportSummary {
        boards_added: 0,
        tasks_added,
    })
}

/// Append the tasks whose ids are not in `existing` to the end of their
/// columns; returns how many
fn append_new(
    existing: &mut Vec<Task>,
    incoming: Vec<Task>,
    columns: &[ColumnId],
    in_use: &mut BTreeSet<TaskId>,
) -> usize {
    let known: BTreeSet<TaskId> = existing.iter().map(|t| t.id.clone()).collect();
    let mut fresh: Vec<Task> = incoming
        .into_iter()
        .filter(|t| !known.contains(&t.id))
        .map(|t| claim_id(t, in_use))
        .collect();
    let added = fresh.len();
    reorder::fit_to_columns(&mut fresh, columns);
    reorder::append_to_columns(existing, fresh);
    added
}

/// Attachment blobs are keyed by task id across all boards, so an id that
/// is already stored elsewhere is replaced with a new one
fn claim_id(task: Task, in_use: &mut BTreeSet<TaskId>) -> Task {
    let task = if in_use.contains(&task.id) {
        let id = TaskId::new();
        debug!(old_id = %task.id, new_id = %id, "task id already in use, assigning a new one");
        task.with_id(id)
    } else {
        task
    };
    in_use.insert(task.id.clone());
    task
}

/// Every task id stored on a registered board
async fn ids_in_use(
    registry: &BoardRegistry,
    persistence: &TaskPersistence,
) -> Result<BTreeSet<TaskId>> {
    let mut ids = BTreeSet::new();
    for board in registry.boards() {
        let tasks = persistence.load(&Namespace::for_board(&board.id)).await?;
        ids.extend(tasks.into_iter().map(|t| t.id));
    }
    Ok(ids)
}

fn column_ids(board: &Board) -> Vec<ColumnId> {
    board.columns_in_order().iter().map(|c| c.id.clone()).collect()
}
