//! Priority bookkeeping within a status column
//!
//! Priorities inside one column are kept unique, contiguous and 0-based in
//! display order. Every function here renumbers the whole column, which is
//! O(n) in the column size.

use crate::error::{BoardError, Result};
use crate::types::{ColumnId, Task, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Where a dragged task lands relative to the task it was dropped on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    Before,
    #[default]
    After,
}

/// Indices of `status`'s tasks sorted by priority; ties keep list order
fn column_indices(tasks: &[Task], status: &ColumnId) -> Vec<usize> {
    let mut indices: Vec<usize> = tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| &t.status == status)
        .map(|(i, _)| i)
        .collect();
    indices.sort_by_key(|&i| tasks[i].priority);
    indices
}

fn renumber(tasks: &mut [Task], order: &[usize]) {
    for (priority, &index) in order.iter().enumerate() {
        tasks[index].priority = priority as u32;
    }
}

/// Move `dragged` next to `target` within their shared column
///
/// The column is sorted by priority, the dragged task removed, then
/// reinserted before or after the target, and priorities reassigned from 0.
/// Both tasks must exist and share a status.
pub fn reorder_column(
    tasks: &mut [Task],
    dragged: &TaskId,
    target: &TaskId,
    position: DropPosition,
) -> Result<()> {
    let dragged_index = index_of(tasks, dragged)?;
    let target_index = index_of(tasks, target)?;
    if dragged_index == target_index {
        return Ok(());
    }

    let status = tasks[dragged_index].status.clone();
    if tasks[target_index].status != status {
        return Err(BoardError::invalid_operation(format!(
            "cannot reorder {} relative to {}: tasks are in different columns",
            dragged, target
        )));
    }

    let mut order = column_indices(tasks, &status);
    order.retain(|&i| i != dragged_index);
    let anchor = order
        .iter()
        .position(|&i| i == target_index)
        .ok_or_else(|| BoardError::TaskNotFound {
            id: target.to_string(),
        })?;
    let insert_at = match position {
        DropPosition::Before => anchor,
        DropPosition::After => anchor + 1,
    };
    order.insert(insert_at, dragged_index);

    renumber(tasks, &order);
    Ok(())
}

/// Renumber `status`'s tasks 0..n in their current priority order
pub fn compact_column(tasks: &mut [Task], status: &ColumnId) {
    let order = column_indices(tasks, status);
    renumber(tasks, &order);
}

/// Put `tasks[index]` last in its column, compacting the others
pub fn place_last(tasks: &mut [Task], index: usize) {
    let status = tasks[index].status.clone();
    let mut order = column_indices(tasks, &status);
    order.retain(|&i| i != index);
    order.push(index);
    renumber(tasks, &order);
}

/// Renumber every column that has tasks
pub fn compact_all(tasks: &mut [Task]) {
    let statuses: BTreeSet<ColumnId> = tasks.iter().map(|t| t.status.clone()).collect();
    for status in &statuses {
        compact_column(tasks, status);
    }
}

/// Append `incoming` after the tasks already in each column
///
/// Incoming tasks keep their relative priority order within a column.
pub fn append_to_columns(tasks: &mut Vec<Task>, mut incoming: Vec<Task>) {
    incoming.sort_by_key(|t| t.priority);
    for task in incoming {
        tasks.push(task);
        let index = tasks.len() - 1;
        place_last(tasks, index);
    }
}

/// Move tasks whose status is not one of `columns` into the first column
///
/// An empty `columns` leaves every task where it is. Returns how many moved.
pub fn fit_to_columns(tasks: &mut [Task], columns: &[ColumnId]) -> usize {
    let Some(first) = columns.first() else {
        return 0;
    };
    let mut moved = 0;
    for task in tasks.iter_mut().filter(|t| !columns.contains(&t.status)) {
        warn!(task_id = %task.id, status = %task.status, column = %first, "unknown column, moving task to the first column");
        task.status = first.clone();
        moved += 1;
    }
    moved
}

fn index_of(tasks: &[Task], id: &TaskId) -> Result<usize> {
    tasks
        .iter()
        .position(|t| &t.id == id)
        .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })
}
