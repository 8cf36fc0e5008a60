//! Drag session state machine
//!
//! Translates pointer gestures into [`TaskCollection`] calls. The controller
//! is the only caller of [`TaskCollection::reorder`] from the UI side.
//!
//! ```text
//! Idle --start--> Dragging { task_id, hint } --drop/end--> Idle
//! ```

use crate::error::Result;
use crate::task::{DropPosition, TaskCollection};
use crate::types::{ColumnId, TaskId};
use tracing::debug;

/// The most recent hover position; overwritten on every move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragHint {
    pub target: TaskId,
    pub position: DropPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        task_id: TaskId,
        hint: Option<DragHint>,
    },
}

/// What a drop did to the collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Reordered within the dragged task's column
    Reordered { position: DropPosition },
    /// Moved to another column, appended at its end
    Moved { status: ColumnId },
    Ignored,
}

#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Begin dragging `task_id`, discarding any previous session
    pub fn start(&mut self, task_id: impl Into<TaskId>) {
        let task_id = task_id.into();
        debug!(task_id = %task_id, "drag started");
        self.state = DragState::Dragging {
            task_id,
            hint: None,
        };
    }

    /// Record the pointer over `target`
    ///
    /// `top` and `height` describe the hovered task's box. Above its vertical
    /// midpoint is `before`, at or below is `after`.
    pub fn hover(&mut self, target: &TaskId, pointer_y: f64, top: f64, height: f64) {
        let DragState::Dragging { task_id, hint } = &mut self.state else {
            return;
        };
        if task_id == target {
            return;
        }
        let position = if pointer_y < top + height / 2.0 {
            DropPosition::Before
        } else {
            DropPosition::After
        };
        *hint = Some(DragHint {
            target: target.clone(),
            position,
        });
    }

    /// Drop onto another task
    ///
    /// Same column reorders using the hint recorded for `target` (or `after`
    /// when the last hover was elsewhere). A different column moves the task
    /// there. The session ends either way.
    pub async fn drop_on_task(
        &mut self,
        collection: &mut TaskCollection,
        target: &TaskId,
    ) -> Result<DropOutcome> {
        let DragState::Dragging { task_id, hint } = std::mem::take(&mut self.state) else {
            return Ok(DropOutcome::Ignored);
        };
        if &task_id == target {
            return Ok(DropOutcome::Ignored);
        }

        let dragged_status = match collection.get(&task_id) {
            Some(task) => task.status.clone(),
            None => return Ok(DropOutcome::Ignored),
        };
        let target_status = match collection.get(target) {
            Some(task) => task.status.clone(),
            None => return Ok(DropOutcome::Ignored),
        };

        if dragged_status == target_status {
            let position = hint
                .filter(|h| &h.target == target)
                .map(|h| h.position)
                .unwrap_or_default();
            collection.reorder(&task_id, target, position).await?;
            Ok(DropOutcome::Reordered { position })
        } else {
            collection.move_to(&task_id, target_status.clone()).await?;
            Ok(DropOutcome::Moved {
                status: target_status,
            })
        }
    }

    /// Drop onto a column's empty area
    pub async fn drop_on_column(
        &mut self,
        collection: &mut TaskCollection,
        status: &ColumnId,
    ) -> Result<DropOutcome> {
        let DragState::Dragging { task_id, .. } = std::mem::take(&mut self.state) else {
            return Ok(DropOutcome::Ignored);
        };
        match collection.get(&task_id) {
            Some(task) if &task.status != status => {
                collection.move_to(&task_id, status.clone()).await?;
                Ok(DropOutcome::Moved {
                    status: status.clone(),
                })
            }
            _ => Ok(DropOutcome::Ignored),
        }
    }

    /// End the gesture, dropped or cancelled
    pub fn end(&mut self) {
        if self.is_dragging() {
            debug!("drag ended");
        }
        self.state = DragState::Idle;
    }
}
