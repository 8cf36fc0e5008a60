//! Multi-board task engine
//!
//! This crate keeps tasks organized into status columns across independent
//! boards, with tags, subtasks, comments, binary attachments, templates and
//! recurrence rules. State is split across two stores from
//! [`taskboard_store`]: attachments go to the blob store keyed by task id,
//! everything else goes to the scalar store as JSON documents.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use taskboard_kanban::{BoardConfig, BoardSession, DropPosition, NewTask};
//!
//! # async fn example() -> taskboard_kanban::Result<()> {
//! let config = BoardConfig::load(None)?;
//! let mut session = BoardSession::open(&config).await?;
//!
//! let first = session.add_task(NewTask::new("Write docs", "todo")).await?;
//! let second = session.add_task(NewTask::new("Ship it", "todo")).await?;
//!
//! // Put "Ship it" ahead of "Write docs"
//! session
//!     .tasks_mut()
//!     .reorder(&second.id, &first.id, DropPosition::Before)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Layout
//!
//! ```text
//! scalar store
//! ├── boards              # JSON array of boards with their columns
//! ├── current_board       # id of the selected board
//! ├── tasks:{board_id}    # JSON array of task records per board
//! ├── tasks               # task list written before boards existed
//! ├── templates           # JSON array of templates
//! └── recurring_tasks     # JSON array of recurrence rules
//!
//! blob store
//! └── {task_id}           # JSON array of that task's attachments
//! ```
//!
//! Within a column, tasks carry a 0-based contiguous `priority` that defines
//! display order. Reordering and column moves renumber the affected column.

pub mod board;
pub mod config;
pub mod drag;
mod error;
pub mod namespace;
pub mod persistence;
pub mod recurring;
pub mod session;
pub mod share;
pub mod task;
pub mod template;
pub mod transfer;
pub mod types;

pub use board::{BoardRegistry, BoardUpdate, ColumnUpdate};
pub use config::{Backend, BoardConfig};
pub use drag::{DragController, DragState, DropOutcome};
pub use error::{BoardError, Result};
pub use persistence::TaskPersistence;
pub use recurring::{RecurrenceKind, RecurrencePattern, RecurrenceRule, RecurringTasks, RuleTemplate};
pub use session::BoardSession;
pub use share::SharePayload;
pub use task::{
    DateRange, DropPosition, NewTask, SortMode, StatusCounts, StatusFilter, TaskCollection,
    TaskFilter, TaskUpdate,
};
pub use template::{Template, TemplateLibrary, TemplateUpdate};
pub use transfer::{ExportDocument, ImportMode, ImportSummary};

// Re-export commonly used types
pub use types::{
    Attachment, AttachmentKind, Board, BoardId, Color, Column, ColumnId, Comment, Subtask, Tag,
    Task, TaskId, TaskPriority,
};
