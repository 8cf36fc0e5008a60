//! Core types for the task board

mod board;
mod ids;
mod payload;
mod task;

// Re-export all types
pub use board::{Board, Color, Column, Tag};
pub use ids::{
    AttachmentId, BoardId, ColumnId, CommentId, RuleId, SubtaskId, TaskId, TemplateId,
};
pub use task::{Attachment, AttachmentKind, Comment, Subtask, Task, TaskPriority};
