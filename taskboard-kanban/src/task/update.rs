//! TaskUpdate - id-keyed partial update

use crate::types::{Attachment, ColumnId, Comment, Subtask, Tag, Task, TaskPriority};
use chrono::NaiveDate;

/// Partial update for a task; `None` fields are left unchanged
///
/// `due_date` and `image` are doubly optional: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ColumnId>,
    pub due_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<Tag>>,
    pub task_priority: Option<TaskPriority>,
    pub subtasks: Option<Vec<Subtask>>,
    pub comments: Option<Vec<Comment>>,
    pub attachments: Option<Vec<Attachment>>,
    pub image: Option<Option<Vec<u8>>>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Move to another column
    pub fn with_status(mut self, status: impl Into<ColumnId>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(Some(due_date));
        self
    }

    pub fn clear_due_date(mut self) -> Self {
        self.due_date = Some(None);
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn with_task_priority(mut self, task_priority: TaskPriority) -> Self {
        self.task_priority = Some(task_priority);
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = Some(subtasks);
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = Some(comments);
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(Some(image));
        self
    }

    pub fn clear_image(mut self) -> Self {
        self.image = Some(None);
        self
    }

    /// Write the set fields onto `task`. Status is applied too; priority
    /// bookkeeping for a column change is the caller's job.
    pub(crate) fn apply_to(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(tags) = self.tags {
            task.tags = Tag::dedup(tags);
        }
        if let Some(task_priority) = self.task_priority {
            task.task_priority = task_priority;
        }
        if let Some(subtasks) = self.subtasks {
            task.subtasks = subtasks;
        }
        if let Some(comments) = self.comments {
            task.comments = comments;
        }
        if let Some(attachments) = self.attachments {
            task.attachments = attachments;
        }
        if let Some(image) = self.image {
            task.image = image;
        }
    }
}
