//! NewTask - the input for creating a task

use crate::types::{Attachment, ColumnId, Comment, Subtask, Tag, Task, TaskPriority};
use chrono::NaiveDate;

/// Fields for a task that does not exist yet
///
/// Turned into a [`Task`] by [`TaskCollection::create`](super::TaskCollection::create),
/// which assigns the id and creation timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: ColumnId,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<Tag>,
    pub task_priority: TaskPriority,
    pub subtasks: Vec<Subtask>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    pub image: Option<Vec<u8>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, status: impl Into<ColumnId>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: status.into(),
            due_date: None,
            tags: Vec::new(),
            task_priority: TaskPriority::default(),
            subtasks: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            image: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_task_priority(mut self, task_priority: TaskPriority) -> Self {
        self.task_priority = task_priority;
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    /// Build the task with a fresh id, the current time, and deduplicated tags
    pub(crate) fn into_task(self) -> Task {
        let mut task = Task::new(self.title, self.status)
            .with_description(self.description)
            .with_tags(self.tags)
            .with_task_priority(self.task_priority)
            .with_subtasks(self.subtasks)
            .with_attachments(self.attachments);
        task.due_date = self.due_date;
        task.comments = self.comments;
        task.image = self.image;
        task
    }
}
