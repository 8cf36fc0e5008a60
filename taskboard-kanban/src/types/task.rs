//! Task types: Task, Subtask, Comment, Attachment

use super::board::{Color, Tag};
use super::ids::{AttachmentId, ColumnId, CommentId, SubtaskId, TaskId};
use super::payload::{base64_bytes, base64_opt, optional_date};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User-facing urgency, independent of the ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    #[default]
    Medium,
    Low,
}

/// A task/card on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,

    /// Column id this task sits in
    pub status: ColumnId,

    #[serde(rename = "date", default, with = "optional_date")]
    pub due_date: Option<NaiveDate>,

    #[serde(default)]
    pub tags: Vec<Tag>,

    /// Ordering key within the task's column, 0-based
    #[serde(default)]
    pub priority: u32,

    #[serde(default)]
    pub task_priority: TaskPriority,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    #[serde(default)]
    pub comments: Vec<Comment>,

    /// Stored in the blob store; never part of the scalar record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Cover image, kept with the scalar record
    #[serde(default, with = "base64_opt", skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,

    pub created_at: DateTime<Utc>,

    /// Legacy single-tag fields - accepted on read, folded into `tags`, never written.
    #[serde(default, skip_serializing, rename = "tag")]
    legacy_tag: Option<String>,
    #[serde(default, skip_serializing, rename = "tag_color")]
    legacy_tag_color: Option<Color>,
}

impl Task {
    /// Create a new task in `status` with all other fields at their defaults
    pub fn new(title: impl Into<String>, status: impl Into<ColumnId>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            description: String::new(),
            status: status.into(),
            due_date: None,
            tags: Vec::new(),
            priority: 0,
            task_priority: TaskPriority::default(),
            subtasks: Vec::new(),
            comments: Vec::new(),
            attachments: Vec::new(),
            image: None,
            created_at: Utc::now(),
            legacy_tag: None,
            legacy_tag_color: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Set tags, dropping case-insensitive duplicates
    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = Tag::dedup(tags);
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
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

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether any tag has exactly this name
    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Fold a legacy single `tag` field into `tags`.
    /// Returns true if migration occurred.
    pub fn migrate_legacy_tag(&mut self) -> bool {
        let Some(name) = self.legacy_tag.take() else {
            return false;
        };
        let color = self.legacy_tag_color.take().unwrap_or_default();
        if name.is_empty() || !self.tags.is_empty() {
            return false;
        }
        self.tags.push(Tag::new(name, color));
        true
    }

    /// Number of completed subtasks
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }

    /// Add a comment and return its id
    pub fn add_comment(&mut self, text: impl Into<String>) -> CommentId {
        let comment = Comment::new(text);
        let id = comment.id.clone();
        self.comments.push(comment);
        id
    }

    /// Remove a comment by id. Returns whether it existed.
    pub fn remove_comment(&mut self, id: &CommentId) -> bool {
        let before = self.comments.len();
        self.comments.retain(|c| &c.id != id);
        self.comments.len() != before
    }
}

/// A checklist item inside a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: SubtaskId::new(),
            text: text.into(),
            completed: false,
        }
    }

    /// Copy with a freshly generated id
    pub fn duplicate(&self) -> Self {
        Self {
            id: SubtaskId::new(),
            ..self.clone()
        }
    }
}

/// A comment on a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    #[default]
    File,
}

/// A binary file attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: AttachmentKind,
    /// Payload size in bytes
    #[serde(default)]
    pub size: u64,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, kind: AttachmentKind, data: Vec<u8>) -> Self {
        Self {
            id: AttachmentId::new(),
            name: name.into(),
            kind,
            size: data.len() as u64,
            data,
        }
    }
}
