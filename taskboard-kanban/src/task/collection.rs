//! TaskCollection - the ordered task set of the active board
//!
//! Mutations change memory first and then persist the whole list through
//! [`TaskPersistence`]. When the write fails the change stays in memory, the
//! collection is marked dirty, and the error is returned; a later
//! [`TaskCollection::save`] retries.

use super::create::NewTask;
use super::filter::{DateRange, SortMode, StatusFilter, TaskFilter};
use super::reorder::{self, DropPosition};
use super::update::TaskUpdate;
use crate::error::{BoardError, Result};
use crate::namespace::Namespace;
use crate::persistence::TaskPersistence;
use crate::types::{Board, ColumnId, CommentId, SubtaskId, Task, TaskId};
use chrono::{Local, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Task counts per column after the date-range filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: usize,
    pub by_status: BTreeMap<ColumnId, usize>,
}

impl StatusCounts {
    pub fn get(&self, status: &ColumnId) -> usize {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

/// In-memory task list for one namespace
#[derive(Debug)]
pub struct TaskCollection {
    persistence: Arc<TaskPersistence>,
    namespace: Namespace,
    /// Column ids of the board; empty means statuses are not checked
    columns: Vec<ColumnId>,
    tasks: Vec<Task>,
    filter: TaskFilter,
    dirty: bool,
}

impl TaskCollection {
    /// An empty collection for `namespace`; nothing is read
    pub fn empty(persistence: Arc<TaskPersistence>, namespace: Namespace) -> Self {
        Self {
            persistence,
            namespace,
            columns: Vec::new(),
            tasks: Vec::new(),
            filter: TaskFilter::default(),
            dirty: false,
        }
    }

    /// Restrict statuses to `columns`
    pub fn with_columns(mut self, columns: Vec<ColumnId>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Load the tasks stored under `namespace`
    ///
    /// An unreadable task list degrades to an empty collection.
    pub async fn load(persistence: Arc<TaskPersistence>, namespace: Namespace) -> Self {
        let tasks = match persistence.load(&namespace).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "failed to load tasks, starting empty");
                Vec::new()
            }
        };
        Self {
            tasks,
            ..Self::empty(persistence, namespace)
        }
    }

    /// Load a board's tasks, validating statuses against its columns
    pub async fn for_board(persistence: Arc<TaskPersistence>, board: &Board) -> Self {
        let columns = board.columns_in_order().iter().map(|c| c.id.clone()).collect();
        Self::load(persistence, Namespace::for_board(&board.id))
            .await
            .with_columns(columns)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Track a changed column layout. Existing tasks are not moved.
    pub fn set_columns(&mut self, columns: Vec<ColumnId>) {
        self.columns = columns;
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Build a task from `new`, assigning id and creation time. Does not add
    /// or persist it.
    pub fn create(&self, new: NewTask) -> Result<Task> {
        validate_title(&new.title)?;
        self.validate_status(&new.status)?;
        Ok(new.into_task())
    }

    /// Append a task at the end of its column and persist
    pub async fn add(&mut self, task: Task) -> Result<&Task> {
        validate_title(&task.title)?;
        self.validate_status(&task.status)?;
        if self.index_of(&task.id).is_ok() {
            return Err(BoardError::invalid_value(
                "id",
                format!("task {} already exists", task.id),
            ));
        }

        debug!(namespace = %self.namespace, task_id = %task.id, "adding task");
        self.tasks.push(task);
        let index = self.tasks.len() - 1;
        reorder::place_last(&mut self.tasks, index);

        self.persist().await?;
        Ok(&self.tasks[index])
    }

    /// Apply a partial update and persist
    ///
    /// A status change appends the task to the end of its new column and
    /// closes the gap in the old one.
    pub async fn update(&mut self, id: &TaskId, update: TaskUpdate) -> Result<&Task> {
        let index = self.index_of(id)?;
        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(status) = &update.status {
            self.validate_status(status)?;
        }

        let old_status = self.tasks[index].status.clone();
        update.apply_to(&mut self.tasks[index]);
        if self.tasks[index].status != old_status {
            reorder::compact_column(&mut self.tasks, &old_status);
            reorder::place_last(&mut self.tasks, index);
        }

        debug!(namespace = %self.namespace, task_id = %id, "updated task");
        self.persist().await?;
        Ok(&self.tasks[index])
    }

    /// Move a task to another column
    pub async fn move_to(&mut self, id: &TaskId, status: impl Into<ColumnId>) -> Result<&Task> {
        self.update(id, TaskUpdate::new().with_status(status)).await
    }

    /// Remove a task, its attachment blob, and close the gap in its column
    pub async fn delete(&mut self, id: &TaskId) -> Result<Task> {
        let index = self.index_of(id)?;
        let task = self.tasks.remove(index);
        reorder::compact_column(&mut self.tasks, &task.status);

        debug!(namespace = %self.namespace, task_id = %id, "deleting task");
        if let Err(e) = self.persistence.delete_attachments(id).await {
            self.dirty = true;
            error!(namespace = %self.namespace, task_id = %id, error = %e, "failed to delete attachments");
            return Err(e);
        }
        self.persist().await?;
        Ok(task)
    }

    /// Move `dragged` before or after `target` within their column and persist
    pub async fn reorder(
        &mut self,
        dragged: &TaskId,
        target: &TaskId,
        position: DropPosition,
    ) -> Result<()> {
        reorder::reorder_column(&mut self.tasks, dragged, target, position)?;
        debug!(namespace = %self.namespace, task_id = %dragged, target = %target, ?position, "reordered task");
        self.persist().await
    }

    /// Flip a subtask's completion flag
    pub async fn toggle_subtask(&mut self, task_id: &TaskId, subtask_id: &SubtaskId) -> Result<bool> {
        let index = self.index_of(task_id)?;
        let subtask = self.tasks[index]
            .subtasks
            .iter_mut()
            .find(|s| &s.id == subtask_id)
            .ok_or_else(|| BoardError::not_found("subtask", subtask_id.as_str()))?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;

        self.persist().await?;
        Ok(completed)
    }

    /// Append a comment to a task
    pub async fn add_comment(&mut self, task_id: &TaskId, text: impl Into<String>) -> Result<CommentId> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(BoardError::invalid_value("text", "comment cannot be empty"));
        }
        let index = self.index_of(task_id)?;
        let id = self.tasks[index].add_comment(text);
        self.persist().await?;
        Ok(id)
    }

    pub async fn remove_comment(&mut self, task_id: &TaskId, comment_id: &CommentId) -> Result<()> {
        let index = self.index_of(task_id)?;
        if !self.tasks[index].remove_comment(comment_id) {
            return Err(BoardError::not_found("comment", comment_id.as_str()));
        }
        self.persist().await
    }

    /// Replace every task and persist
    ///
    /// Tasks in unknown columns go to the first column and every column is
    /// renumbered from 0.
    pub async fn replace_all(&mut self, mut tasks: Vec<Task>) -> Result<()> {
        reorder::fit_to_columns(&mut tasks, &self.columns);
        reorder::compact_all(&mut tasks);
        self.tasks = tasks;
        self.persist().await
    }

    /// Append the tasks whose ids are not present yet to the end of their
    /// columns; returns how many
    pub async fn merge_tasks(&mut self, tasks: Vec<Task>) -> Result<usize> {
        let existing: BTreeSet<TaskId> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let mut incoming: Vec<Task> = tasks
            .into_iter()
            .filter(|t| !existing.contains(&t.id))
            .collect();
        let added = incoming.len();
        reorder::fit_to_columns(&mut incoming, &self.columns);
        reorder::append_to_columns(&mut self.tasks, incoming);
        if added > 0 {
            self.persist().await?;
        }
        Ok(added)
    }

    /// Persist the current list; clears the dirty flag on success
    pub async fn save(&mut self) -> Result<()> {
        self.persist().await
    }

    /// True after a failed write until a later write succeeds
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    async fn persist(&mut self) -> Result<()> {
        match self.persistence.save(&self.namespace, &self.tasks).await {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                error!(namespace = %self.namespace, error = %e, "failed to save tasks");
                Err(e)
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// All tasks in storage order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// A column's tasks in priority order
    pub fn tasks_by_status(&self, status: &ColumnId) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.iter().filter(|t| &t.status == status).collect();
        tasks.sort_by_key(|t| t.priority);
        tasks
    }

    /// Every tag name in use, sorted and deduplicated
    pub fn unique_tags(&self) -> Vec<String> {
        self.tasks
            .iter()
            .flat_map(|t| t.tags.iter().map(|tag| tag.name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Per-column counts after the current date-range filter
    pub fn status_counts(&self, today: NaiveDate) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for status in &self.columns {
            counts.by_status.insert(status.clone(), 0);
        }
        for task in &self.tasks {
            if self.filter.date_range.contains(task.due_date, today) {
                counts.total += 1;
                *counts.by_status.entry(task.status.clone()).or_default() += 1;
            }
        }
        counts
    }

    /// Tasks passing the current filter, sorted
    pub fn filtered(&self, today: NaiveDate) -> Vec<&Task> {
        self.filter.apply(&self.tasks, today)
    }

    /// [`TaskCollection::filtered`] against the local calendar date
    pub fn get_filtered(&self) -> Vec<&Task> {
        self.filtered(Local::now().date_naive())
    }

    /// Copies of every task with attachments and cover image removed
    pub fn share_projection(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .map(|t| {
                let mut task = t.clone();
                task.attachments.clear();
                task.image = None;
                task
            })
            .collect()
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) {
        self.filter.status = status;
    }

    /// `None` or an empty name shows every tag
    pub fn set_tag_filter(&mut self, tag: Option<String>) {
        self.filter.tag = tag;
    }

    pub fn set_date_range(&mut self, date_range: DateRange) {
        self.filter.date_range = date_range;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filter.search = search.into();
    }

    pub fn set_sort(&mut self, sort: SortMode) {
        self.filter.sort = sort;
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn index_of(&self, id: &TaskId) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| BoardError::TaskNotFound { id: id.to_string() })
    }

    fn validate_status(&self, status: &ColumnId) -> Result<()> {
        if self.columns.is_empty() || self.columns.contains(status) {
            Ok(())
        } else {
            Err(BoardError::ColumnNotFound {
                id: status.to_string(),
            })
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(BoardError::invalid_value("title", "title cannot be empty"));
    }
    Ok(())
}
