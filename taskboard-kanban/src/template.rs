//! Reusable task templates
//!
//! Templates capture a task's description, tags, urgency and checklist under
//! a name. They are global (not board-scoped) and stored as one JSON list.

use crate::error::{BoardError, Result};
use crate::namespace::TEMPLATES_KEY;
use crate::persistence::TaskPersistence;
use crate::task::NewTask;
use crate::types::{ColumnId, Subtask, Tag, Task, TaskPriority, TemplateId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub task_priority: TaskPriority,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
}

impl Template {
    /// Capture `task`'s reusable fields under `name`
    pub fn from_task(name: impl Into<String>, task: &Task) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            description: task.description.clone(),
            tags: task.tags.clone(),
            task_priority: task.task_priority,
            subtasks: task.subtasks.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Partial template update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<Tag>>,
    pub task_priority: Option<TaskPriority>,
    pub subtasks: Option<Vec<Subtask>>,
}

impl TemplateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
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
}

/// The stored set of templates
#[derive(Debug)]
pub struct TemplateLibrary {
    persistence: Arc<TaskPersistence>,
    templates: Vec<Template>,
}

impl TemplateLibrary {
    /// Read the stored templates; an unreadable list starts empty
    pub async fn load(persistence: Arc<TaskPersistence>) -> Self {
        let templates = match persistence.load_list::<Template>(TEMPLATES_KEY).await {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to load templates, starting empty");
                Vec::new()
            }
        };
        Self {
            persistence,
            templates,
        }
    }

    /// Build a template from `task` without storing it
    pub fn create_template(&self, name: impl Into<String>, task: &Task) -> Result<Template> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BoardError::invalid_value("name", "template name cannot be empty"));
        }
        Ok(Template::from_task(name, task))
    }

    pub async fn add(&mut self, template: Template) -> Result<&Template> {
        if self.index_of(&template.id).is_ok() {
            return Err(BoardError::invalid_value(
                "id",
                format!("template {} already exists", template.id),
            ));
        }
        debug!(template_id = %template.id, name = %template.name, "adding template");
        self.templates.push(template);
        self.save().await?;
        Ok(&self.templates[self.templates.len() - 1])
    }

    pub async fn update(&mut self, id: &TemplateId, update: TemplateUpdate) -> Result<&Template> {
        let index = self.index_of(id)?;
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(BoardError::invalid_value("name", "template name cannot be empty"));
            }
        }

        let template = &mut self.templates[index];
        if let Some(name) = update.name {
            template.name = name;
        }
        if let Some(description) = update.description {
            template.description = description;
        }
        if let Some(tags) = update.tags {
            template.tags = Tag::dedup(tags);
        }
        if let Some(task_priority) = update.task_priority {
            template.task_priority = task_priority;
        }
        if let Some(subtasks) = update.subtasks {
            template.subtasks = subtasks;
        }

        self.save().await?;
        Ok(&self.templates[index])
    }

    pub async fn delete(&mut self, id: &TemplateId) -> Result<Template> {
        let index = self.index_of(id)?;
        let removed = self.templates.remove(index);
        self.save().await?;
        Ok(removed)
    }

    pub fn get(&self, id: &TemplateId) -> Option<&Template> {
        self.templates.iter().find(|t| &t.id == id)
    }

    /// Newest first
    pub fn templates(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.templates.iter().collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Task input seeded from a template
    ///
    /// Subtasks get fresh ids; attachments and comments start empty.
    pub fn apply(
        &self,
        id: &TemplateId,
        title: impl Into<String>,
        status: impl Into<ColumnId>,
        due_date: Option<NaiveDate>,
    ) -> Result<NewTask> {
        let template = self
            .get(id)
            .ok_or_else(|| BoardError::not_found("template", id.as_str()))?;
        Ok(NewTask::new(title, status)
            .with_description(template.description.clone())
            .with_due_date(due_date)
            .with_tags(template.tags.clone())
            .with_task_priority(template.task_priority)
            .with_subtasks(template.subtasks.iter().map(Subtask::duplicate).collect()))
    }

    async fn save(&self) -> Result<()> {
        self.persistence
            .save_list(TEMPLATES_KEY, &self.templates)
            .await
    }

    fn index_of(&self, id: &TemplateId) -> Result<usize> {
        self.templates
            .iter()
            .position(|t| &t.id == id)
            .ok_or_else(|| BoardError::not_found("template", id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;
    use chrono::Duration;
    use taskboard_store::{MemoryBlobStore, MemoryScalarStore};

    fn persistence() -> Arc<TaskPersistence> {
        Arc::new(TaskPersistence::new(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryScalarStore::new()),
        ))
    }

    fn sample_task() -> Task {
        Task::new("Weekly report", "todo")
            .with_description("Summarise the week")
            .with_tags(vec![Tag::new("ops", Color::Green)])
            .with_task_priority(TaskPriority::High)
            .with_subtasks(vec![Subtask::new("collect"), Subtask::new("send")])
    }

    #[tokio::test]
    async fn test_templates_persist() {
        let persistence = persistence();
        let mut library = TemplateLibrary::load(persistence.clone()).await;
        let template = library.create_template("Report", &sample_task()).unwrap();
        let id = template.id.clone();
        library.add(template).await.unwrap();

        let reloaded = TemplateLibrary::load(persistence).await;
        let stored = reloaded.get(&id).unwrap();
        assert_eq!(stored.name, "Report");
        assert_eq!(stored.subtasks.len(), 2);
        assert_eq!(stored.task_priority, TaskPriority::High);
    }

    #[tokio::test]
    async fn test_apply_gives_fresh_subtask_ids() {
        let mut library = TemplateLibrary::load(persistence()).await;
        let template = library.create_template("Report", &sample_task()).unwrap();
        let id = template.id.clone();
        let original_ids: Vec<_> = template.subtasks.iter().map(|s| s.id.clone()).collect();
        library.add(template).await.unwrap();

        let due = NaiveDate::from_ymd_opt(2024, 5, 1);
        let new_task = library.apply(&id, "Report W18", "inprogress", due).unwrap();
        assert_eq!(new_task.title, "Report W18");
        assert_eq!(new_task.status, "inprogress");
        assert_eq!(new_task.due_date, due);
        assert_eq!(new_task.description, "Summarise the week");
        assert!(new_task.attachments.is_empty() && new_task.comments.is_empty());
        assert!(new_task
            .subtasks
            .iter()
            .all(|s| !original_ids.contains(&s.id)));
    }

    #[tokio::test]
    async fn test_update_delete_and_order() {
        let mut library = TemplateLibrary::load(persistence()).await;
        let mut older = Template::from_task("Older", &sample_task());
        older.created_at = Utc::now() - Duration::days(1);
        let older_id = older.id.clone();
        library.add(older).await.unwrap();
        library
            .add(Template::from_task("Newer", &sample_task()))
            .await
            .unwrap();

        let names: Vec<&str> = library.templates().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);

        library
            .update(&older_id, TemplateUpdate::new().with_name("Renamed"))
            .await
            .unwrap();
        assert_eq!(library.get(&older_id).unwrap().name, "Renamed");

        library.delete(&older_id).await.unwrap();
        assert_eq!(library.len(), 1);
        assert!(matches!(
            library.delete(&older_id).await.unwrap_err(),
            BoardError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_apply_unknown_template() {
        let library = TemplateLibrary::load(persistence()).await;
        let err = library
            .apply(&TemplateId::from_string("nope"), "t", "todo", None)
            .unwrap_err();
        assert!(matches!(err, BoardError::NotFound { .. }));
    }
}
