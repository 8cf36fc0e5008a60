//! Recurrence rules that spawn tasks on a schedule
//!
//! Each rule carries a task template, a pattern, and the instant its next
//! task is due. [`RecurringTasks::check_and_create_due`] is meant to be run
//! periodically (at startup and on a timer); every due rule produces one
//! task per check and advances by one period.

use crate::error::{BoardError, Result};
use crate::namespace::RECURRING_KEY;
use crate::persistence::TaskPersistence;
use crate::task::{NewTask, TaskCollection};
use crate::types::{ColumnId, RuleId, Subtask, Tag, Task, TaskPriority};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

fn default_interval() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    #[serde(rename = "type")]
    pub kind: RecurrenceKind,
    /// Periods between occurrences, at least 1
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Stored for the editor; scheduling does not use it
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// Monthly only: pin the day, clamped to the month's length
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Last day on which the rule may fire
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecurrencePattern {
    pub fn new(kind: RecurrenceKind) -> Self {
        Self {
            kind,
            interval: 1,
            days_of_week: Vec::new(),
            day_of_month: None,
            end_date: None,
        }
    }

    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = Some(day);
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            return Err(BoardError::invalid_value("interval", "must be at least 1"));
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(BoardError::invalid_value(
                    "day_of_month",
                    format!("{day} is not a day of the month"),
                ));
            }
        }
        Ok(())
    }
}

/// The task each occurrence creates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: ColumnId,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub task_priority: TaskPriority,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl RuleTemplate {
    pub fn new(title: impl Into<String>, status: impl Into<ColumnId>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: status.into(),
            tags: Vec::new(),
            task_priority: TaskPriority::default(),
            subtasks: Vec::new(),
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.clone(),
            tags: task.tags.clone(),
            task_priority: task.task_priority,
            subtasks: task.subtasks.clone(),
        }
    }

    fn to_new_task(&self, due_date: NaiveDate) -> NewTask {
        NewTask::new(self.title.clone(), self.status.clone())
            .with_description(self.description.clone())
            .with_due_date(Some(due_date))
            .with_tags(self.tags.clone())
            .with_task_priority(self.task_priority)
            .with_subtasks(self.subtasks.iter().map(Subtask::duplicate).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub id: RuleId,
    pub task_template: RuleTemplate,
    pub recurrence: RecurrencePattern,
    pub next_due: DateTime<Utc>,
    #[serde(default)]
    pub last_created: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub task_template: Option<RuleTemplate>,
    pub recurrence: Option<RecurrencePattern>,
    pub next_due: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl RuleUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_template(mut self, template: RuleTemplate) -> Self {
        self.task_template = Some(template);
        self
    }

    pub fn with_recurrence(mut self, recurrence: RecurrencePattern) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn with_next_due(mut self, next_due: DateTime<Utc>) -> Self {
        self.next_due = Some(next_due);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

/// The occurrence after `from`
///
/// Months and years are calendar steps; a day that does not exist in the
/// target month is clamped to its last day.
pub fn calculate_next_due(
    pattern: &RecurrencePattern,
    from: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
    let overflow = || BoardError::invalid_value("recurrence", "next occurrence is out of range");
    let interval = pattern.interval.max(1);

    let next = match pattern.kind {
        RecurrenceKind::Daily => from.checked_add_signed(Duration::days(interval as i64)),
        RecurrenceKind::Weekly => from.checked_add_signed(Duration::weeks(interval as i64)),
        RecurrenceKind::Monthly => {
            let shifted = from
                .checked_add_months(Months::new(interval))
                .ok_or_else(overflow)?;
            match pattern.day_of_month {
                Some(day) => {
                    let day = day.min(days_in_month(shifted.year(), shifted.month()));
                    shifted.with_day(day)
                }
                None => Some(shifted),
            }
        }
        RecurrenceKind::Yearly => interval
            .checked_mul(12)
            .and_then(|months| from.checked_add_months(Months::new(months))),
    };
    next.ok_or_else(overflow)
}

/// The stored recurrence rules
#[derive(Debug)]
pub struct RecurringTasks {
    persistence: Arc<TaskPersistence>,
    rules: Vec<RecurrenceRule>,
}

impl RecurringTasks {
    /// Read the stored rules; an unreadable list starts empty
    pub async fn load(persistence: Arc<TaskPersistence>) -> Self {
        let rules = match persistence.load_list::<RecurrenceRule>(RECURRING_KEY).await {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "failed to load recurrence rules, starting empty");
                Vec::new()
            }
        };
        Self { persistence, rules }
    }

    /// Build an active rule whose first occurrence is one period after `now`
    pub fn create_rule(
        &self,
        template: RuleTemplate,
        pattern: RecurrencePattern,
        now: DateTime<Utc>,
    ) -> Result<RecurrenceRule> {
        if template.title.trim().is_empty() {
            return Err(BoardError::invalid_value("title", "title cannot be empty"));
        }
        pattern.validate()?;
        Ok(RecurrenceRule {
            id: RuleId::new(),
            next_due: calculate_next_due(&pattern, now)?,
            task_template: template,
            recurrence: pattern,
            last_created: None,
            is_active: true,
            created_at: now,
        })
    }

    pub async fn add(&mut self, rule: RecurrenceRule) -> Result<&RecurrenceRule> {
        rule.recurrence.validate()?;
        if self.index_of(&rule.id).is_ok() {
            return Err(BoardError::invalid_value(
                "id",
                format!("rule {} already exists", rule.id),
            ));
        }
        debug!(rule_id = %rule.id, next_due = %rule.next_due, "adding recurrence rule");
        self.rules.push(rule);
        self.save().await?;
        Ok(&self.rules[self.rules.len() - 1])
    }

    pub async fn update(&mut self, id: &RuleId, update: RuleUpdate) -> Result<&RecurrenceRule> {
        let index = self.index_of(id)?;
        if let Some(pattern) = &update.recurrence {
            pattern.validate()?;
        }

        let rule = &mut self.rules[index];
        if let Some(template) = update.task_template {
            rule.task_template = template;
        }
        if let Some(recurrence) = update.recurrence {
            rule.recurrence = recurrence;
        }
        if let Some(next_due) = update.next_due {
            rule.next_due = next_due;
        }
        if let Some(is_active) = update.is_active {
            rule.is_active = is_active;
        }

        self.save().await?;
        Ok(&self.rules[index])
    }

    pub async fn delete(&mut self, id: &RuleId) -> Result<RecurrenceRule> {
        let index = self.index_of(id)?;
        let removed = self.rules.remove(index);
        self.save().await?;
        Ok(removed)
    }

    /// Flip a rule's active flag; returns the new value
    pub async fn toggle(&mut self, id: &RuleId) -> Result<bool> {
        let index = self.index_of(id)?;
        self.rules[index].is_active = !self.rules[index].is_active;
        let active = self.rules[index].is_active;
        self.save().await?;
        Ok(active)
    }

    pub fn get(&self, id: &RuleId) -> Option<&RecurrenceRule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    /// Soonest first
    pub fn rules(&self) -> Vec<&RecurrenceRule> {
        let mut rules: Vec<&RecurrenceRule> = self.rules.iter().collect();
        rules.sort_by_key(|r| r.next_due);
        rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Create the tasks that are due at `now` in `collection`
    ///
    /// Inactive rules are skipped. A rule whose end date has passed is
    /// deactivated. A due rule creates one task dated on its due day, then
    /// advances `next_due` by one period. A rule whose template does not fit
    /// the collection (unknown column) is left due and logged, as is a rule
    /// whose next date cannot be computed. The rule list is saved when
    /// anything changed; a failed task write or date computation is returned
    /// after the other rules have been advanced and saved.
    pub async fn check_and_create_due(
        &mut self,
        now: DateTime<Utc>,
        collection: &mut TaskCollection,
    ) -> Result<Vec<Task>> {
        let mut created = Vec::new();
        let mut changed = false;
        let mut failure = None;

        for rule in self.rules.iter_mut() {
            if !rule.is_active {
                continue;
            }
            if let Some(end_date) = rule.recurrence.end_date {
                if now.date_naive() > end_date {
                    info!(rule_id = %rule.id, %end_date, "recurrence rule expired");
                    rule.is_active = false;
                    changed = true;
                    continue;
                }
            }
            if now < rule.next_due {
                continue;
            }

            let next_due = match calculate_next_due(&rule.recurrence, rule.next_due) {
                Ok(next_due) => next_due,
                Err(e) => {
                    error!(rule_id = %rule.id, error = %e, "cannot advance recurrence rule");
                    failure.get_or_insert(e);
                    continue;
                }
            };
            let new_task = rule.task_template.to_new_task(rule.next_due.date_naive());
            let task = match collection.create(new_task) {
                Ok(task) => task,
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "recurrence template does not fit the board");
                    continue;
                }
            };

            let added = collection.add(task.clone()).await;
            rule.last_created = Some(now);
            rule.next_due = next_due;
            changed = true;
            debug!(rule_id = %rule.id, task_id = %task.id, next_due = %rule.next_due, "created recurring task");

            if let Err(e) = added {
                error!(rule_id = %rule.id, error = %e, "failed to save recurring task");
                failure.get_or_insert(e);
            }
            created.push(task);
        }

        if changed {
            self.save().await?;
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(created),
        }
    }

    async fn save(&self) -> Result<()> {
        self.persistence.save_list(RECURRING_KEY, &self.rules).await
    }

    fn index_of(&self, id: &RuleId) -> Result<usize> {
        self.rules
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| BoardError::not_found("recurrence rule", id.as_str()))
    }
}
