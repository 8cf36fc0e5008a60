//! Filter, search and sort pipeline over a task list
//!
//! Stages run in a fixed order: status, tag, date range, free-text search,
//! then sort. The four predicates are independent, so their order does not
//! change which tasks pass.

use crate::error::{BoardError, Result};
use crate::types::{ColumnId, Task};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which column's tasks to show
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Status(ColumnId),
}

impl StatusFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => &task.status == status,
        }
    }
}

/// Due-date window relative to "today"
///
/// A task without a due date only passes [`DateRange::All`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    Today,
    Yesterday,
    /// Monday-start seven day window containing today
    ThisWeek,
    ThisMonth,
    ThisYear,
    /// A single chosen day; with no day chosen nothing matches
    Custom(Option<NaiveDate>),
    #[default]
    All,
}

impl DateRange {
    pub fn contains(&self, due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
        if matches!(self, Self::All) {
            return true;
        }
        let Some(date) = due_date else {
            return false;
        };
        match self {
            Self::Today => date == today,
            Self::Yesterday => Some(date) == today.pred_opt(),
            Self::ThisWeek => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                date >= start && date < start + Duration::days(7)
            }
            Self::ThisMonth => date.year() == today.year() && date.month() == today.month(),
            Self::ThisYear => date.year() == today.year(),
            Self::Custom(day) => *day == Some(date),
            Self::All => true,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::ThisWeek => "this-week",
            Self::ThisMonth => "this-month",
            Self::ThisYear => "this-year",
            Self::Custom(_) => "custom",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for DateRange {
    type Err = BoardError;

    /// Parses the range names; `custom` parses with no day chosen
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "this-week" => Ok(Self::ThisWeek),
            "this-month" => Ok(Self::ThisMonth),
            "this-year" => Ok(Self::ThisYear),
            "custom" => Ok(Self::Custom(None)),
            "all" => Ok(Self::All),
            other => Err(BoardError::invalid_value(
                "date_range",
                format!("unknown date range '{other}'"),
            )),
        }
    }
}

/// Ordering of the filtered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    CreatedAsc,
    #[default]
    CreatedDesc,
    TitleAsc,
    TitleDesc,
    /// Earliest due date first, undated last
    DateAsc,
    /// Latest due date first, undated last
    DateDesc,
    /// Ascending ordering key
    Priority,
}

impl FromStr for SortMode {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created-asc" => Ok(Self::CreatedAsc),
            "created-desc" => Ok(Self::CreatedDesc),
            "title-asc" => Ok(Self::TitleAsc),
            "title-desc" => Ok(Self::TitleDesc),
            "date-asc" => Ok(Self::DateAsc),
            "date-desc" => Ok(Self::DateDesc),
            "priority" => Ok(Self::Priority),
            other => Err(BoardError::invalid_value(
                "sort",
                format!("unknown sort mode '{other}'"),
            )),
        }
    }
}

fn compare_titles(a: &Task, b: &Task) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
}

fn compare_dates(a: &Task, b: &Task, descending: bool) -> Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort of `tasks` by `mode`
pub fn sort_tasks(tasks: &mut [&Task], mode: SortMode) {
    match mode {
        SortMode::CreatedAsc => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortMode::CreatedDesc => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortMode::TitleAsc => tasks.sort_by(|a, b| compare_titles(a, b)),
        SortMode::TitleDesc => tasks.sort_by(|a, b| compare_titles(b, a)),
        SortMode::DateAsc => tasks.sort_by(|a, b| compare_dates(a, b, false)),
        SortMode::DateDesc => tasks.sort_by(|a, b| compare_dates(a, b, true)),
        SortMode::Priority => tasks.sort_by_key(|t| t.priority),
    }
}

/// The complete view state applied by the task collection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub status: StatusFilter,
    /// Exact, case-sensitive tag name
    pub tag: Option<String>,
    pub date_range: DateRange,
    /// Case-insensitive substring over title, description and tag names
    pub search: String,
    pub sort: SortMode,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    fn matches_tag(&self, task: &Task) -> bool {
        match self.tag.as_deref() {
            None | Some("") => true,
            Some(tag) => task.has_tag(tag),
        }
    }

    fn matches_search(&self, task: &Task) -> bool {
        let keyword = self.search.trim().to_lowercase();
        if keyword.is_empty() {
            return true;
        }
        task.title.to_lowercase().contains(&keyword)
            || task.description.to_lowercase().contains(&keyword)
            || task
                .tags
                .iter()
                .any(|t| t.name.to_lowercase().contains(&keyword))
    }

    /// Whether `task` passes every predicate
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        self.status.matches(task)
            && self.matches_tag(task)
            && self.date_range.contains(task.due_date, today)
            && self.matches_search(task)
    }

    /// Filter then sort
    pub fn apply<'a>(&self, tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
        let mut filtered: Vec<&Task> = tasks.iter().filter(|t| self.matches(t, today)).collect();
        sort_tasks(&mut filtered, self.sort);
        filtered
    }
}
