use crate::models::{Category, Priority, Task, TaskError};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" | "pending" => Ok(StatusFilter::Active),
            "completed" | "done" => Ok(StatusFilter::Completed),
            _ => Err(TaskError::InvalidStatus(s.to_string())),
        }
    }
}

/// Status, category, priority and search predicates, combined with AND.
/// `None` for category or priority means "all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub status: StatusFilter,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub search: String,
}

impl FilterCriteria {
    fn matches(&self, task: &Task, needle: &str) -> bool {
        (needle.is_empty() || task.matches_text(needle))
            && self.status.matches(task)
            && self.category.map_or(true, |c| task.category == c)
            && self.priority.map_or(true, |p| task.priority == p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    DueDateAsc,
    #[default]
    DueDateDesc,
    Priority,
    Category,
    Status,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::DueDateAsc => "date-asc",
            SortKey::DueDateDesc => "date-desc",
            SortKey::Priority => "priority",
            SortKey::Category => "category",
            SortKey::Status => "status",
        }
    }

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::DueDateAsc => compare_due(a, b, false),
            SortKey::DueDateDesc => compare_due(a, b, true),
            SortKey::Priority => b.priority.rank().cmp(&a.priority.rank()),
            SortKey::Category => a.category.as_str().cmp(b.category.as_str()),
            SortKey::Status => a.completed.cmp(&b.completed),
        }
    }
}

impl FromStr for SortKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "date-asc" | "due-asc" => Ok(SortKey::DueDateAsc),
            "date-desc" | "due-desc" => Ok(SortKey::DueDateDesc),
            "priority" => Ok(SortKey::Priority),
            "category" => Ok(SortKey::Category),
            "status" => Ok(SortKey::Status),
            _ => Err(TaskError::InvalidSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Undated tasks go last in both directions.
fn compare_due(a: &Task, b: &Task, descending: bool) -> Ordering {
    match (a.due_date, b.due_date) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) if descending => y.cmp(&x),
        (Some(x), Some(y)) => x.cmp(&y),
    }
}

/// Filters and sorts a copy of `tasks`; the input is left untouched.
pub fn apply(tasks: &[Task], criteria: &FilterCriteria, sort: SortKey) -> Vec<Task> {
    let needle = criteria.search.to_lowercase();
    let mut selected: Vec<Task> = tasks
        .iter()
        .filter(|task| criteria.matches(task, &needle))
        .cloned()
        .collect();

    // `sort_by` is stable, ties keep collection order.
    selected.sort_by(|a, b| sort.compare(a, b));

    trace!(
        total = tasks.len(),
        selected = selected.len(),
        sort = %sort,
        "applied query"
    );
    selected
}
