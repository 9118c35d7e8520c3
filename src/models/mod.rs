use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type TaskId = u64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(rename = "date", default)]
    pub due_date: Option<NaiveDate>,
    pub category: Category,
    pub priority: Priority,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds a fresh, incomplete task. The identifier is assigned by the store.
    pub fn new(
        id: TaskId,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Category,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TaskError> {
        let text = validate_text(text)?;

        Ok(Self {
            id,
            text,
            due_date,
            category,
            priority,
            completed: false,
            created_at,
        })
    }

    pub fn toggle(&mut self) {
        self.completed = !self.completed;
    }

    pub fn update_text(&mut self, new_text: &str) -> Result<(), TaskError> {
        self.text = validate_text(new_text)?;
        Ok(())
    }

    pub fn set_due_date(&mut self, due_date: Option<NaiveDate>) {
        self.due_date = due_date;
    }

    pub fn set_category(&mut self, category: Category) {
        self.category = category;
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Applies every field present in `patch`. Text is checked first so a
    /// rejected patch leaves the task untouched.
    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), TaskError> {
        if let Some(ref text) = patch.text {
            self.update_text(text)?;
        }
        if let Some(due_date) = patch.due_date {
            self.set_due_date(due_date);
        }
        if let Some(category) = patch.category {
            self.set_category(category);
        }
        if let Some(priority) = patch.priority {
            self.set_priority(priority);
        }
        Ok(())
    }

    /// A due date strictly before `today` on a task that is still open.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date.map_or(false, |due| due < today)
    }

    pub fn matches_text(&self, needle_lowercase: &str) -> bool {
        self.text.to_lowercase().contains(needle_lowercase)
    }
}

fn validate_text(text: &str) -> Result<String, TaskError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TaskError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Fields to change on an existing task; `None` leaves a field as it is.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskPatch {
    pub text: Option<String>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<NaiveDate>>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.due_date.is_none()
            && self.category.is_none()
            && self.priority.is_none()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task text cannot be empty")]
    EmptyText,
    #[error("Task not found: {0}")]
    NotFound(TaskId),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Invalid priority value: {0}")]
    InvalidPriority(String),
    #[error("Invalid category value: {0}")]
    InvalidCategory(String),
    #[error("Invalid due date: {0}")]
    InvalidDueDate(String),
    #[error("Invalid status filter: {0}")]
    InvalidStatus(String),
    #[error("Invalid sort key: {0}")]
    InvalidSortKey(String),
    #[error("No task ids left to assign")]
    IdsExhausted,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Shopping,
    Health,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Personal,
        Category::Work,
        Category::Shopping,
        Category::Health,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Personal => "personal",
            Category::Work => "work",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Personal => "Personal",
            Category::Work => "Work",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| TaskError::InvalidCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Sort weight; higher means more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(TaskError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the `YYYY-MM-DD` form used for due dates.
pub fn parse_due_date(s: &str) -> Result<NaiveDate, TaskError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TaskError::InvalidDueDate(s.to_string()))
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task::new(
            1,
            "  Buy milk  ",
            None,
            Category::Shopping,
            Priority::Low,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_task_trims_text() {
        let task = sample_task();
        assert_eq!(task.text, "Buy milk");
        assert!(!task.completed);
    }

    #[test]
    fn test_new_task_rejects_blank_text() {
        let result = Task::new(1, " \t ", None, Category::Work, Priority::High, Utc::now());
        assert_eq!(result.unwrap_err(), TaskError::EmptyText);
    }

    #[test]
    fn test_apply_patch_only_touches_given_fields() {
        let mut task = sample_task();
        let due = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let patch = TaskPatch {
            due_date: Some(Some(due)),
            priority: Some(Priority::High),
            ..Default::default()
        };
        task.apply(&patch).unwrap();

        assert_eq!(task.text, "Buy milk");
        assert_eq!(task.category, Category::Shopping);
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.due_date, Some(due));
    }

    #[test]
    fn test_rejected_patch_leaves_task_untouched() {
        let mut task = sample_task();
        let before = task.clone();
        let patch = TaskPatch {
            text: Some("   ".to_string()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert_eq!(task.apply(&patch), Err(TaskError::EmptyText));
        assert_eq!(task, before);
    }

    #[test]
    fn test_overdue_requires_past_date_and_open_task() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut task = sample_task();
        assert!(!task.is_overdue(today));

        task.set_due_date(today.pred_opt());
        assert!(task.is_overdue(today));

        task.set_due_date(Some(today));
        assert!(!task.is_overdue(today));

        task.set_due_date(today.pred_opt());
        task.toggle();
        assert!(!task.is_overdue(today));
    }

    #[test]
    fn test_priority_and_category_parsing() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!(matches!(
            "urgent".parse::<Priority>(),
            Err(TaskError::InvalidPriority(_))
        ));
        assert_eq!("Health".parse::<Category>().unwrap(), Category::Health);
        assert!(matches!(
            "garden".parse::<Category>(),
            Err(TaskError::InvalidCategory(_))
        ));
    }

    #[test]
    fn test_record_layout_field_names() {
        let mut task = sample_task();
        task.set_due_date(NaiveDate::from_ymd_opt(2026, 1, 2));
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["text"], "Buy milk");
        assert_eq!(json["date"], "2026-01-02");
        assert_eq!(json["category"], "shopping");
        assert_eq!(json["priority"], "low");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_parse_due_date() {
        assert_eq!(
            parse_due_date("2026-02-28").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 28).unwrap()
        );
        assert!(parse_due_date("2026-02-30").is_err());
    }
}
