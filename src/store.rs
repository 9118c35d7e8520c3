use crate::filter::{self, FilterCriteria, SortKey};
use crate::models::{Category, Priority, StorageError, Task, TaskError, TaskId, TaskPatch};
use crate::storage::{KeyValueStore, TASKS_KEY};
use crate::view::Stats;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Largest identifier the store hands out or accepts from storage, the
/// biggest integer a JSON number holds exactly in most readers.
pub const MAX_TASK_ID: TaskId = (1 << 53) - 1;

/// Asked before anything is deleted.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// `true` means the caller already confirmed, `false` declines every prompt.
impl Confirm for bool {
    fn confirm(&mut self, _prompt: &str) -> bool {
        *self
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Owns the task collection and writes all of it back after every change.
pub struct TaskStore {
    storage: Box<dyn KeyValueStore>,
    tasks: Vec<Task>,
    last_id: TaskId,
}

impl TaskStore {
    /// Loads the collection once. Missing or unreadable data gives an empty store.
    pub fn open(storage: Box<dyn KeyValueStore>) -> Self {
        let tasks = load_tasks(storage.as_ref());
        let last_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        info!(count = tasks.len(), "opened task store");

        Self {
            storage,
            tasks,
            last_id,
        }
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        &*self.storage
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn add(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Category,
        priority: Priority,
    ) -> Result<Task, TaskError> {
        self.add_at(Utc::now(), text, due_date, category, priority)
    }

    /// Same as [`TaskStore::add`] with an explicit creation time.
    pub fn add_at(
        &mut self,
        now: DateTime<Utc>,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Category,
        priority: Priority,
    ) -> Result<Task, TaskError> {
        let id = self.next_id(now)?;
        let task = Task::new(id, text, due_date, category, priority, now)?;

        self.last_id = id;
        self.tasks.push(task.clone());
        debug!(id, "added task");
        self.persist();
        Ok(task)
    }

    pub fn edit(&mut self, id: TaskId, patch: &TaskPatch) -> Result<Task, TaskError> {
        let task = self.find_mut(id)?;
        task.apply(patch)?;
        let updated = task.clone();

        debug!(id, "edited task");
        self.persist();
        Ok(updated)
    }

    pub fn toggle_completion(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let task = self.find_mut(id)?;
        task.toggle();
        let updated = task.clone();

        debug!(id, completed = updated.completed, "toggled task");
        self.persist();
        Ok(updated)
    }

    pub fn remove(&mut self, id: TaskId, mut confirm: impl Confirm) -> Result<Task, TaskError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?;

        if !confirm.confirm("Are you sure you want to delete this task?") {
            debug!(id, "removal declined");
            return Err(TaskError::Cancelled);
        }

        let removed = self.tasks.remove(idx);
        debug!(id, "removed task");
        self.persist();
        Ok(removed)
    }

    /// Returns how many tasks were dropped; nothing is asked when none are completed.
    pub fn remove_all_completed(&mut self, mut confirm: impl Confirm) -> usize {
        let count = self.tasks.iter().filter(|t| t.completed).count();
        if count == 0 {
            return 0;
        }

        let prompt = format!(
            "Are you sure you want to delete {} completed task(s)?",
            count
        );
        if !confirm.confirm(&prompt) {
            debug!(count, "bulk removal declined");
            return 0;
        }

        self.tasks.retain(|t| !t.completed);
        debug!(count, "removed completed tasks");
        self.persist();
        count
    }

    pub fn query(&self, criteria: &FilterCriteria, sort: SortKey) -> Vec<Task> {
        filter::apply(&self.tasks, criteria, sort)
    }

    pub fn stats(&self) -> Stats {
        Stats::from_tasks(&self.tasks)
    }

    fn find_mut(&mut self, id: TaskId) -> Result<&mut Task, TaskError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))
    }

    // Millisecond timestamps, bumped past the last id when the clock hasn't moved.
    fn next_id(&self, now: DateTime<Utc>) -> Result<TaskId, TaskError> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last_id.saturating_add(1));
        if id > MAX_TASK_ID {
            return Err(TaskError::IdsExhausted);
        }
        Ok(id)
    }

    fn persist(&self) {
        if let Err(e) = save_tasks(self.storage.as_ref(), &self.tasks) {
            error!(error = %e, "failed to persist tasks");
        }
    }
}

pub fn save_tasks(storage: &dyn KeyValueStore, tasks: &[Task]) -> Result<(), StorageError> {
    let json = serde_json::to_string(tasks)?;
    storage.set(TASKS_KEY, &json)
}

/// Reads the stored collection, falling back to an empty one on any failure.
/// Records breaking the task invariants are skipped.
pub fn load_tasks(storage: &dyn KeyValueStore) -> Vec<Task> {
    let raw = match storage.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "could not read stored tasks, starting empty");
            return Vec::new();
        }
    };

    let parsed: Vec<Task> = match serde_json::from_str(&raw) {
        Ok(tasks) => tasks,
        Err(e) => {
            warn!(error = %e, "stored tasks are malformed, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    parsed
        .into_iter()
        .filter(|task| {
            if task.text.trim().is_empty() {
                warn!(id = task.id, "skipping stored task with empty text");
                return false;
            }
            if task.id > MAX_TASK_ID {
                warn!(id = task.id, "skipping stored task with out-of-range id");
                return false;
            }
            if !seen.insert(task.id) {
                warn!(id = task.id, "skipping stored task with duplicate id");
                return false;
            }
            true
        })
        .collect()
}
