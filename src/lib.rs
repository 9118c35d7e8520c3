//! Local task list manager: an owned task collection with filter, sort and
//! render helpers, persisted in a small key-value store.

pub mod cli;
pub mod config;
pub mod filter;
pub mod models;
pub mod preferences;
pub mod storage;
pub mod store;
pub mod view;

pub use filter::{FilterCriteria, SortKey, StatusFilter};
pub use models::{Category, Priority, Task, TaskError, TaskId, TaskPatch};
pub use store::{Confirm, TaskStore};
