pub use crate::models::StorageError;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

pub mod config;
pub mod json;
pub mod sqlite;
#[cfg(test)]
pub(crate) mod test_utils;

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Key holding the serialized task collection.
pub const TASKS_KEY: &str = "todoTasks";
/// Key holding the dark-mode flag.
pub const THEME_KEY: &str = "darkMode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Json,
    Sqlite,
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(StorageType::Json),
            "sqlite" => Ok(StorageType::Sqlite),
            other => Err(StorageError::Storage(format!(
                "Unknown storage type: {}",
                other
            ))),
        }
    }
}

/// Local string-to-string persistence. Values are opaque to the store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Volatile store for tests and embedders that handle persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Storage(format!("Failed to lock memory store: {}", e)))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

pub fn create_storage(
    storage_type: StorageType,
    path: &Path,
) -> Result<Box<dyn KeyValueStore>, StorageError> {
    match storage_type {
        StorageType::Json => {
            let storage = JsonFileStore::new(path);
            Ok(Box::new(storage))
        }
        StorageType::Sqlite => {
            let storage = SqliteStore::open(path)?;
            Ok(Box::new(storage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(storage: &dyn KeyValueStore) {
        assert_eq!(storage.get(TASKS_KEY).unwrap(), None);

        storage.set(TASKS_KEY, "[]").unwrap();
        storage.set(THEME_KEY, "true").unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[]"));

        storage.set(TASKS_KEY, "[1]").unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap().as_deref(), Some("[1]"));

        storage.remove(TASKS_KEY).unwrap();
        assert_eq!(storage.get(TASKS_KEY).unwrap(), None);
        assert_eq!(storage.get(THEME_KEY).unwrap().as_deref(), Some("true"));

        // Removing a missing key is not an error.
        storage.remove("missing").unwrap();
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_storage_factory() {
        let temp_dir = tempfile::tempdir().unwrap();

        let storage = create_storage(StorageType::Json, &temp_dir.path().join("data.json")).unwrap();
        exercise(storage.as_ref());

        let storage = create_storage(StorageType::Sqlite, &temp_dir.path().join("data.db")).unwrap();
        exercise(storage.as_ref());
    }

    #[test]
    fn test_storage_type_parsing() {
        assert_eq!("json".parse::<StorageType>().unwrap(), StorageType::Json);
        assert_eq!("sqlite".parse::<StorageType>().unwrap(), StorageType::Sqlite);
        assert!("csv".parse::<StorageType>().is_err());
    }
}
