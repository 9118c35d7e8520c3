use crate::config::ConfigManager;
use crate::storage::config::ConfigStorage;
use crate::storage::json::JsonFileStore;
use crate::storage::{KeyValueStore, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

/// Hands the same backend to a store under test and to the assertions.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<dyn KeyValueStore>,
}

impl SharedStore {
    pub fn new(storage: Box<dyn KeyValueStore>) -> Self {
        Self {
            inner: Arc::from(storage),
        }
    }
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

fn temp_dir() -> TempDir {
    tempfile::Builder::new()
        .prefix("taskdeck_test")
        .tempdir()
        .expect("Failed to create temporary directory")
}

/// Creates a test configuration manager that uses a temporary directory for both config and data storage.
/// This ensures that tests don't interfere with the user's actual configuration and data.
pub fn create_test_config_manager() -> (ConfigManager, TempDir) {
    let temp_dir = temp_dir();
    let storage_path = temp_dir
        .path()
        .join("test-data.json")
        .to_str()
        .unwrap()
        .to_string();

    let storage = ConfigStorage::new(temp_dir.path().join("config.json"));
    let mut config_manager =
        ConfigManager::with_storage(storage).expect("Failed to create config manager");
    config_manager
        .set("storage.path", &storage_path)
        .expect("Failed to set storage.path");

    (config_manager, temp_dir)
}

pub fn create_test_storage() -> (Box<dyn KeyValueStore>, TempDir) {
    let temp_dir = temp_dir();
    let storage = Box::new(JsonFileStore::new(temp_dir.path().join("test.json")));
    (storage, temp_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TASKS_KEY;

    #[test]
    fn test_storage_initialization() {
        let (storage, _temp_dir) = create_test_storage();
        assert_eq!(storage.get(TASKS_KEY).expect("Failed to load storage"), None);
    }

    #[test]
    fn test_shared_store_sees_writes() {
        let (storage, _temp_dir) = create_test_storage();
        let shared = SharedStore::new(storage);
        let other = shared.clone();

        shared.set(TASKS_KEY, "[]").unwrap();
        assert_eq!(other.get(TASKS_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_config_manager() {
        let (config_manager, _temp_dir) = create_test_config_manager();

        // Verify storage path is set to our temporary file
        let storage_path = config_manager
            .get("storage.path")
            .expect("Storage path not set");
        assert!(storage_path.contains("taskdeck_test"));

        // Verify we can get the storage
        let storage = config_manager.create_storage().unwrap();
        assert!(storage.get(TASKS_KEY).is_ok());
    }
}
