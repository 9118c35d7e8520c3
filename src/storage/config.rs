use super::{create_storage, KeyValueStore, StorageError, StorageType};
use crate::config::Config;
use std::path::{Path, PathBuf};

/// Where and how task data is kept, resolved from a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub storage_type: StorageType,
    pub storage_path: PathBuf,
}

impl StorageConfig {
    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        let storage_type = config
            .storage_type
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(StorageType::Json);

        let storage_path = config
            .storage_path
            .as_deref()
            .map(|s| PathBuf::from(shellexpand::tilde(s).to_string()))
            .ok_or_else(|| StorageError::Storage("Storage path not configured".to_string()))?;

        Ok(Self {
            storage_type,
            storage_path,
        })
    }

    pub fn open(&self) -> Result<Box<dyn KeyValueStore>, StorageError> {
        create_storage(self.storage_type, &self.storage_path)
    }
}

/// Reads and writes the configuration file itself.
#[derive(Debug)]
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, config: &Config) -> Result<(), StorageError> {
        // Create parent directories if they don't exist
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn load(&self) -> Result<Config, StorageError> {
        if !self.path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;

        // If the file is empty, return default config
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }

        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_utils::create_test_config_manager;

    #[test]
    fn test_storage_config_from_manager() {
        let (manager, temp_dir) = create_test_config_manager();
        let config = StorageConfig::from_config(manager.config()).unwrap();
        assert_eq!(config.storage_type, StorageType::Json);
        assert_eq!(config.storage_path, temp_dir.path().join("test-data.json"));
    }

    #[test]
    fn test_storage_config_from_manager_with_custom_type() {
        let (mut manager, temp_dir) = create_test_config_manager();
        manager.set("storage.type", "sqlite").unwrap();
        let config = StorageConfig::from_config(manager.config()).unwrap();
        assert_eq!(config.storage_type, StorageType::Sqlite);
        assert_eq!(config.storage_path, temp_dir.path().join("test-data.json"));
    }

    #[test]
    fn test_storage_config_with_invalid_type() {
        let config = Config {
            storage_type: Some("invalid".to_string()),
            storage_path: Some("/tmp/data.json".to_string()),
            ..Default::default()
        };
        assert!(StorageConfig::from_config(&config).is_err());
    }

    #[test]
    fn test_storage_config_requires_path() {
        let config = Config::default();
        assert!(StorageConfig::from_config(&config).is_err());
    }

    #[test]
    fn test_config_storage_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = ConfigStorage::new(temp_dir.path().join("cfg").join("config.json"));
        assert!(!storage.path().exists());
        assert!(storage.load().unwrap().storage_type.is_none());

        let config = Config::with_defaults();
        storage.save(&config).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.storage_type, config.storage_type);
        assert_eq!(loaded.default_priority, config.default_priority);
    }
}
