use crate::filter::SortKey;
use crate::models::{Category, Priority, StorageError};
use crate::storage::config::{ConfigStorage, StorageConfig};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Overrides the configuration file location.
pub const CONFIG_ENV: &str = "TASKDECK_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<StorageError> for ConfigError {
    fn from(error: StorageError) -> Self {
        ConfigError::Storage(error.to_string())
    }
}

const VALID_STORAGE_TYPES: &[&str] = &["json", "sqlite"];
const VALID_PRIORITIES: &[&str] = &["high", "medium", "low"];
const VALID_CATEGORIES: &[&str] = &["personal", "work", "shopping", "health", "other"];
const VALID_SORT_KEYS: &[&str] = &["date-asc", "date-desc", "priority", "category", "status"];

pub const KEYS: &[&str] = &[
    "storage.type",
    "storage.path",
    "default-category",
    "default-priority",
    "default-sort",
];

fn validate_storage_path(path: &str) -> Result<PathBuf, ConfigError> {
    // Check for null bytes and other invalid characters
    if path.contains('\0') {
        return Err(ConfigError::InvalidConfig(
            "Path contains invalid characters".to_string(),
        ));
    }

    let path = shellexpand::tilde(path);
    let path = PathBuf::from(path.as_ref());

    if path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "Path cannot be empty".to_string(),
        ));
    }

    // Check if parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ConfigError::InvalidConfig(format!(
                "Parent directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(path)
}

fn validate_choice(key: &str, value: &str, valid: &[&str]) -> Result<(), ConfigError> {
    if !valid.contains(&value) {
        return Err(ConfigError::InvalidConfig(format!(
            "{} must be one of: {}",
            key,
            valid.join(", ")
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub storage_path: Option<String>,
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub default_priority: Option<String>,
    #[serde(default)]
    pub default_sort: Option<String>,
}

impl Config {
    pub fn with_defaults() -> Self {
        Self {
            storage_type: default_storage_type(),
            storage_path: default_storage_path(),
            default_category: default_category(),
            default_priority: default_priority(),
            default_sort: default_sort(),
        }
    }

    /// Fills every unset value from [`Config::with_defaults`].
    pub fn merged_with_defaults(&self) -> Self {
        let defaults = Self::with_defaults();
        Self {
            storage_type: self.storage_type.clone().or(defaults.storage_type),
            storage_path: self.storage_path.clone().or(defaults.storage_path),
            default_category: self.default_category.clone().or(defaults.default_category),
            default_priority: self.default_priority.clone().or(defaults.default_priority),
            default_sort: self.default_sort.clone().or(defaults.default_sort),
        }
    }

    pub fn category(&self) -> Category {
        self.default_category
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn priority(&self) -> Priority {
        self.default_priority
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    pub fn sort(&self) -> SortKey {
        self.default_sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref storage_type) = self.storage_type {
            validate_choice("storage.type", storage_type, VALID_STORAGE_TYPES)?;
        }
        if let Some(ref category) = self.default_category {
            validate_choice("default-category", category, VALID_CATEGORIES)?;
        }
        if let Some(ref priority) = self.default_priority {
            validate_choice("default-priority", priority, VALID_PRIORITIES)?;
        }
        if let Some(ref sort) = self.default_sort {
            validate_choice("default-sort", sort, VALID_SORT_KEYS)?;
        }
        Ok(())
    }

    fn value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match key {
            "storage.type" => Ok(self.storage_type.clone()),
            "storage.path" => Ok(self.storage_path.clone()),
            "default-category" => Ok(self.default_category.clone()),
            "default-priority" => Ok(self.default_priority.clone()),
            "default-sort" => Ok(self.default_sort.clone()),
            _ => Err(ConfigError::InvalidKey(key.to_string())),
        }
    }
}

fn default_storage_type() -> Option<String> {
    Some("json".to_string())
}

fn default_storage_path() -> Option<String> {
    dirs::home_dir().map(|home| {
        home.join(".config")
            .join("taskdeck")
            .join("data.json")
            .to_string_lossy()
            .to_string()
    })
}

fn default_category() -> Option<String> {
    Some("personal".to_string())
}

fn default_priority() -> Option<String> {
    Some("low".to_string())
}

fn default_sort() -> Option<String> {
    Some("date-desc".to_string())
}

/// `explicit`, then `$TASKDECK_CONFIG`, then `~/.config/taskdeck/config.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("taskdeck").join("config.json"))
        .ok_or_else(|| {
            ConfigError::InvalidConfig("Could not determine home directory".to_string())
        })
}

pub struct ConfigManager {
    storage: ConfigStorage,
    config: Config,
}

impl ConfigManager {
    pub fn new(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = resolve_config_path(config_path)?;
        Self::with_storage(ConfigStorage::new(path))
    }

    pub fn with_storage(storage: ConfigStorage) -> Result<Self, ConfigError> {
        let config = match storage.load() {
            Ok(config) => config,
            Err(StorageError::Serialization(e)) => {
                warn!(path = %storage.path().display(), error = %e, "config file is malformed, using defaults");
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %storage.path().display(), "loaded config");

        Ok(Self { storage, config })
    }

    /// Values set in the config file, without defaults.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Values in effect: the file's, with defaults for the rest.
    pub fn effective(&self) -> Config {
        self.config.merged_with_defaults()
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.storage.save(&self.config)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.effective().value(key).ok().flatten()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut config = self.config.clone();

        match key {
            "storage.type" => {
                validate_choice(key, value, VALID_STORAGE_TYPES)?;
                if config.storage_type.as_deref() != Some(value) {
                    warn!("Changing storage type does not migrate existing tasks");
                }
                config.storage_type = Some(value.to_string());
            }
            "storage.path" => {
                let path = validate_storage_path(value)?;
                config.storage_path = Some(path.to_string_lossy().to_string());
            }
            "default-category" => {
                validate_choice(key, value, VALID_CATEGORIES)?;
                config.default_category = Some(value.to_string());
            }
            "default-priority" => {
                validate_choice(key, value, VALID_PRIORITIES)?;
                config.default_priority = Some(value.to_string());
            }
            "default-sort" => {
                validate_choice(key, value, VALID_SORT_KEYS)?;
                config.default_sort = Some(value.to_string());
            }
            _ => {
                return Err(ConfigError::InvalidKey(key.to_string()));
            }
        }
        config.validate()?;
        self.config = config;
        self.save()
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "storage.type" => self.config.storage_type = None,
            "storage.path" => self.config.storage_path = None,
            "default-category" => self.config.default_category = None,
            "default-priority" => self.config.default_priority = None,
            "default-sort" => self.config.default_sort = None,
            _ => return Err(ConfigError::InvalidKey(key.to_string())),
        }
        self.save()
    }

    /// Every key with its effective value and whether that value is a default.
    pub fn list(&self) -> Vec<(String, String, bool)> {
        let effective = self.effective();
        KEYS.iter()
            .map(|key| {
                let is_default = matches!(self.config.value(key), Ok(None));
                let value = effective
                    .value(key)
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "null".to_string());
                (key.to_string(), value, is_default)
            })
            .collect()
    }

    pub fn storage_config(&self) -> Result<StorageConfig, StorageError> {
        StorageConfig::from_config(&self.effective())
    }

    pub fn create_storage(&self) -> Result<Box<dyn KeyValueStore>, StorageError> {
        self.storage_config()?.open()
    }
}
