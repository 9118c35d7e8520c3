use super::{KeyValueStore, StorageError};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// Keeps every entry in a single JSON object file.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = PathBuf::from(shellexpand::tilde(&path.as_ref().to_string_lossy()).to_string());
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StorageError> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }

        let entries: Entries = serde_json::from_str(&contents)?;
        Ok(entries)
    }

    // A malformed file is replaced on the next write instead of blocking it.
    fn entries_for_update(&self) -> Result<Entries, StorageError> {
        match self.read_entries() {
            Err(StorageError::Serialization(e)) => {
                warn!(file = %self.path.display(), error = %e, "json store is malformed, overwriting");
                Ok(Entries::new())
            }
            other => other,
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StorageError> {
        // Create parent directories if they don't exist
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };

        let json = serde_json::to_string_pretty(entries)?;
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(json.as_bytes())?;
        temp.flush()?;
        temp.persist(&self.path).map_err(|e| {
            StorageError::Storage(format!("Failed to persist {}: {}", self.path.display(), e))
        })?;

        debug!(file = %self.path.display(), keys = entries.len(), "wrote json store");
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries_for_update()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}
