use crate::storage::{KeyValueStore, THEME_KEY};
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preferences {
    dark_mode: bool,
}

impl Preferences {
    /// Absent or unreadable values fall back to the light theme.
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let dark_mode = match storage.get(THEME_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<bool>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "stored theme preference is malformed");
                false
            }),
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "could not read theme preference");
                false
            }
        };
        Self { dark_mode }
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn theme_name(&self) -> &'static str {
        if self.dark_mode {
            "dark"
        } else {
            "light"
        }
    }

    pub fn set_dark_mode(&mut self, storage: &dyn KeyValueStore, dark_mode: bool) {
        self.dark_mode = dark_mode;
        if let Err(e) = storage.set(THEME_KEY, if dark_mode { "true" } else { "false" }) {
            error!(error = %e, "failed to persist theme preference");
        }
    }

    pub fn toggle_dark_mode(&mut self, storage: &dyn KeyValueStore) -> bool {
        self.set_dark_mode(storage, !self.dark_mode);
        self.dark_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_to_light() {
        let storage = MemoryStore::new();
        assert!(!Preferences::load(&storage).dark_mode());

        storage.set(THEME_KEY, "maybe").unwrap();
        assert!(!Preferences::load(&storage).dark_mode());
    }

    #[test]
    fn test_toggle_persists() {
        let storage = MemoryStore::new();
        let mut prefs = Preferences::load(&storage);

        assert!(prefs.toggle_dark_mode(&storage));
        assert_eq!(storage.get(THEME_KEY).unwrap().as_deref(), Some("true"));
        assert!(Preferences::load(&storage).dark_mode());
        assert_eq!(prefs.theme_name(), "dark");

        assert!(!prefs.toggle_dark_mode(&storage));
        assert!(!Preferences::load(&storage).dark_mode());
    }
}
