//! Saved presets, persisted as one JSON list.

use std::sync::Arc;

use tracing::info;

use super::types::Preset;
use crate::error::{EditError, StoreError};
use crate::storage::{keys, load_json, save_json, KeyValueStore};

pub struct PresetLibrary {
    store: Arc<dyn KeyValueStore>,
}

impl PresetLibrary {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<Preset>, StoreError> {
        Ok(load_json(self.store.as_ref(), keys::PRESETS)?.unwrap_or_default())
    }

    pub fn get(&self, name: &str) -> Result<Option<Preset>, StoreError> {
        Ok(self.list()?.into_iter().find(|p| p.name == name.trim()))
    }

    /// Save `preset`. Names are unique: an existing preset with the same
    /// name is replaced in place. Returns `true` if one was replaced.
    pub fn save(&self, mut preset: Preset) -> Result<bool, EditError> {
        preset.name = preset.name.trim().to_string();
        if preset.name.is_empty() {
            return Err(EditError::UnnamedPreset);
        }
        if preset.is_empty() {
            return Err(EditError::EmptyPreset);
        }

        let mut presets = self.list()?;
        let replaced = match presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => {
                *existing = preset;
                true
            }
            None => {
                presets.push(preset);
                false
            }
        };
        save_json(self.store.as_ref(), keys::PRESETS, &presets)?;
        info!("Saved preset library ({} presets, replaced={})", presets.len(), replaced);
        Ok(replaced)
    }

    /// Returns `false` if no preset had that name.
    pub fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut presets = self.list()?;
        let before = presets.len();
        presets.retain(|p| p.name != name.trim());
        if presets.len() == before {
            return Ok(false);
        }
        save_json(self.store.as_ref(), keys::PRESETS, &presets)?;
        info!("Deleted preset '{}'", name.trim());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, SqliteStore};

    #[test]
    fn test_save_list_get_delete() {
        let library = PresetLibrary::new(Arc::new(MemoryStore::new()));
        assert!(library.list().unwrap().is_empty());

        assert!(!library.save(Preset::new("warm", ["warmer"])).unwrap());
        assert!(!library.save(Preset::new("noir", ["noir", "grain"])).unwrap());

        let names: Vec<_> = library.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["warm", "noir"]);
        assert_eq!(library.get("noir").unwrap().unwrap().len(), 2);

        assert!(library.delete("warm").unwrap());
        assert!(!library.delete("warm").unwrap());
        assert!(library.get("warm").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let library = PresetLibrary::new(Arc::new(MemoryStore::new()));
        library.save(Preset::new("a", ["one"])).unwrap();
        library.save(Preset::new("b", ["two"])).unwrap();

        assert!(library.save(Preset::new(" a ", ["three"])).unwrap());
        let presets = library.list().unwrap();
        assert_eq!(presets.len(), 2);
        assert_eq!(presets[0], Preset::new("a", ["three"]));
    }

    #[test]
    fn test_rejects_unnamed_and_empty() {
        let library = PresetLibrary::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            library.save(Preset::new("  ", ["one"])).unwrap_err(),
            EditError::UnnamedPreset
        );
        assert_eq!(
            library.save(Preset::new("x", Vec::<String>::new())).unwrap_err(),
            EditError::EmptyPreset
        );
    }

    #[test]
    fn test_persists_in_sqlite() {
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
        PresetLibrary::new(store.clone())
            .save(Preset::new("warm", ["warmer"]))
            .unwrap();
        let reopened = PresetLibrary::new(store);
        assert_eq!(reopened.list().unwrap().len(), 1);
    }
}
