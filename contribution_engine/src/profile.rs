//! Saved calculation profiles.
//!
//! The engine never persists anything itself.  A hosting application
//! that wants to keep named quotes around goes through a
//! [`ProfileStore`], a plain key-value store keyed by profile name.

use crate::models::SavedProfile;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Key-value storage for [`SavedProfile`]s.
pub trait ProfileStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<SavedProfile>>;
    /// Inserts or replaces the profile with the same name.
    fn set(&mut self, profile: SavedProfile) -> Result<()>;
    /// All profiles ordered by name.
    fn list(&self) -> Result<Vec<SavedProfile>>;
    /// Returns whether a profile was removed.
    fn delete(&mut self, name: &str) -> Result<bool>;
}

/// In-memory store, mostly useful for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<String, SavedProfile>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn get(&self, name: &str) -> Result<Option<SavedProfile>> {
        Ok(self.profiles.get(name).cloned())
    }

    fn set(&mut self, profile: SavedProfile) -> Result<()> {
        self.profiles.insert(profile.name.clone(), profile);
        Ok(())
    }

    fn list(&self) -> Result<Vec<SavedProfile>> {
        let mut profiles: Vec<_> = self.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(profiles)
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        Ok(self.profiles.remove(name).is_some())
    }
}

/// Store backed by a single JSON file holding a name → profile map.
///
/// The whole file is read on every call and rewritten on every
/// mutation.  A file that does not exist yet is treated as empty.
#[derive(Debug, Clone)]
pub struct JsonFileProfileStore {
    path: PathBuf,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, SavedProfile>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading profiles {:?}", self.path))?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).with_context(|| format!("parsing profiles {:?}", self.path))
    }

    /// Writes to a temporary file next to the target and renames it over
    /// the target, so an interrupted save leaves the previous file intact.
    fn save(&self, profiles: &BTreeMap<String, SavedProfile>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temporary profile file in {:?}", dir))?;
        serde_json::to_writer_pretty(&mut file, profiles)?;
        file.flush()?;
        file.persist(&self.path)
            .with_context(|| format!("writing profiles {:?}", self.path))?;
        debug!(path = %self.path.display(), count = profiles.len(), "saved profiles");
        Ok(())
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn get(&self, name: &str) -> Result<Option<SavedProfile>> {
        Ok(self.load()?.remove(name))
    }

    fn set(&mut self, profile: SavedProfile) -> Result<()> {
        let mut profiles = self.load()?;
        profiles.insert(profile.name.clone(), profile);
        self.save(&profiles)
    }

    fn list(&self) -> Result<Vec<SavedProfile>> {
        Ok(self.load()?.into_values().collect())
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        let mut profiles = self.load()?;
        let removed = profiles.remove(name).is_some();
        if removed {
            self.save(&profiles)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationInput, Modality};
    use rust_decimal_macros::dec;

    fn exercise(store: &mut dyn ProfileStore) {
        assert!(store.get("ana").unwrap().is_none());

        let mut input = CalculationInput::default();
        input.modality = Modality::Dependent;
        input.contribution_base = dec!(1800000);
        store.set(SavedProfile::new("ana", input.clone())).unwrap();
        store
            .set(SavedProfile::new("bruno", CalculationInput::default()))
            .unwrap();

        let ana = store.get("ana").unwrap().unwrap();
        assert_eq!(ana.input, input);

        let names: Vec<String> = store.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["ana", "bruno"]);

        // Replacing keeps a single entry per name.
        store
            .set(SavedProfile::new("ana", CalculationInput::default()))
            .unwrap();
        assert_eq!(store.list().unwrap().len(), 2);

        assert!(store.delete("ana").unwrap());
        assert!(!store.delete("ana").unwrap());
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store() {
        exercise(&mut MemoryProfileStore::new());
    }

    #[test]
    fn test_json_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        let mut store = JsonFileProfileStore::new(&path);
        exercise(&mut store);

        // A second handle on the same file sees the persisted state.
        let reopened = JsonFileProfileStore::new(&path);
        let names: Vec<String> = reopened.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["bruno"]);
    }

    #[test]
    fn test_json_file_store_replaces_file_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        std::fs::write(&path, "{}").unwrap();

        let mut store = JsonFileProfileStore::new(&path);
        store
            .set(SavedProfile::new("carla", CalculationInput::default()))
            .unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("profiles.json")]);

        let stored: BTreeMap<String, SavedProfile> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(stored.contains_key("carla"));
    }
}
