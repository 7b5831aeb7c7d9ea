//! A [`SaveStore`] that keeps one file per key in a directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use harvest_core::save::{SaveStore, StoreError};

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Unavailable(format!("invalid key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SaveStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file first, then renames over the target.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::save::{SAVE_KEY, load_from_store, save_to_store};
    use harvest_core::skill::SkillCatalog;
    use harvest_core::state::GameState;
    use harvest_core::test_utils::big;

    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "harvest_store_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn get_set_remove() {
        let dir = make_test_dir("basic");
        let mut store = FileStore::open(&dir).unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
        store.set("slot", "{}").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("{}"));
        assert!(dir.join("slot.json").exists());
        store.set("slot", "[1]").unwrap();
        assert_eq!(store.get("slot").unwrap().as_deref(), Some("[1]"));
        store.remove("slot").unwrap();
        store.remove("slot").unwrap();
        assert_eq!(store.get("slot").unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn path_like_keys_are_refused() {
        let dir = make_test_dir("keys");
        let mut store = FileStore::open(&dir).unwrap();
        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(store.set(key, "x"), Err(StoreError::Unavailable(_))));
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn game_state_survives_reopen() {
        let dir = make_test_dir("reopen");
        let mut state = GameState::new();
        state.wheat = big("4.2e51");
        state.upgrades.insert("mill_eff_1".into(), 3);
        {
            let mut store = FileStore::open(&dir).unwrap();
            save_to_store(&mut store, &state).unwrap();
        }
        let store = FileStore::open(&dir).unwrap();
        assert!(store.get(SAVE_KEY).unwrap().is_some());
        assert_eq!(load_from_store(&store, &SkillCatalog::standard()), state);
        let _ = fs::remove_dir_all(&dir);
    }
}
