//! JSON file storage backend
//!
//! Keeps every value in a single JSON object. Each write replaces the file
//! through a sibling temp file and a rename so readers never see a
//! half-written document.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{ClientStorage, StorageError, StorageResult};

type Entries = BTreeMap<String, String>;

/// File-backed storage
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Create storage backed by `path`; the file is created on first write
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                StorageError::Corrupt(format!("{}: {e}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, entries: &Entries) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let contents = serde_json::to_vec_pretty(entries)?;
        if let Err(err) = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, &self.path)) {
            // Don't leave a stray temp file next to the session.
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        debug!(path = %self.path.display(), entries = entries.len(), "storage file written");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Entries) -> bool) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if apply(&mut entries) {
            self.save(&entries)?;
        }
        Ok(())
    }
}

impl ClientStorage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn remove_all(&self, keys: &[&str]) -> StorageResult<()> {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|k, _| !keys.contains(&k.as_str()));
            entries.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));

        assert_eq!(storage.get("access_token").unwrap(), None);
        storage.remove("access_token").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn values_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path).set("username", "analyst").unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(reopened.get("username").unwrap().as_deref(), Some("analyst"));
    }

    #[test]
    fn remove_all_rewrites_once_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("session.json"));
        storage.set("access_token", "a").unwrap();
        storage.set("refresh_token", "r").unwrap();
        storage.set("theme", "dark").unwrap();

        storage.remove_all(&["access_token", "refresh_token"]).unwrap();

        assert_eq!(storage.get("access_token").unwrap(), None);
        assert_eq!(storage.get("refresh_token").unwrap(), None);
        assert_eq!(storage.get("theme").unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory at the target path makes the rename fail.
        let path = dir.path().join("session.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let storage = FileStorage::new(&path);
        let mut entries = Entries::new();
        entries.insert("theme".into(), "dark".into());

        assert!(storage.save(&entries).is_err());
        assert!(!dir.path().join("session.json.tmp").exists());
        assert!(path.is_dir());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.get("theme"), Err(StorageError::Corrupt(_))));
    }
}
