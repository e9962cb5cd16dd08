// src/store.rs
use crate::error::{StoreError, StoreResult};
use log;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Key under which the whole user database lives in the persistent store.
pub const USERS_KEY: &str = "luxe_users_db";

/// Flat string key-value storage, the shape of a browser storage area.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> StoreResult<()>;
    fn remove(&mut self, key: &str) -> StoreResult<()>;
}

fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && key != "."
        && key != "..";
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Directory-backed store: every key is one `<key>.json` file.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: &Path) -> StoreResult<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(|e| {
                log::error!("Failed to create store directory {:?}: {:?}", dir, e);
                StoreError::Io(e)
            })?;
            log::info!("Created store directory: {:?}", dir);
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("Key {:?} not present in {:?}", key, self.dir);
                Ok(None)
            }
            Err(e) => {
                log::error!("Failed to read {:?}: {:?}", path, e);
                Err(StoreError::Io(e))
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        // Write beside the target, then rename over it.
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(|e| {
                log::error!("Failed to open file {:?} for writing: {:?}", tmp_path, e);
                StoreError::Io(e)
            })?;
        let written = file.write_all(value.as_bytes()).and_then(|_| file.sync_all());
        drop(file);
        let written = written.and_then(|_| fs::rename(&tmp_path, &path));
        if let Err(e) = written {
            log::error!("Failed to persist key {:?} to {:?}: {:?}", key, path, e);
            let _ = fs::remove_file(&tmp_path);
            return Err(StoreError::Io(e));
        }

        log::debug!("Stored {} bytes under key {:?}", value.len(), key);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Removed key {:?} from {:?}", key, self.dir);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::error!("Failed to remove {:?}: {:?}", path, e);
                Err(StoreError::Io(e))
            }
        }
    }
}

/// In-process store with the same contract as [`FileStore`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        validate_key(key)?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StoreResult<()> {
        validate_key(key)?;
        self.values.remove(key);
        Ok(())
    }
}
