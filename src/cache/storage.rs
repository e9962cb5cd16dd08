// src/cache/storage.rs
use crate::error::{CacheError, CacheResult};
use chrono::{DateTime, Utc};
use log;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const INDEX_FILE: &str = "index.json";
const BLOB_DIR: &str = "blobs";

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Asset {
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct IndexEntry {
    url: String,
    status: u16,
    content_type: Option<String>,
    blob: String,
    stored_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
struct CacheIndex {
    entries: Vec<IndexEntry>,
}

fn validate_name(name: &str) -> CacheResult<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidName(name.to_string()))
    }
}

/// All caches owned by this installation, one subdirectory per cache name.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn open(root: &Path) -> CacheResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Names of every cache present, sorted.
    pub fn keys(&self) -> CacheResult<Vec<String>> {
        let mut names = Vec::new();
        for dirent in fs::read_dir(&self.root)? {
            let dirent = dirent?;
            if !dirent.file_type()?.is_dir() {
                continue;
            }
            let name = dirent.file_name().to_string_lossy().into_owned();
            if validate_name(&name).is_ok() && dirent.path().join(INDEX_FILE).exists() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn has(&self, name: &str) -> CacheResult<bool> {
        validate_name(name)?;
        Ok(self.root.join(name).join(INDEX_FILE).exists())
    }

    /// Opens the named cache, creating it empty if needed.
    pub fn open_cache(&self, name: &str) -> CacheResult<Cache> {
        validate_name(name)?;
        let dir = self.root.join(name);
        fs::create_dir_all(dir.join(BLOB_DIR))?;
        let cache = Cache { name: name.to_string(), dir };
        if !cache.dir.join(INDEX_FILE).exists() {
            cache.write_index(&CacheIndex::default())?;
            log::debug!("Created cache {:?}", name);
        }
        Ok(cache)
    }

    /// Returns whether a cache by that name existed.
    pub fn delete(&self, name: &str) -> CacheResult<bool> {
        validate_name(name)?;
        match fs::remove_dir_all(self.root.join(name)) {
            Ok(()) => {
                log::info!("Deleted cache {:?}", name);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}

/// One named cache: an index of URL -> blob file.
#[derive(Debug, Clone)]
pub struct Cache {
    name: String,
    dir: PathBuf,
}

impl Cache {
    fn read_index(&self) -> CacheResult<CacheIndex> {
        let raw = fs::read_to_string(self.dir.join(INDEX_FILE))?;
        serde_json::from_str(&raw)
            .map_err(|e| CacheError::Index(format!("Cache {:?} index unreadable: {}", self.name, e)))
    }

    fn write_index(&self, index: &CacheIndex) -> CacheResult<()> {
        let json = serde_json::to_vec_pretty(index)
            .map_err(|e| CacheError::Index(format!("Cache index serialization failed: {}", e)))?;
        let tmp_path = self.dir.join(format!(".{}.{}.tmp", INDEX_FILE, Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, self.dir.join(INDEX_FILE))?;
        Ok(())
    }

    /// Stores `asset`, replacing any earlier entry for the same URL.
    pub fn put(&self, asset: &Asset) -> CacheResult<()> {
        let blob = Uuid::new_v4().to_string();
        fs::write(self.dir.join(BLOB_DIR).join(&blob), &asset.body)?;

        let mut index = self.read_index()?;
        let stale: Vec<String> = index
            .entries
            .iter()
            .filter(|e| e.url == asset.url)
            .map(|e| e.blob.clone())
            .collect();
        index.entries.retain(|e| e.url != asset.url);
        index.entries.push(IndexEntry {
            url: asset.url.clone(),
            status: asset.status,
            content_type: asset.content_type.clone(),
            blob,
            stored_at: Utc::now(),
        });
        self.write_index(&index)?;

        for old in stale {
            let _ = fs::remove_file(self.dir.join(BLOB_DIR).join(old));
        }
        log::debug!("Cached {} ({} bytes) in {:?}", asset.url, asset.body.len(), self.name);
        Ok(())
    }

    /// Exact-URL lookup.
    pub fn match_url(&self, url: &str) -> CacheResult<Option<Asset>> {
        let index = self.read_index()?;
        let entry = match index.entries.into_iter().find(|e| e.url == url) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let body = fs::read(self.dir.join(BLOB_DIR).join(&entry.blob))?;
        Ok(Some(Asset {
            url: entry.url,
            status: entry.status,
            content_type: entry.content_type,
            body,
        }))
    }

    pub fn urls(&self) -> CacheResult<Vec<String>> {
        Ok(self.read_index()?.entries.into_iter().map(|e| e.url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn asset(url: &str, body: &str) -> Asset {
        Asset {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_put_and_match() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let cache = storage.open_cache("v1").unwrap();

        cache.put(&asset("http://localhost/app.js", "one")).unwrap();
        let hit = cache.match_url("http://localhost/app.js").unwrap().unwrap();
        assert_eq!(hit.body, b"one");
        assert_eq!(hit.content_type.as_deref(), Some("text/plain"));
        assert!(cache.match_url("http://localhost/app.js?x=1").unwrap().is_none());
    }

    #[test]
    fn test_put_replaces_same_url() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let cache = storage.open_cache("v1").unwrap();

        cache.put(&asset("http://localhost/", "old")).unwrap();
        cache.put(&asset("http://localhost/", "new")).unwrap();
        assert_eq!(cache.urls().unwrap().len(), 1);
        assert_eq!(cache.match_url("http://localhost/").unwrap().unwrap().body, b"new");

        let blobs = fs::read_dir(dir.path().join("v1").join(BLOB_DIR)).unwrap().count();
        assert_eq!(blobs, 1);
    }

    #[test]
    fn test_keys_and_delete() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        storage.open_cache("v2").unwrap();
        storage.open_cache("v1").unwrap();
        assert_eq!(storage.keys().unwrap(), vec!["v1".to_string(), "v2".to_string()]);

        assert!(storage.delete("v1").unwrap());
        assert!(!storage.delete("v1").unwrap());
        assert!(!storage.has("v1").unwrap());
        assert_eq!(storage.keys().unwrap(), vec!["v2".to_string()]);
    }

    #[test]
    fn test_rejects_bad_names() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        for name in ["", "..", "../x", "a/b"] {
            assert!(matches!(storage.open_cache(name), Err(CacheError::InvalidName(_))));
        }
    }
}
