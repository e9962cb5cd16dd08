// src/cache/worker.rs
use super::fetch::Fetcher;
use super::storage::{Asset, CacheStorage};
use crate::error::{CacheError, CacheResult};
use log;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CACHE_VERSION: &str = "luxe-details-v1";
pub const DEFAULT_ORIGIN: &str = "http://localhost:8080/";

pub fn default_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/style.css",
        "/app.js",
        "/manifest.json",
        "/icon.png",
        "/bg.png",
        "https://fonts.googleapis.com/css2?family=Outfit:wght@300;400;600;800&display=swap",
        "https://unpkg.com/lucide@latest",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// The application shell: local paths resolve against `origin`, absolute
/// URLs (the font and icon CDNs) are kept as they are.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Manifest {
    pub origin: String,
    pub assets: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            origin: DEFAULT_ORIGIN.to_string(),
            assets: default_assets(),
        }
    }
}

impl Manifest {
    pub fn resolve(&self, url: &str) -> CacheResult<String> {
        let invalid = |reason: String| CacheError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let base = Url::parse(&self.origin).map_err(|e| invalid(format!("bad origin {:?}: {}", self.origin, e)))?;
        let resolved = base.join(url).map_err(|e| invalid(e.to_string()))?;
        Ok(resolved.to_string())
    }

    pub fn resolved_assets(&self) -> CacheResult<Vec<String>> {
        self.assets.iter().map(|a| self.resolve(a)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Active,
    Replaced,
}

/// Where a response came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    Cache(Asset),
    Network(Asset),
}

impl Served {
    pub fn asset(&self) -> &Asset {
        match self {
            Served::Cache(a) | Served::Network(a) => a,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfflineWorker {
    version: String,
    manifest: Manifest,
    state: WorkerState,
    installed: bool,
}

impl OfflineWorker {
    pub fn new(version: &str, manifest: Manifest) -> Self {
        Self {
            version: version.to_string(),
            manifest,
            state: WorkerState::Installing,
            installed: false,
        }
    }

    /// A worker for a version that an earlier run already installed and
    /// activated comes back `Active`.
    pub fn resume(version: &str, manifest: Manifest, storage: &CacheStorage) -> CacheResult<Self> {
        let mut worker = Self::new(version, manifest);
        if storage.has(version)? {
            worker.installed = true;
            worker.state = WorkerState::Active;
        }
        Ok(worker)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Populates the versioned cache with every manifest asset. Nothing is
    /// written unless every fetch succeeds with a 2xx status.
    pub fn install(&mut self, storage: &CacheStorage, fetcher: &dyn Fetcher) -> CacheResult<()> {
        log::info!("Installing offline cache {:?}", self.version);
        let fail = |version: &str, source: CacheError| {
            log::error!("Install of {:?} failed: {}", version, source);
            CacheError::InstallFailed {
                version: version.to_string(),
                source: Box::new(source),
            }
        };

        let urls = self.manifest.resolved_assets().map_err(|e| fail(&self.version, e))?;
        let mut fetched = Vec::with_capacity(urls.len());
        for url in &urls {
            let asset = fetcher.fetch(url).map_err(|e| fail(&self.version, e))?;
            if !asset.is_ok() {
                return Err(fail(
                    &self.version,
                    CacheError::Fetch {
                        url: url.clone(),
                        reason: format!("HTTP status {}", asset.status),
                    },
                ));
            }
            fetched.push(asset);
        }

        let existed = storage.has(&self.version)?;
        let commit = storage
            .open_cache(&self.version)
            .and_then(|cache| fetched.iter().try_for_each(|asset| cache.put(asset)));
        if let Err(e) = commit {
            if !existed {
                let _ = storage.delete(&self.version);
            }
            return Err(fail(&self.version, e));
        }

        self.installed = true;
        log::info!("Cached {} shell asset(s) under {:?}", fetched.len(), self.version);
        Ok(())
    }

    /// Deletes every cache not named by this worker's version and returns
    /// the names removed.
    pub fn activate(&mut self, storage: &CacheStorage) -> CacheResult<Vec<String>> {
        if !self.installed {
            return Err(CacheError::NotInstalled(self.version.clone()));
        }
        let mut evicted = Vec::new();
        for key in storage.keys()? {
            if key != self.version && storage.delete(&key)? {
                evicted.push(key);
            }
        }
        self.state = WorkerState::Active;
        log::info!("Offline cache {:?} active; evicted {:?}", self.version, evicted);
        Ok(evicted)
    }

    /// Cache first by exact URL, otherwise straight to the network. Network
    /// responses are not written back.
    pub fn handle_fetch(
        &self,
        url: &str,
        storage: &CacheStorage,
        fetcher: &dyn Fetcher,
    ) -> CacheResult<Served> {
        let url = self.manifest.resolve(url)?;
        if self.state == WorkerState::Active && storage.has(&self.version)? {
            let cache = storage.open_cache(&self.version)?;
            if let Some(asset) = cache.match_url(&url)? {
                log::debug!("Cache hit for {}", url);
                return Ok(Served::Cache(asset));
            }
        }
        log::debug!("Cache miss for {}; going to network", url);
        Ok(Served::Network(fetcher.fetch(&url)?))
    }

    fn retire(&mut self) {
        self.state = WorkerState::Replaced;
    }
}

/// Tracks which worker controls fetches and swaps in new versions.
#[derive(Debug)]
pub struct WorkerRegistration {
    storage: CacheStorage,
    active: Option<OfflineWorker>,
}

impl WorkerRegistration {
    pub fn new(storage: CacheStorage) -> Self {
        Self { storage, active: None }
    }

    pub fn with_active(storage: CacheStorage, worker: OfflineWorker) -> Self {
        Self {
            storage,
            active: Some(worker),
        }
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn active(&self) -> Option<&OfflineWorker> {
        self.active.as_ref()
    }

    /// Installs and activates `worker`. If install fails the worker is
    /// discarded and the current one stays in control. On success the
    /// previous worker, now `Replaced`, is returned.
    pub fn update(
        &mut self,
        mut worker: OfflineWorker,
        fetcher: &dyn Fetcher,
    ) -> CacheResult<Option<OfflineWorker>> {
        worker.install(&self.storage, fetcher)?;
        worker.activate(&self.storage)?;
        let previous = self.active.replace(worker).map(|mut old| {
            old.retire();
            log::info!("Worker {:?} replaced", old.version);
            old
        });
        Ok(previous)
    }

    pub fn handle_fetch(&self, url: &str, fetcher: &dyn Fetcher) -> CacheResult<Served> {
        match &self.active {
            Some(worker) => worker.handle_fetch(url, &self.storage, fetcher),
            None => Ok(Served::Network(fetcher.fetch(url)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::tempdir;

    /// Serves canned bodies; unknown URLs are transport failures.
    #[derive(Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, (u16, String)>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn serving_manifest(manifest: &Manifest) -> Self {
            let mut fetcher = ScriptedFetcher::default();
            for url in manifest.resolved_assets().unwrap() {
                fetcher.responses.insert(url.clone(), (200, format!("body of {}", url)));
            }
            fetcher
        }

        fn calls(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch(&self, url: &str) -> CacheResult<Asset> {
            self.calls.borrow_mut().push(url.to_string());
            match self.responses.get(url) {
                Some((status, body)) => Ok(Asset {
                    url: url.to_string(),
                    status: *status,
                    content_type: None,
                    body: body.as_bytes().to_vec(),
                }),
                None => Err(CacheError::Fetch {
                    url: url.to_string(),
                    reason: "offline".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_manifest_resolution() {
        let manifest = Manifest::default();
        assert_eq!(manifest.resolve("/").unwrap(), "http://localhost:8080/");
        assert_eq!(manifest.resolve("/app.js").unwrap(), "http://localhost:8080/app.js");
        assert_eq!(
            manifest.resolve("https://unpkg.com/lucide@latest").unwrap(),
            "https://unpkg.com/lucide@latest"
        );
        assert_eq!(manifest.resolved_assets().unwrap().len(), 9);
    }

    #[test]
    fn test_install_caches_every_manifest_url() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let fetcher = ScriptedFetcher::serving_manifest(&manifest);

        let mut worker = OfflineWorker::new(DEFAULT_CACHE_VERSION, manifest.clone());
        worker.install(&storage, &fetcher).unwrap();
        assert_eq!(worker.state(), WorkerState::Installing);

        let cache = storage.open_cache(DEFAULT_CACHE_VERSION).unwrap();
        for url in manifest.resolved_assets().unwrap() {
            let hit = cache.match_url(&url).unwrap().expect("manifest url missing from cache");
            assert_eq!(hit.body, format!("body of {}", url).into_bytes());
        }
    }

    #[test]
    fn test_install_is_all_or_nothing() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let mut fetcher = ScriptedFetcher::serving_manifest(&manifest);
        fetcher.responses.remove("https://unpkg.com/lucide@latest");

        let mut worker = OfflineWorker::new("v1", manifest);
        match worker.install(&storage, &fetcher) {
            Err(CacheError::InstallFailed { version, .. }) => assert_eq!(version, "v1"),
            other => panic!("Expected InstallFailed, got {:?}", other),
        }
        assert!(storage.keys().unwrap().is_empty());
        assert!(matches!(worker.activate(&storage), Err(CacheError::NotInstalled(_))));
    }

    #[test]
    fn test_install_rejects_error_status() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let mut fetcher = ScriptedFetcher::serving_manifest(&manifest);
        fetcher
            .responses
            .insert("http://localhost:8080/bg.png".to_string(), (404, String::new()));

        let mut worker = OfflineWorker::new("v1", manifest);
        assert!(worker.install(&storage, &fetcher).is_err());
        assert!(!storage.has("v1").unwrap());
    }

    #[test]
    fn test_activate_evicts_old_versions() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let fetcher = ScriptedFetcher::serving_manifest(&manifest);
        storage.open_cache("luxe-details-v0").unwrap();
        storage.open_cache("unrelated").unwrap();

        let mut worker = OfflineWorker::new(DEFAULT_CACHE_VERSION, manifest);
        worker.install(&storage, &fetcher).unwrap();
        let evicted = worker.activate(&storage).unwrap();

        assert_eq!(evicted, vec!["luxe-details-v0".to_string(), "unrelated".to_string()]);
        assert_eq!(storage.keys().unwrap(), vec![DEFAULT_CACHE_VERSION.to_string()]);
        assert_eq!(worker.state(), WorkerState::Active);
    }

    #[test]
    fn test_fetch_prefers_cache_then_network() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let mut fetcher = ScriptedFetcher::serving_manifest(&manifest);
        fetcher.responses.insert(
            "http://localhost:8080/extra.json".to_string(),
            (200, "extra".to_string()),
        );

        let mut worker = OfflineWorker::new("v1", manifest);
        worker.install(&storage, &fetcher).unwrap();
        worker.activate(&storage).unwrap();
        let after_install = fetcher.calls();

        match worker.handle_fetch("/index.html", &storage, &fetcher).unwrap() {
            Served::Cache(asset) => assert_eq!(asset.url, "http://localhost:8080/index.html"),
            other => panic!("Expected cache hit, got {:?}", other),
        }
        assert_eq!(fetcher.calls(), after_install);

        match worker.handle_fetch("/extra.json", &storage, &fetcher).unwrap() {
            Served::Network(asset) => assert_eq!(asset.body, b"extra"),
            other => panic!("Expected network fallback, got {:?}", other),
        }
        // No write-back: the same request goes to the network again.
        assert!(matches!(
            worker.handle_fetch("/extra.json", &storage, &fetcher).unwrap(),
            Served::Network(_)
        ));
        assert!(!storage
            .open_cache("v1")
            .unwrap()
            .urls()
            .unwrap()
            .contains(&"http://localhost:8080/extra.json".to_string()));
    }

    #[test]
    fn test_registration_update_replaces_worker() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let fetcher = ScriptedFetcher::serving_manifest(&manifest);
        let mut registration = WorkerRegistration::new(storage);

        assert!(registration
            .update(OfflineWorker::new("v1", manifest.clone()), &fetcher)
            .unwrap()
            .is_none());
        let replaced = registration
            .update(OfflineWorker::new("v2", manifest.clone()), &fetcher)
            .unwrap()
            .expect("v1 should have been replaced");

        assert_eq!(replaced.version(), "v1");
        assert_eq!(replaced.state(), WorkerState::Replaced);
        assert_eq!(registration.active().unwrap().version(), "v2");
        assert_eq!(registration.storage().keys().unwrap(), vec!["v2".to_string()]);
        assert!(matches!(
            registration.handle_fetch("/style.css", &fetcher).unwrap(),
            Served::Cache(_)
        ));
    }

    #[test]
    fn test_failed_update_keeps_current_worker() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        let fetcher = ScriptedFetcher::serving_manifest(&manifest);
        let mut registration = WorkerRegistration::new(storage);
        registration
            .update(OfflineWorker::new("v1", manifest.clone()), &fetcher)
            .unwrap();

        let mut broken = manifest.clone();
        broken.assets.push("/missing.css".to_string());
        assert!(registration.update(OfflineWorker::new("v2", broken), &fetcher).is_err());

        assert_eq!(registration.active().unwrap().version(), "v1");
        assert_eq!(registration.active().unwrap().state(), WorkerState::Active);
        assert_eq!(registration.storage().keys().unwrap(), vec!["v1".to_string()]);
    }

    #[test]
    fn test_resume_restores_active_worker() {
        let dir = tempdir().unwrap();
        let storage = CacheStorage::open(dir.path()).unwrap();
        let manifest = Manifest::default();
        assert_eq!(
            OfflineWorker::resume("v1", manifest.clone(), &storage).unwrap().state(),
            WorkerState::Installing
        );

        let fetcher = ScriptedFetcher::serving_manifest(&manifest);
        let mut worker = OfflineWorker::new("v1", manifest.clone());
        worker.install(&storage, &fetcher).unwrap();
        worker.activate(&storage).unwrap();

        let resumed = OfflineWorker::resume("v1", manifest, &storage).unwrap();
        assert_eq!(resumed.state(), WorkerState::Active);
        assert!(matches!(
            resumed.handle_fetch("/", &storage, &fetcher).unwrap(),
            Served::Cache(_)
        ));
    }
}
