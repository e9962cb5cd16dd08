// src/config.rs
use crate::cache::{default_assets, Manifest, DEFAULT_CACHE_VERSION, DEFAULT_ORIGIN};
use directories::ProjectDirs;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use toml;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub version: String,
    pub origin: String,
    pub assets: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            version: DEFAULT_CACHE_VERSION.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            assets: default_assets(),
        }
    }
}

impl CacheConfig {
    pub fn manifest(&self) -> Manifest {
        Manifest {
            origin: self.origin.clone(),
            assets: self.assets.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: Option<PathBuf>,    // persistent user database
    pub session_dir: Option<PathBuf>, // login session
    pub cache_dir: Option<PathBuf>,   // offline shell caches
    pub cache: CacheConfig,
}

/// Where each store lives once overrides and platform defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePaths {
    pub data: PathBuf,
    pub session: PathBuf,
    pub cache: PathBuf,
}

impl StoragePaths {
    pub fn under(base: &Path) -> Self {
        StoragePaths {
            data: base.join("data"),
            session: base.join("session"),
            cache: base.join("cache"),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "LuxeVault", "LuxeVault")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("luxe_config.toml"))
}

impl Config {
    /// `base` (from the command line) wins over everything; then explicit
    /// config entries; then the platform directories.
    pub fn storage_paths(&self, base: Option<&Path>) -> Option<StoragePaths> {
        if let Some(base) = base {
            return Some(StoragePaths::under(base));
        }
        let platform = project_dirs().map(|dirs| StoragePaths {
            data: dirs.data_dir().to_path_buf(),
            session: dirs
                .runtime_dir()
                .map(|d| d.to_path_buf())
                .unwrap_or_else(|| dirs.cache_dir().join("session")),
            cache: dirs.cache_dir().join("shell"),
        });
        match (&self.data_dir, &self.session_dir, &self.cache_dir, platform) {
            (Some(data), Some(session), Some(cache), _) => Some(StoragePaths {
                data: data.clone(),
                session: session.clone(),
                cache: cache.clone(),
            }),
            (data, session, cache, Some(platform)) => Some(StoragePaths {
                data: data.clone().unwrap_or(platform.data),
                session: session.clone().unwrap_or(platform.session),
                cache: cache.clone().unwrap_or(platform.cache),
            }),
            _ => None,
        }
    }
}

fn save_default_config(config_path: &Path, config: &Config) -> Result<(), String> {
    info!("Attempting to save default config to {:?}", config_path);
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.exists() {
            fs::create_dir_all(parent_dir)
                .map_err(|e| format!("Failed to create config directory {:?}: {}", parent_dir, e))?;
            info!("Created config directory: {:?}", parent_dir);
        }
    }

    let toml_string = toml::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize default config to TOML: {}", e))?;

    let mut file = fs::File::create(config_path)
        .map_err(|e| format!("Failed to create default config file {:?}: {}", config_path, e))?;

    file.write_all(toml_string.as_bytes())
        .map_err(|e| format!("Failed to write default config to {:?}: {}", config_path, e))?;

    info!("Saved default configuration to {:?}", config_path);
    Ok(())
}

fn read_config(config_path: &Path) -> Option<Config> {
    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Failed to read config file at {:?}: {}. Using default configuration.",
                config_path, e
            );
            return None;
        }
    };
    match toml::from_str(&content) {
        Ok(loaded_config) => {
            info!("Configuration loaded from {:?}.", config_path);
            Some(loaded_config)
        }
        Err(e) => {
            warn!(
                "Failed to parse config file at {:?}: {}. Using default configuration.",
                config_path, e
            );
            None
        }
    }
}

/// Loads the configuration at `path`, or at the platform location when none
/// is given. A missing platform config is created with defaults.
pub fn load_config(path: Option<&Path>) -> Config {
    if let Some(explicit) = path {
        return read_config(explicit).unwrap_or_default();
    }
    let Some(config_path) = default_config_path() else {
        warn!("Could not determine config directory. Using default configuration.");
        return Config::default();
    };
    if config_path.exists() {
        return read_config(&config_path).unwrap_or_default();
    }
    info!(
        "Config file not found at {:?}. Creating and using default configuration.",
        config_path
    );
    let default_config = Config::default();
    if let Err(e) = save_default_config(&config_path, &default_config) {
        warn!("Failed to save default configuration: {}", e);
    }
    default_config
}
