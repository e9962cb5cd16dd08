// src/cache/mod.rs
//! Offline application-shell cache: a versioned set of named caches, a
//! worker that installs, activates and serves from them, and the network
//! fetcher it falls back to.
mod fetch;
mod storage;
mod worker;

pub use fetch::{Fetcher, HttpFetcher};
pub use storage::{Asset, Cache, CacheStorage};
pub use worker::{
    default_assets, Manifest, OfflineWorker, Served, WorkerRegistration, WorkerState,
    DEFAULT_CACHE_VERSION, DEFAULT_ORIGIN,
};
