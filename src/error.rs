// src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Rejections surfaced by the user directory and credential ledger.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Username already exists")]
    AlreadyExists,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Current password incorrect")]
    IncorrectPassword,
    #[error("No active session")]
    NotLoggedIn,
    #[error("Operation cancelled by user")]
    Cancelled,
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("Install of cache {version} failed: {source}")]
    InstallFailed {
        version: String,
        #[source]
        source: Box<CacheError>,
    },
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid cache name: {0:?}")]
    InvalidName(String),
    #[error("Cache {0} has not been installed")]
    NotInstalled(String),
    #[error("Cache index error: {0}")]
    Index(String),
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Directory(#[from] DirectoryError),
    #[error("Offline cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("CLI error: {0}")]
    Cli(String),
}

pub type AppResult<T> = Result<T, AppError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type DirectoryResult<T> = Result<T, DirectoryError>;
pub type CacheResult<T> = Result<T, CacheError>;
