// src/cache/fetch.rs
use super::storage::Asset;
use crate::error::{CacheError, CacheResult};
use log;
use reqwest::header::CONTENT_TYPE;

/// Network access as seen by the offline worker. Any HTTP response, error
/// statuses included, is `Ok`; only transport failures are `Err`.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> CacheResult<Asset>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> CacheResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("luxe-vault/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CacheError::Fetch {
                url: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> CacheResult<Asset> {
        log::debug!("GET {}", url);
        let fetch_err = |reason: String| CacheError::Fetch {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_err(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|e| fetch_err(format!("Failed to read body: {}", e)))?
            .to_vec();

        Ok(Asset {
            url: url.to_string(),
            status,
            content_type,
            body,
        })
    }
}
