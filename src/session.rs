// src/session.rs
use crate::error::{StoreError, StoreResult};
use crate::store::KeyValueStore;
use log;
use serde::{Deserialize, Serialize};

pub const SESSION_KEY: &str = "luxe_session";

/// What the session store holds. Only the username is kept; the live record
/// is always resolved from the user database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct SessionData {
    username: String,
}

/// Wraps the session-scoped key-value store.
#[derive(Debug)]
pub struct SessionStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The logged-in username, if any. Unreadable session data counts as no session.
    pub fn current(&self) -> StoreResult<Option<String>> {
        let raw = match self.store.get(SESSION_KEY)? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str::<SessionData>(&raw) {
            Ok(data) => Ok(Some(data.username)),
            Err(e) => {
                log::warn!("Ignoring malformed session data: {}", e);
                Ok(None)
            }
        }
    }

    pub fn establish(&mut self, username: &str) -> StoreResult<()> {
        let data = SessionData {
            username: username.to_string(),
        };
        let json = serde_json::to_string(&data)
            .map_err(|e| StoreError::Serialization(format!("Session serialization failed: {}", e)))?;
        self.store.set(SESSION_KEY, &json)?;
        log::info!("Session established for {:?}", username);
        Ok(())
    }

    pub fn clear(&mut self) -> StoreResult<()> {
        self.store.remove(SESSION_KEY)?;
        log::info!("Session cleared");
        Ok(())
    }
}
