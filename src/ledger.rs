// src/ledger.rs
use crate::directory::Dashboard;
use crate::error::{DirectoryError, DirectoryResult};
use crate::models::CredentialEntry;
use crate::store::KeyValueStore;
use log;

impl<P: KeyValueStore, S: KeyValueStore> Dashboard<P, S> {
    /// Appends an entry to the logged-in user's ledger. Field contents are
    /// stored as given, empty strings included.
    pub fn append_entry(&mut self, username: &str, pass: &str, purpose: &str) -> DirectoryResult<()> {
        let owner = self.session.current()?.ok_or(DirectoryError::NotLoggedIn)?;
        let mut db = self.list_users()?;
        let record = match db.find_mut(&owner) {
            Some(record) => record,
            None => {
                log::warn!("Session user {:?} no longer exists; clearing session", owner);
                self.session.clear()?;
                return Err(DirectoryError::NotLoggedIn);
            }
        };
        record.details.push(CredentialEntry::new(
            username.to_string(),
            pass.to_string(),
            purpose.to_string(),
        ));
        let count = record.details.len();
        self.save_users(&db)?;
        log::info!("Recorded entry #{} for {:?}", count, owner);
        Ok(())
    }

    /// The logged-in user's entries, most recent first.
    pub fn list_entries(&mut self) -> DirectoryResult<Vec<CredentialEntry>> {
        let user = self.current_user()?;
        Ok(user.details.into_iter().rev().collect())
    }
}
