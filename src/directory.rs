// src/directory.rs
use crate::error::{DirectoryError, DirectoryResult, StoreError, StoreResult};
use crate::models::{UserDatabase, UserRecord};
use crate::session::SessionStore;
use crate::store::{KeyValueStore, USERS_KEY};
use chrono::NaiveDate;
use log;

/// Asks the user to approve a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

pub const REMOVE_ACCOUNT_PROMPT: &str =
    "WARNING: Your account will be deleted permanently. This action cannot be undone. Are you sure?";

/// Password derived from a date of birth, formatted `DD-MM-YYYY`.
pub fn dob_password(dob: NaiveDate) -> String {
    dob.format("%d-%m-%Y").to_string()
}

/// Everything an operation needs: the persistent store holding the user
/// database and the session store naming who is logged in.
pub struct Dashboard<P: KeyValueStore, S: KeyValueStore> {
    pub(crate) persistent: P,
    pub(crate) session: SessionStore<S>,
}

impl<P: KeyValueStore, S: KeyValueStore> Dashboard<P, S> {
    pub fn new(persistent: P, session: S) -> Self {
        Self {
            persistent,
            session: SessionStore::new(session),
        }
    }

    /// Reads the user database. Absent and unparseable data both read as empty.
    pub fn list_users(&self) -> StoreResult<UserDatabase> {
        let raw = match self.persistent.get(USERS_KEY)? {
            Some(raw) => raw,
            None => return Ok(UserDatabase::new()),
        };
        match serde_json::from_str::<UserDatabase>(&raw) {
            Ok(db) => Ok(db),
            Err(e) => {
                log::warn!(
                    "User database under {:?} is unreadable ({}); treating it as empty",
                    USERS_KEY,
                    e
                );
                Ok(UserDatabase::new())
            }
        }
    }

    /// Overwrites the whole user database in a single key write.
    pub fn save_users(&mut self, db: &UserDatabase) -> StoreResult<()> {
        let json = serde_json::to_string(db).map_err(|e| {
            let msg = format!("User database serialization failed: {}", e);
            log::error!("save_users: {}", msg);
            StoreError::Serialization(msg)
        })?;
        self.persistent.set(USERS_KEY, &json)?;
        log::debug!("Saved {} user record(s)", db.users.len());
        Ok(())
    }

    pub fn register(&mut self, username: &str, password: &str) -> DirectoryResult<()> {
        let mut db = self.list_users()?;
        if db.contains(username) {
            log::warn!("Registration rejected: username {:?} already exists", username);
            return Err(DirectoryError::AlreadyExists);
        }
        db.push(UserRecord::new(username.to_string(), password.to_string()));
        self.save_users(&db)?;
        log::info!("Registered user {:?}", username);
        Ok(())
    }

    /// On success the session names this user; on failure any prior session is kept.
    pub fn login(&mut self, username: &str, password: &str) -> DirectoryResult<UserRecord> {
        let db = self.list_users()?;
        let user = db
            .users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .cloned()
            .ok_or_else(|| {
                log::warn!("Login rejected for {:?}", username);
                DirectoryError::InvalidCredentials
            })?;
        self.session.establish(&user.username)?;
        log::info!("User {:?} logged in", username);
        Ok(user)
    }

    pub fn logout(&mut self) -> DirectoryResult<()> {
        self.session.clear()?;
        Ok(())
    }

    /// The live record of the logged-in user. A session that points at a
    /// record no longer in the database is dropped.
    pub fn current_user(&mut self) -> DirectoryResult<UserRecord> {
        let username = self.session.current()?.ok_or(DirectoryError::NotLoggedIn)?;
        let db = self.list_users()?;
        match db.find(&username) {
            Some(user) => Ok(user.clone()),
            None => {
                log::warn!("Session user {:?} no longer exists; clearing session", username);
                self.session.clear()?;
                Err(DirectoryError::NotLoggedIn)
            }
        }
    }

    pub fn change_password(&mut self, current: &str, next: &str) -> DirectoryResult<()> {
        let user = self.current_user()?;
        if user.password != current {
            log::warn!("Password change rejected for {:?}", user.username);
            return Err(DirectoryError::IncorrectPassword);
        }
        let mut db = self.list_users()?;
        if let Some(record) = db.find_mut(&user.username) {
            record.password = next.to_string();
        }
        self.save_users(&db)?;
        log::info!("Password changed for {:?}", user.username);
        Ok(())
    }

    /// Deletes the logged-in account after checking both fields against it and
    /// obtaining confirmation. A declined prompt leaves everything untouched.
    pub fn remove_account(
        &mut self,
        username: &str,
        password: &str,
        confirm: &dyn Confirm,
    ) -> DirectoryResult<()> {
        let user = self.current_user()?;
        if user.username != username || user.password != password {
            log::warn!("Account removal rejected for session user {:?}", user.username);
            return Err(DirectoryError::InvalidCredentials);
        }
        if !confirm.confirm(REMOVE_ACCOUNT_PROMPT) {
            log::info!("Account removal for {:?} declined at confirmation", username);
            return Err(DirectoryError::Cancelled);
        }
        let mut db = self.list_users()?;
        db.remove(username);
        self.save_users(&db)?;
        self.session.clear()?;
        log::info!("Removed account {:?}", username);
        Ok(())
    }
}
