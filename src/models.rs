// src/models.rs
use serde::{Deserialize, Serialize};

/// One tracked external login stored under a user.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialEntry {
    pub username: String,
    pub pass: String,
    pub purpose: String,
}

impl CredentialEntry {
    pub fn new(username: String, pass: String, purpose: String) -> Self {
        Self { username, pass, purpose }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password: String, // plaintext, compared verbatim
    #[serde(default)]
    pub details: Vec<CredentialEntry>,
}

impl UserRecord {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            details: Vec::new(),
        }
    }
}

/// The full collection of user records, stored as a bare JSON array.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct UserDatabase {
    pub users: Vec<UserRecord>,
}

impl UserDatabase {
    pub fn new() -> Self {
        UserDatabase::default()
    }

    pub fn position(&self, username: &str) -> Option<usize> {
        self.users.iter().position(|u| u.username == username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.position(username).is_some()
    }

    pub fn find(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn find_mut(&mut self, username: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    pub fn push(&mut self, user: UserRecord) {
        self.users.push(user);
    }

    /// Drops every record with this username. Returns how many were removed.
    pub fn remove(&mut self, username: &str) -> usize {
        let before = self.users.len();
        self.users.retain(|u| u.username != username);
        before - self.users.len()
    }

    pub fn usernames(&self) -> Vec<&str> {
        self.users.iter().map(|u| u.username.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_serializes_as_bare_array() {
        let mut db = UserDatabase::new();
        let mut alice = UserRecord::new("alice".to_string(), "secret".to_string());
        alice.details.push(CredentialEntry::new(
            "a@mail".to_string(),
            "pw".to_string(),
            "email".to_string(),
        ));
        db.push(alice);

        let json = serde_json::to_string(&db).unwrap();
        assert_eq!(
            json,
            r#"[{"username":"alice","password":"secret","details":[{"username":"a@mail","pass":"pw","purpose":"email"}]}]"#
        );
    }

    #[test]
    fn test_record_without_details_gets_empty_ledger() {
        let db: UserDatabase =
            serde_json::from_str(r#"[{"username":"bob","password":"x"}]"#).unwrap();
        assert_eq!(db.users.len(), 1);
        assert!(db.users[0].details.is_empty());
    }

    #[test]
    fn test_remove_returns_count() {
        let mut db = UserDatabase::new();
        db.push(UserRecord::new("a".to_string(), "1".to_string()));
        db.push(UserRecord::new("b".to_string(), "2".to_string()));
        assert_eq!(db.remove("a"), 1);
        assert_eq!(db.remove("a"), 0);
        assert_eq!(db.usernames(), vec!["b"]);
    }
}
