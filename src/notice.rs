// src/notice.rs
use crate::error::DirectoryError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A message/severity pair handed to whatever is presenting results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: &str) -> Self {
        Self {
            severity: Severity::Success,
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            severity: Severity::Error,
            message: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.severity == Severity::Success
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Success => write!(f, "[ok] {}", self.message),
            Severity::Error => write!(f, "[error] {}", self.message),
        }
    }
}

pub const REGISTERED: &str = "Registration successful! Please login.";
pub const LOGGED_IN: &str = "Login successful!";
pub const LOGGED_OUT: &str = "Logged out.";
pub const PASSWORD_CHANGED: &str = "Security updated!";
pub const ACCOUNT_REMOVED: &str = "Account removed permanently.";
pub const ENTRY_SAVED: &str = "Saved successfully!";

/// Maps a rejection to the notice shown for the operation that produced it.
/// `InvalidCredentials` reads differently for login and for account removal.
pub fn rejection(err: &DirectoryError, removing_account: bool) -> Notice {
    match err {
        DirectoryError::AlreadyExists => Notice::error("Username already exists!"),
        DirectoryError::InvalidCredentials if removing_account => {
            Notice::error("Username or Password incorrect.")
        }
        DirectoryError::InvalidCredentials => Notice::error("Invalid username or password."),
        DirectoryError::IncorrectPassword => Notice::error("Current password incorrect"),
        DirectoryError::NotLoggedIn => Notice::error("Please login first."),
        DirectoryError::Cancelled => Notice::error("Account removal cancelled."),
        DirectoryError::Store(e) => Notice::error(&format!("Storage failure: {}", e)),
    }
}
