//! Strong type definitions shared across the confab crates.
//!
//! Identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable user identifier, as resolved by the authentication layer.
///
/// Immutable for the lifetime of the account. This is the primary key of a
/// [`Profile`](crate::profile::Profile) and the name component of its
/// entity key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a new UserId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A resolved identity pair, injected by the authentication collaborator.
///
/// The endpoint layer rejects unauthenticated requests before any core
/// operation runs, so an `Identity` is always present here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user identifier.
    pub user_id: UserId,
    /// The user's main email address.
    pub email: String,
}

impl Identity {
    /// Create an identity from its parts.
    pub fn new(user_id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_display() {
        let id = UserId::new("alice");
        assert_eq!(format!("{}", id), "alice");
        assert_eq!(format!("{:?}", id), "UserId(alice)");
    }

    #[test]
    fn test_user_id_equality() {
        assert_eq!(UserId::from("bob"), UserId::new(String::from("bob")));
        assert_ne!(UserId::from("bob"), UserId::from("carol"));
    }
}
