//! Registered users, keyed by username.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::error::{Error, Result};

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub username: String,
    pub public_key: PublicKey,
    pub created_at: DateTime<Utc>,
}

/// Key-value store of users
pub trait UserDirectory: Send + Sync {
    fn get(&self, username: &str) -> Result<Option<UserRecord>>;

    /// Insert a record unless the username is taken
    ///
    /// Fails with [`Error::Conflict`] if it is. Check and insert are one
    /// atomic step.
    fn insert_new(&self, record: UserRecord) -> Result<()>;

    fn delete(&self, username: &str) -> Result<Option<UserRecord>>;
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<String, UserRecord>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn get(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.get(username).map(|r| r.value().clone()))
    }

    fn insert_new(&self, record: UserRecord) -> Result<()> {
        match self.users.entry(record.username.clone()) {
            Entry::Occupied(_) => Err(Error::Conflict(record.username)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    fn delete(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.users.remove(username).map(|(_, r)| r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn record(username: &str) -> UserRecord {
        UserRecord {
            username: username.to_string(),
            public_key: *KeyPair::generate().public_key(),
            created_at: crate::time::now(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let directory = MemoryUserDirectory::new();
        let alice = record("alice");
        directory.insert_new(alice.clone()).unwrap();
        assert_eq!(directory.get("alice").unwrap(), Some(alice));
        assert_eq!(directory.get("bob").unwrap(), None);
    }

    #[test]
    fn test_duplicate_is_conflict_and_keeps_original() {
        let directory = MemoryUserDirectory::new();
        let original = record("alice");
        directory.insert_new(original.clone()).unwrap();

        let result = directory.insert_new(record("alice"));
        assert!(matches!(result, Err(Error::Conflict(name)) if name == "alice"));
        assert_eq!(directory.get("alice").unwrap(), Some(original));
    }

    #[test]
    fn test_delete() {
        let directory = MemoryUserDirectory::new();
        directory.insert_new(record("alice")).unwrap();
        assert!(directory.delete("alice").unwrap().is_some());
        assert!(directory.is_empty());
    }
}
