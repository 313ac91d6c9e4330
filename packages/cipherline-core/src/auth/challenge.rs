//! Outstanding login challenges.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A nonce issued to a username and not yet answered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub username: String,
    /// Random bytes, hex-encoded
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
}

impl Challenge {
    /// Issue a fresh challenge with `nonce_bytes` random bytes
    pub fn issue(username: &str, nonce_bytes: usize) -> Self {
        let mut bytes = vec![0u8; nonce_bytes];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self {
            username: username.to_string(),
            nonce: hex::encode(bytes),
            issued_at: crate::time::now(),
        }
    }

    /// Whether the challenge is older than `ttl` at `now`
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::MAX);
        now.signed_duration_since(self.issued_at) > ttl
    }
}

/// Storage for at most one challenge per username
///
/// `put` replaces whatever was stored for the username.
pub trait ChallengeStore: Send + Sync {
    fn get(&self, username: &str) -> Result<Option<Challenge>>;
    fn put(&self, challenge: Challenge) -> Result<()>;
    fn delete(&self, username: &str) -> Result<Option<Challenge>>;
}

/// In-memory challenge store
#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    challenges: DashMap<String, Challenge>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

impl ChallengeStore for MemoryChallengeStore {
    fn get(&self, username: &str) -> Result<Option<Challenge>> {
        Ok(self.challenges.get(username).map(|c| c.value().clone()))
    }

    fn put(&self, challenge: Challenge) -> Result<()> {
        self.challenges.insert(challenge.username.clone(), challenge);
        Ok(())
    }

    fn delete(&self, username: &str) -> Result<Option<Challenge>> {
        Ok(self.challenges.remove(username).map(|(_, c)| c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_issue_nonce_length() {
        let challenge = Challenge::issue("alice", 16);
        assert_eq!(challenge.nonce.len(), 32);
        assert!(hex::decode(&challenge.nonce).is_ok());
    }

    #[test]
    fn test_nonces_are_fresh() {
        let a = Challenge::issue("alice", 32);
        let b = Challenge::issue("alice", 32);
        assert_ne!(a.nonce, b.nonce);
    }

    #[test]
    fn test_put_replaces() {
        let store = MemoryChallengeStore::new();
        let first = Challenge::issue("alice", 32);
        let second = Challenge::issue("alice", 32);

        store.put(first).unwrap();
        store.put(second.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("alice").unwrap(), Some(second));
    }

    #[test]
    fn test_delete_returns_removed() {
        let store = MemoryChallengeStore::new();
        let challenge = Challenge::issue("alice", 32);
        store.put(challenge.clone()).unwrap();

        assert_eq!(store.delete("alice").unwrap(), Some(challenge));
        assert_eq!(store.delete("alice").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expiry() {
        let mut challenge = Challenge::issue("alice", 32);
        let now = crate::time::now();
        challenge.issued_at = now - ChronoDuration::seconds(301);

        assert!(challenge.is_expired(now, Duration::from_secs(300)));
        assert!(!challenge.is_expired(now, Duration::from_secs(600)));
    }
}
