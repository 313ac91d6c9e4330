//! # Trust Module
//!
//! Trust-on-first-use tracking of contacts' public keys.
//!
//! ## Record Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       TRUST RECORD LIFECYCLE                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  (none) ── save(K1) ──► TRUSTED K1                  FirstSeen          │
//! │                           │                                             │
//! │                           ├── save(K1) ──► TRUSTED K1      Unchanged   │
//! │                           │                (last_seen bumped)           │
//! │                           │                                             │
//! │                           └── save(K2) ──► CHANGED                      │
//! │                                            key = K2, previous = K1     │
//! │                                              │                          │
//! │        ┌─────────────────────────────────────┼──────────────────┐      │
//! │        │                                     │                  │      │
//! │   trust(K2)                            save(K1)             reject()   │
//! │        │                                     │                  │      │
//! │        ▼                                     ▼                  ▼      │
//! │   TRUSTED K2                           TRUSTED K1         TRUSTED K1   │
//! │   previous cleared                     Restored           previous     │
//! │                                                           restored     │
//! │                                                                         │
//! │  While CHANGED, a further save(K3) keeps previous = K1 (the last key   │
//! │  the user actually trusted) and moves key to K3.                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Callers must surface a `Changed` observation to the user before treating
//! the contact's messages as fully trusted.

mod file;

pub use file::FileTrustRepository;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::crypto::{hash_str, PublicKey};
use crate::error::{Error, Result};
use crate::locks::StripedLocks;

/// Fingerprint of a public key: SHA3-256 of its hex encoding, as 64 hex
/// characters
pub fn fingerprint(public_key: &PublicKey) -> String {
    hash_str(&public_key.to_hex()).to_hex()
}

/// Render a fingerprint for reading aloud: upper case, groups of four
///
/// `"3a985da7…"` becomes `"3A98 5DA7 …"`.
pub fn display_fingerprint(fingerprint: &str) -> String {
    fingerprint
        .to_ascii_uppercase()
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// What is known about one contact's key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRecord {
    pub contact: String,
    /// Most recently fetched key
    pub public_key: PublicKey,
    pub fingerprint: String,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    /// Last trusted key, set while a change is unresolved
    pub previous_public_key: Option<PublicKey>,
    /// A key change has been seen and not yet resolved
    pub key_changed: bool,
}

impl TrustRecord {
    fn first_seen(contact: &str, public_key: PublicKey, fingerprint: String) -> Self {
        let now = crate::time::now();
        Self {
            contact: contact.to_string(),
            public_key,
            fingerprint,
            first_seen_at: now,
            last_seen_at: now,
            previous_public_key: None,
            key_changed: false,
        }
    }

    /// Whether `key` is the current key and no change is pending
    pub fn trusts(&self, key: &PublicKey) -> bool {
        !self.key_changed && self.public_key == *key
    }
}

/// Result of recording a fetched key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyObservation {
    /// No record existed; one was created
    FirstSeen,
    /// Same key as before
    Unchanged,
    /// The key differs from the last trusted one
    Changed {
        previous_public_key: PublicKey,
    },
    /// A pending change reverted to the last trusted key
    Restored,
}

impl KeyObservation {
    pub fn is_change(&self) -> bool {
        matches!(self, KeyObservation::Changed { .. })
    }
}

/// Storage for trust records keyed by contact
pub trait TrustRepository: Send + Sync {
    fn get(&self, contact: &str) -> Result<Option<TrustRecord>>;
    fn put(&self, record: TrustRecord) -> Result<()>;
    fn delete(&self, contact: &str) -> Result<Option<TrustRecord>>;
    fn list(&self) -> Result<Vec<TrustRecord>>;
}

/// In-memory trust repository
#[derive(Debug, Default)]
pub struct MemoryTrustRepository {
    records: DashMap<String, TrustRecord>,
}

impl MemoryTrustRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrustRepository for MemoryTrustRepository {
    fn get(&self, contact: &str) -> Result<Option<TrustRecord>> {
        Ok(self.records.get(contact).map(|r| r.value().clone()))
    }

    fn put(&self, record: TrustRecord) -> Result<()> {
        self.records.insert(record.contact.clone(), record);
        Ok(())
    }

    fn delete(&self, contact: &str) -> Result<Option<TrustRecord>> {
        Ok(self.records.remove(contact).map(|(_, r)| r))
    }

    fn list(&self) -> Result<Vec<TrustRecord>> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.contact.cmp(&b.contact));
        Ok(records)
    }
}

/// Trust decisions over a [`TrustRepository`]
///
/// Every read-modify-write on one contact runs under that contact's lock.
pub struct TrustStore {
    repository: Arc<dyn TrustRepository>,
    locks: StripedLocks,
}

impl TrustStore {
    pub fn new(repository: Arc<dyn TrustRepository>) -> Self {
        Self {
            repository,
            locks: StripedLocks::default(),
        }
    }

    /// A store over a fresh in-memory repository
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTrustRepository::new()))
    }

    pub fn get(&self, contact: &str) -> Result<Option<TrustRecord>> {
        self.repository.get(contact)
    }

    /// Every record, sorted by contact
    pub fn list(&self) -> Result<Vec<TrustRecord>> {
        self.repository.list()
    }

    /// Records with an unresolved key change
    pub fn pending_changes(&self) -> Result<Vec<TrustRecord>> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|r| r.key_changed)
            .collect())
    }

    /// Record a fetched key together with its fingerprint
    ///
    /// The fingerprint must be the one [`fingerprint`] computes for the key.
    ///
    /// `previous_public_key` holds the last *trusted* key, not the last seen
    /// one. After A (trusted), B, C with no decision in between it is still
    /// A, so [`TrustStore::reject`] returns to a key the user accepted.
    /// Seeing a key again that is still pending gives
    /// [`KeyObservation::Unchanged`]; use [`TrustStore::is_trusted`] to know
    /// whether it may be relied on.
    pub fn save(
        &self,
        contact: &str,
        public_key: &PublicKey,
        key_fingerprint: &str,
    ) -> Result<KeyObservation> {
        let expected = fingerprint(public_key);
        if !expected.eq_ignore_ascii_case(key_fingerprint) {
            return Err(Error::Validation(format!(
                "Fingerprint does not match the public key for {}",
                contact
            )));
        }

        let _guard = self.locks.lock(contact);

        let Some(mut record) = self.repository.get(contact)? else {
            self.repository
                .put(TrustRecord::first_seen(contact, *public_key, expected))?;
            tracing::info!(contact, "First key seen for contact");
            return Ok(KeyObservation::FirstSeen);
        };

        record.last_seen_at = crate::time::now();

        let observation = if record.public_key == *public_key {
            KeyObservation::Unchanged
        } else if record.key_changed && record.previous_public_key.as_ref() == Some(public_key) {
            record.public_key = *public_key;
            record.fingerprint = expected;
            record.previous_public_key = None;
            record.key_changed = false;
            tracing::info!(contact, "Contact key reverted to the trusted key");
            KeyObservation::Restored
        } else {
            let trusted = match record.previous_public_key {
                Some(previous) if record.key_changed => previous,
                _ => record.public_key,
            };
            record.previous_public_key = Some(trusted);
            record.public_key = *public_key;
            record.fingerprint = expected;
            record.key_changed = true;
            tracing::warn!(
                contact,
                fingerprint = %record.fingerprint,
                "Contact public key changed"
            );
            KeyObservation::Changed {
                previous_public_key: trusted,
            }
        };

        self.repository.put(record)?;
        Ok(observation)
    }

    /// Record a fetched key, computing its fingerprint
    pub fn observe(&self, contact: &str, public_key: &PublicKey) -> Result<KeyObservation> {
        self.save(contact, public_key, &fingerprint(public_key))
    }

    /// Accept `public_key` as the contact's key and clear any pending change
    pub fn trust(&self, contact: &str, public_key: &PublicKey) -> Result<TrustRecord> {
        let _guard = self.locks.lock(contact);

        let record = match self.repository.get(contact)? {
            Some(mut record) => {
                record.public_key = *public_key;
                record.fingerprint = fingerprint(public_key);
                record.previous_public_key = None;
                record.key_changed = false;
                record.last_seen_at = crate::time::now();
                record
            }
            None => TrustRecord::first_seen(contact, *public_key, fingerprint(public_key)),
        };

        self.repository.put(record.clone())?;
        tracing::info!(contact, "Contact key trusted");
        Ok(record)
    }

    /// Refuse a pending change and go back to the last trusted key
    ///
    /// A record without a pending change is returned unchanged.
    pub fn reject(&self, contact: &str) -> Result<TrustRecord> {
        let _guard = self.locks.lock(contact);

        let mut record = self
            .repository
            .get(contact)?
            .ok_or_else(|| Error::NotFound(format!("No trust record for {}", contact)))?;

        if let (true, Some(previous)) = (record.key_changed, record.previous_public_key) {
            record.public_key = previous;
            record.fingerprint = fingerprint(&previous);
            record.previous_public_key = None;
            record.key_changed = false;
            self.repository.put(record.clone())?;
            tracing::info!(contact, "Contact key change rejected");
        }
        Ok(record)
    }

    /// Drop everything known about a contact
    pub fn forget(&self, contact: &str) -> Result<bool> {
        let _guard = self.locks.lock(contact);
        Ok(self.repository.delete(contact)?.is_some())
    }

    /// Whether `public_key` is the contact's key with no change pending
    pub fn is_trusted(&self, contact: &str, public_key: &PublicKey) -> Result<bool> {
        Ok(self
            .repository
            .get(contact)?
            .map(|r| r.trusts(public_key))
            .unwrap_or(false))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn key() -> PublicKey {
        *KeyPair::generate().public_key()
    }

    #[test]
    fn test_fingerprint_is_sha3_of_hex() {
        let k = key();
        let fp = fingerprint(&k);
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, hash_str(&k.to_hex()).to_hex());
    }

    #[test]
    fn test_display_fingerprint() {
        assert_eq!(display_fingerprint("3a985da74fe2"), "3A98 5DA7 4FE2");
        let grouped = display_fingerprint(&fingerprint(&key()));
        assert_eq!(grouped.split(' ').count(), 16);
    }

    #[test]
    fn test_first_seen_then_unchanged() {
        let store = TrustStore::in_memory();
        let k = key();

        assert_eq!(store.observe("bob", &k).unwrap(), KeyObservation::FirstSeen);
        let first = store.get("bob").unwrap().unwrap();

        assert_eq!(store.observe("bob", &k).unwrap(), KeyObservation::Unchanged);
        let second = store.get("bob").unwrap().unwrap();

        assert_eq!(second.first_seen_at, first.first_seen_at);
        assert!(second.last_seen_at >= first.last_seen_at);
        assert!(store.is_trusted("bob", &k).unwrap());
    }

    #[test]
    fn test_rotation_then_trust() {
        let store = TrustStore::in_memory();
        let (a, b) = (key(), key());

        store.save("bob", &a, &fingerprint(&a)).unwrap();
        let observation = store.save("bob", &b, &fingerprint(&b)).unwrap();
        assert_eq!(
            observation,
            KeyObservation::Changed {
                previous_public_key: a
            }
        );

        let record = store.get("bob").unwrap().unwrap();
        assert_eq!(record.previous_public_key, Some(a));
        assert_eq!(record.public_key, b);
        assert!(record.key_changed);
        assert!(!store.is_trusted("bob", &b).unwrap());
        assert_eq!(store.pending_changes().unwrap().len(), 1);

        let record = store.trust("bob", &b).unwrap();
        assert_eq!(record.previous_public_key, None);
        assert!(!record.key_changed);
        assert!(store.is_trusted("bob", &b).unwrap());
        assert!(store.pending_changes().unwrap().is_empty());
    }

    #[test]
    fn test_second_change_keeps_last_trusted() {
        let store = TrustStore::in_memory();
        let (a, b, c) = (key(), key(), key());

        store.observe("bob", &a).unwrap();
        store.observe("bob", &b).unwrap();
        let observation = store.observe("bob", &c).unwrap();

        assert_eq!(
            observation,
            KeyObservation::Changed {
                previous_public_key: a
            }
        );
        let record = store.get("bob").unwrap().unwrap();
        assert_eq!(record.public_key, c);
        assert_eq!(record.previous_public_key, Some(a));
    }

    #[test]
    fn test_return_to_trusted_key_restores() {
        let store = TrustStore::in_memory();
        let (a, b) = (key(), key());

        store.observe("bob", &a).unwrap();
        store.observe("bob", &b).unwrap();
        assert_eq!(store.observe("bob", &a).unwrap(), KeyObservation::Restored);
        assert!(store.is_trusted("bob", &a).unwrap());
    }

    #[test]
    fn test_reject_reverts() {
        let store = TrustStore::in_memory();
        let (a, b) = (key(), key());

        store.observe("bob", &a).unwrap();
        store.observe("bob", &b).unwrap();
        let record = store.reject("bob").unwrap();

        assert_eq!(record.public_key, a);
        assert_eq!(record.fingerprint, fingerprint(&a));
        assert!(!record.key_changed);
        assert!(matches!(store.reject("carol"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_trust_unknown_contact_creates_record() {
        let store = TrustStore::in_memory();
        let k = key();
        store.trust("carol", &k).unwrap();
        assert!(store.is_trusted("carol", &k).unwrap());
    }

    #[test]
    fn test_mismatched_fingerprint_rejected() {
        let store = TrustStore::in_memory();
        let (a, b) = (key(), key());
        assert!(matches!(
            store.save("bob", &a, &fingerprint(&b)),
            Err(Error::Validation(_))
        ));
        assert!(store.get("bob").unwrap().is_none());
    }

    #[test]
    fn test_forget() {
        let store = TrustStore::in_memory();
        store.observe("bob", &key()).unwrap();
        assert!(store.forget("bob").unwrap());
        assert!(!store.forget("bob").unwrap());
        assert!(store.list().unwrap().is_empty());
    }
}
