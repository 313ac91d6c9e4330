//! JSON-file trust repository.
//!
//! Records live in memory and every mutation rewrites the whole file.
//! Writes go to a temp file which is then renamed over the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::{TrustRecord, TrustRepository};
use crate::error::{Error, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedTrust {
    records: BTreeMap<String, TrustRecord>,
}

/// Trust records persisted to a single JSON file
#[derive(Debug)]
pub struct FileTrustRepository {
    path: PathBuf,
    records: DashMap<String, TrustRecord>,
    write_lock: parking_lot::Mutex<()>,
}

impl FileTrustRepository {
    /// Open the repository at `path`, loading it if the file exists
    ///
    /// A missing file starts empty. An unreadable or unparseable file is an
    /// error rather than being silently replaced.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = DashMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| Error::StorageReadError(format!("{}: {}", path.display(), e)))?;
            let data: PersistedTrust = serde_json::from_str(&contents)
                .map_err(|e| Error::DeserializationError(format!("{}: {}", path.display(), e)))?;
            for (contact, record) in data.records {
                records.insert(contact, record);
            }
            tracing::info!(
                contacts = records.len(),
                path = %path.display(),
                "Trust records loaded from disk"
            );
        } else {
            tracing::info!(path = %path.display(), "No trust file yet, starting fresh");
        }

        Ok(Self {
            path,
            records,
            write_lock: parking_lot::Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> BTreeMap<String, TrustRecord> {
        self.records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    /// Write `records` to disk. Callers hold `write_lock`.
    fn persist(&self, records: BTreeMap<String, TrustRecord>) -> Result<()> {
        let json = serde_json::to_string_pretty(&PersistedTrust { records })?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::StorageWriteError(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &json)
            .map_err(|e| Error::StorageWriteError(format!("{}: {}", tmp_path.display(), e)))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(Error::StorageWriteError(format!(
                "{}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}

impl TrustRepository for FileTrustRepository {
    fn get(&self, contact: &str) -> Result<Option<TrustRecord>> {
        Ok(self.records.get(contact).map(|r| r.value().clone()))
    }

    // Memory only changes once the file write has succeeded.
    fn put(&self, record: TrustRecord) -> Result<()> {
        let _guard = self.write_lock.lock();

        let mut next = self.snapshot();
        next.insert(record.contact.clone(), record.clone());
        self.persist(next)?;

        self.records.insert(record.contact.clone(), record);
        Ok(())
    }

    fn delete(&self, contact: &str) -> Result<Option<TrustRecord>> {
        let _guard = self.write_lock.lock();

        let mut next = self.snapshot();
        if next.remove(contact).is_none() {
            return Ok(None);
        }
        self.persist(next)?;

        Ok(self.records.remove(contact).map(|(_, r)| r))
    }

    fn list(&self) -> Result<Vec<TrustRecord>> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| a.contact.cmp(&b.contact));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::trust::TrustStore;
    use std::sync::Arc;

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.json");
        let key = *KeyPair::generate().public_key();

        {
            let store = TrustStore::new(Arc::new(FileTrustRepository::open(&path).unwrap()));
            store.observe("bob", &key).unwrap();
        }

        let reopened = FileTrustRepository::open(&path).unwrap();
        let record = reopened.get("bob").unwrap().unwrap();
        assert_eq!(record.public_key, key);
        assert!(!record.key_changed);
    }

    #[test]
    fn test_pending_change_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trust.json");
        let old = *KeyPair::generate().public_key();
        let new = *KeyPair::generate().public_key();

        {
            let store = TrustStore::new(Arc::new(FileTrustRepository::open(&path).unwrap()));
            store.observe("bob", &old).unwrap();
            store.observe("bob", &new).unwrap();
        }

        let record = FileTrustRepository::open(&path).unwrap().get("bob").unwrap().unwrap();
        assert!(record.key_changed);
        assert_eq!(record.previous_public_key, Some(old));
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.json");
        let repo = FileTrustRepository::open(&path).unwrap();
        let store = TrustStore::new(Arc::new(repo));
        store.observe("bob", KeyPair::generate().public_key()).unwrap();
        assert!(store.forget("bob").unwrap());

        let reopened = FileTrustRepository::open(&path).unwrap();
        assert!(reopened.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FileTrustRepository::open(&path),
            Err(Error::DeserializationError(_))
        ));
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trust.json");
        let store = TrustStore::new(Arc::new(FileTrustRepository::open(&path).unwrap()));
        store.observe("bob", KeyPair::generate().public_key()).unwrap();

        // A directory in the file's place makes the rename fail.
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(matches!(
            store.observe("carol", KeyPair::generate().public_key()),
            Err(Error::StorageWriteError(_))
        ));
        assert!(store.get("carol").unwrap().is_none());

        assert!(matches!(store.forget("bob"), Err(Error::StorageWriteError(_))));
        assert!(store.get("bob").unwrap().is_some());
        assert!(!path.with_extension("json.tmp").exists());
    }
}
