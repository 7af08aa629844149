//! Storage backends: where bound/free key records persist between runs.

use crate::error::KeystoreError;
use crate::types::{BoundKey, KeyRecord};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use vault_crypto::{AsymmetricAlgo, KeychainUid};

/// Persistence for the keystore's bound and free maps.
///
/// Implement this for your infrastructure:
/// - `InMemoryBackend` (testing, ephemeral)
/// - `FileBackend` (single-node development)
/// - your database, for a production deployment
pub trait StorageBackend: Send + Sync {
    fn get_bound(
        &self,
        keychain_uid: &KeychainUid,
        algo: AsymmetricAlgo,
    ) -> Result<Option<KeyRecord>, KeystoreError>;
    fn put_bound(&self, keychain_uid: &KeychainUid, record: &KeyRecord) -> Result<(), KeystoreError>;
    fn list_free(&self, algo: AsymmetricAlgo) -> Result<Vec<KeyRecord>, KeystoreError>;
    fn push_free(&self, record: &KeyRecord) -> Result<(), KeystoreError>;
    /// Remove and return the oldest free key for `algo`, if any.
    fn pop_free(&self, algo: AsymmetricAlgo) -> Result<Option<KeyRecord>, KeystoreError>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InMemoryState {
    bound: HashMap<(KeychainUid, AsymmetricAlgo), KeyRecord>,
    free: HashMap<AsymmetricAlgo, Vec<KeyRecord>>,
}

pub struct InMemoryBackend {
    state: RwLock<InMemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self { state: RwLock::new(InMemoryState::default()) }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryBackend {
    fn get_bound(
        &self,
        keychain_uid: &KeychainUid,
        algo: AsymmetricAlgo,
    ) -> Result<Option<KeyRecord>, KeystoreError> {
        let state = self.state.read().unwrap();
        Ok(state.bound.get(&(keychain_uid.clone(), algo)).cloned())
    }

    fn put_bound(&self, keychain_uid: &KeychainUid, record: &KeyRecord) -> Result<(), KeystoreError> {
        let mut state = self.state.write().unwrap();
        state.bound.insert((keychain_uid.clone(), record.algo), record.clone());
        Ok(())
    }

    fn list_free(&self, algo: AsymmetricAlgo) -> Result<Vec<KeyRecord>, KeystoreError> {
        let state = self.state.read().unwrap();
        Ok(state.free.get(&algo).cloned().unwrap_or_default())
    }

    fn push_free(&self, record: &KeyRecord) -> Result<(), KeystoreError> {
        let mut state = self.state.write().unwrap();
        state.free.entry(record.algo).or_default().push(record.clone());
        Ok(())
    }

    fn pop_free(&self, algo: AsymmetricAlgo) -> Result<Option<KeyRecord>, KeystoreError> {
        let mut state = self.state.write().unwrap();
        match state.free.get_mut(&algo) {
            Some(queue) if !queue.is_empty() => Ok(Some(queue.remove(0))),
            _ => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// File backend — one JSON file per bound key, one directory of JSON files
// per free pool.
// ---------------------------------------------------------------------------

pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, KeystoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join("bound"))
            .map_err(|e| KeystoreError::Storage(format!("create dir: {e}")))?;
        std::fs::create_dir_all(dir.join("free"))
            .map_err(|e| KeystoreError::Storage(format!("create dir: {e}")))?;
        Ok(Self { dir })
    }

    fn bound_path(&self, keychain_uid: &KeychainUid, algo: AsymmetricAlgo) -> PathBuf {
        self.dir.join("bound").join(format!("{keychain_uid}-{algo}.json"))
    }

    fn free_dir(&self, algo: AsymmetricAlgo) -> PathBuf {
        self.dir.join("free").join(algo.to_string())
    }

    fn read_record(path: &Path) -> Result<KeyRecord, KeystoreError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| KeystoreError::Storage(format!("read: {e}")))?;
        serde_json::from_str(&data).map_err(|e| KeystoreError::Storage(format!("parse: {e}")))
    }

    fn write_record_atomic(path: &Path, record: &KeyRecord) -> Result<(), KeystoreError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| KeystoreError::Storage(format!("serialize: {e}")))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &json).map_err(|e| KeystoreError::Storage(format!("write: {e}")))?;
        std::fs::rename(&tmp, path).map_err(|e| KeystoreError::Storage(format!("rename: {e}")))?;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get_bound(
        &self,
        keychain_uid: &KeychainUid,
        algo: AsymmetricAlgo,
    ) -> Result<Option<KeyRecord>, KeystoreError> {
        let path = self.bound_path(keychain_uid, algo);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn put_bound(&self, keychain_uid: &KeychainUid, record: &KeyRecord) -> Result<(), KeystoreError> {
        Self::write_record_atomic(&self.bound_path(keychain_uid, record.algo), record)
    }

    fn list_free(&self, algo: AsymmetricAlgo) -> Result<Vec<KeyRecord>, KeystoreError> {
        let dir = self.free_dir(algo);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<_> = std::fs::read_dir(&dir)
            .map_err(|e| KeystoreError::Storage(format!("readdir: {e}")))?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());
        entries.iter().map(|e| Self::read_record(&e.path())).collect()
    }

    fn push_free(&self, record: &KeyRecord) -> Result<(), KeystoreError> {
        let dir = self.free_dir(record.algo);
        std::fs::create_dir_all(&dir).map_err(|e| KeystoreError::Storage(format!("create dir: {e}")))?;
        let path = dir.join(format!("{}.json", record.created_at.timestamp_nanos_opt().unwrap_or(0)));
        Self::write_record_atomic(&path, record)
    }

    fn pop_free(&self, algo: AsymmetricAlgo) -> Result<Option<KeyRecord>, KeystoreError> {
        let dir = self.free_dir(algo);
        if !dir.exists() {
            return Ok(None);
        }
        let mut entries: Vec<_> = std::fs::read_dir(&dir)
            .map_err(|e| KeystoreError::Storage(format!("readdir: {e}")))?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());
        let Some(entry) = entries.into_iter().next() else {
            return Ok(None);
        };
        let record = Self::read_record(&entry.path())?;
        std::fs::remove_file(entry.path()).map_err(|e| KeystoreError::Storage(format!("remove: {e}")))?;
        Ok(Some(record))
    }
}
