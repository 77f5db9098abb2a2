//! Block store interface and in-memory implementation
//!
//! Stores map an encoded `BlockHash` to block bytes. The block kind is
//! passed along for store-side organisation only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::types::{BlockHash, BlockKind};

/// Content-addressed block store
pub trait Store: Send + Sync {
    /// Store a block under its hash
    /// Returns true if newly stored, false if already existed
    fn put(&self, kind: BlockKind, hash: &BlockHash, data: Vec<u8>) -> Result<bool, StoreError>;

    /// Retrieve a block
    /// Returns data or None if not found
    fn get(&self, kind: BlockKind, hash: &BlockHash) -> Result<Option<Vec<u8>>, StoreError>;

    /// Check if a block exists
    fn has(&self, kind: BlockKind, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.get(kind, hash)?.is_some())
    }

    /// Delete a block
    /// Returns true if deleted, false if didn't exist
    fn delete(&self, hash: &BlockHash) -> Result<bool, StoreError>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn put(&self, kind: BlockKind, hash: &BlockHash, data: Vec<u8>) -> Result<bool, StoreError> {
        (**self).put(kind, hash, data)
    }

    fn get(&self, kind: BlockKind, hash: &BlockHash) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(kind, hash)
    }

    fn has(&self, kind: BlockKind, hash: &BlockHash) -> Result<bool, StoreError> {
        (**self).has(kind, hash)
    }

    fn delete(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        (**self).delete(hash)
    }
}

/// Store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store error: {0}")]
    Other(String),
}

/// Store that keeps nothing; for computing a tree hash without persisting blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl Store for NullStore {
    fn put(&self, _kind: BlockKind, _hash: &BlockHash, _data: Vec<u8>) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn get(&self, _kind: BlockKind, _hash: &BlockHash) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(None)
    }

    fn delete(&self, _hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(false)
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    kind: BlockKind,
    data: Vec<u8>,
}

/// In-memory block store keyed by hex-encoded blockhash
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, MemoryEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get number of stored blocks
    pub fn size(&self) -> usize {
        self.data.read().unwrap().len()
    }

    /// Get number of stored blocks of one kind
    pub fn count(&self, kind: BlockKind) -> usize {
        self.data
            .read()
            .unwrap()
            .values()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Get total bytes stored
    pub fn total_bytes(&self) -> usize {
        self.data.read().unwrap().values().map(|e| e.data.len()).sum()
    }

    /// Clear all data
    pub fn clear(&self) {
        self.data.write().unwrap().clear();
    }

    /// List all keys (hex-encoded blockhashes)
    pub fn keys(&self) -> Vec<String> {
        self.data.read().unwrap().keys().cloned().collect()
    }

    /// Overwrite a stored block without checking it
    pub fn replace(&self, hash: &BlockHash, data: Vec<u8>) -> bool {
        match self.data.write().unwrap().get_mut(&hash.to_hex()) {
            Some(entry) => {
                entry.data = data;
                true
            }
            None => false,
        }
    }
}

impl Store for MemoryStore {
    fn put(&self, kind: BlockKind, hash: &BlockHash, data: Vec<u8>) -> Result<bool, StoreError> {
        let key = hash.to_hex();
        let mut store = self.data.write().unwrap();
        if store.contains_key(&key) {
            return Ok(false);
        }
        store.insert(key, MemoryEntry { kind, data });
        Ok(true)
    }

    fn get(&self, _kind: BlockKind, hash: &BlockHash) -> Result<Option<Vec<u8>>, StoreError> {
        let store = self.data.read().unwrap();
        Ok(store.get(&hash.to_hex()).map(|e| e.data.clone()))
    }

    fn has(&self, _kind: BlockKind, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.data.read().unwrap().contains_key(&hash.to_hex()))
    }

    fn delete(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.data.write().unwrap().remove(&hash.to_hex()).is_some())
    }
}
