//! # Hash Map Engine
//!
//! Baseline engine: a `HashMap<String, String>` behind a single reader-writer
//! lock. Readers share the lock; every write takes it exclusively, so a long
//! write blocks all reads for its duration. Kept as the reference point the
//! trie engine is compared against.

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::kv_trait::KvStore;
use crate::error::{ensure_key, Result, StoreError};

/// Thread-safe in-memory key-value engine backed by `RwLock<HashMap>`.
///
/// **Note**: nothing is persisted. All data is lost when the engine is dropped.
#[derive(Debug, Default)]
pub struct MapEngine {
    data: RwLock<HashMap<String, String>>,
}

impl MapEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// True when no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KvStore for MapEngine {
    fn set(&self, key: String, value: String) -> Result<()> {
        ensure_key(&key)?;
        debug!("map set {key}");
        self.data.write().insert(key, value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<String> {
        ensure_key(key)?;
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(key))
    }

    fn delete(&self, key: &str) -> Result<()> {
        ensure_key(key)?;
        debug!("map delete {key}");
        match self.data.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::key_not_found(key)),
        }
    }

    fn name(&self) -> &'static str {
        "map"
    }
}
