//! # KV Store Trait
//!
//! This module defines the common interface shared by every key-value engine
//! in cow_kv, so the server and the tests can swap engines without caring
//! which one sits underneath.
//!
//! ## Implementations
//!
//! - `MapEngine`: `RwLock<HashMap>` baseline
//! - `TrieEngine`: copy-on-write persistent trie with snapshot reads

use crate::error::Result;

/// Common interface for all key-value engines.
///
/// Engines are shared across threads behind an `Arc`, so they must be
/// `Send + Sync` and take `&self` for every operation.
pub trait KvStore: Send + Sync {
    /// Store a key-value pair, replacing any previous value.
    ///
    /// # Errors
    /// * `KeyIsEmpty` - `key` is the empty string
    fn set(&self, key: String, value: String) -> Result<()>;

    /// Retrieve the value stored under `key`.
    ///
    /// # Errors
    /// * `KeyIsEmpty` - `key` is the empty string
    /// * `KeyNotFound` - nothing is stored under `key`
    fn get(&self, key: &str) -> Result<String>;

    /// Remove the value stored under `key`.
    ///
    /// # Errors
    /// * `KeyIsEmpty` - `key` is the empty string
    /// * `KeyNotFound` - nothing is stored under `key`
    fn delete(&self, key: &str) -> Result<()>;

    /// Short engine name used in logs and `STATS` output.
    fn name(&self) -> &'static str;
}
