//! # Copy-on-Write Trie Engine
//!
//! Store wrapper around [`CowNode`]. It keeps the current root and two locks:
//!
//! - **`write_lock`** (`Mutex<()>`): held for the whole of a `set`/`delete`,
//!   so only one writer builds a new version at a time. Without it two
//!   writers starting from the same root would each publish a version that
//!   lacks the other's change.
//! - **`root`** (`RwLock<Arc<CowNode>>`): held only to read or swap the root
//!   pointer. Readers take it long enough to clone the `Arc`, then traverse
//!   their snapshot with no lock at all.
//!
//! A reader therefore waits at most for a pointer swap, never for a writer's
//! tree walk, and always sees one complete version.

use log::debug;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

use super::cow_node::CowNode;
use super::kv_trait::KvStore;
use crate::error::{ensure_key, Result};

/// Thread-safe key-value engine backed by a persistent trie.
#[derive(Debug, Default)]
pub struct TrieEngine {
    write_lock: Mutex<()>,
    root: RwLock<Arc<CowNode>>,
}

impl TrieEngine {
    /// Create an engine whose root is an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published version.
    ///
    /// The returned root is immutable; later writes publish new roots and
    /// never show through it.
    pub fn snapshot(&self) -> Arc<CowNode> {
        self.root.read().clone()
    }

    /// Build a new version from the current one and publish it.
    ///
    /// On error nothing is published and the current root stays as it was.
    fn mutate<F>(&self, build: F) -> Result<()>
    where
        F: FnOnce(&CowNode) -> Result<CowNode>,
    {
        let _writer = self.write_lock.lock();
        let current = self.snapshot();
        let next = Arc::new(build(&*current)?);
        *self.root.write() = next;
        Ok(())
    }
}

impl KvStore for TrieEngine {
    fn set(&self, key: String, value: String) -> Result<()> {
        ensure_key(&key)?;
        debug!("trie set {key}");
        self.mutate(|root| Ok(root.set(&key, value)))
    }

    fn get(&self, key: &str) -> Result<String> {
        ensure_key(key)?;
        self.snapshot().get(key)
    }

    fn delete(&self, key: &str) -> Result<()> {
        ensure_key(key)?;
        debug!("trie delete {key}");
        self.mutate(|root| root.delete(key))
    }

    fn name(&self) -> &'static str {
        "trie"
    }
}
