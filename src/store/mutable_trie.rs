//! # Mutable Trie
//!
//! Plain in-place trie, kept next to [`CowNode`](super::cow_node::CowNode)
//! for comparison. It needs `&mut self` for every write, so sharing it across
//! threads means wrapping the whole structure in a lock; it is not a
//! [`KvStore`](super::kv_trait::KvStore).

use std::collections::HashMap;

use crate::error::{Result, StoreError};

#[derive(Debug, Default)]
struct TrieNode {
    value: Option<String>,
    children: HashMap<char, TrieNode>,
}

/// Single-owner trie mapping string keys to string values.
#[derive(Debug, Default)]
pub struct MutableTrie {
    root: TrieNode,
    len: usize,
}

impl MutableTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys holding a value.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert or overwrite `key`.
    pub fn put(&mut self, key: &str, value: impl Into<String>) {
        let mut current = &mut self.root;
        for c in key.chars() {
            current = current.children.entry(c).or_default();
        }
        if current.value.replace(value.into()).is_none() {
            self.len += 1;
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        let mut current = &self.root;
        for c in key.chars() {
            current = current.children.get(&c)?;
        }
        current.value.as_deref()
    }

    /// Remove `key`, pruning nodes that are left with nothing below them.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let chars: Vec<char> = key.chars().collect();

        // `cut` ends up at the deepest node on the path that still matters
        // without `key`; everything below it on the path goes away.
        let mut cut = 0;
        let mut current = &self.root;
        for (depth, c) in chars.iter().enumerate() {
            if current.value.is_some() || current.children.len() > 1 {
                cut = depth;
            }
            current = current
                .children
                .get(c)
                .ok_or_else(|| StoreError::key_not_found(key))?;
        }
        if current.value.is_none() {
            return Err(StoreError::key_not_found(key));
        }

        if chars.is_empty() || !current.children.is_empty() {
            self.node_mut(&chars)
                .ok_or_else(|| StoreError::key_not_found(key))?
                .value = None;
        } else {
            self.node_mut(&chars[..cut])
                .ok_or_else(|| StoreError::key_not_found(key))?
                .children
                .remove(&chars[cut]);
        }
        self.len -= 1;
        Ok(())
    }

    fn node_mut(&mut self, path: &[char]) -> Option<&mut TrieNode> {
        let mut current = &mut self.root;
        for c in path {
            current = current.children.get_mut(c)?;
        }
        Some(current)
    }
}

impl Drop for TrieNode {
    fn drop(&mut self) {
        let mut pending: Vec<TrieNode> =
            std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}
