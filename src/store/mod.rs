//! # Storage Engine Module
//!
//! This module contains the storage components for cow_kv:
//!
//! - **`kv_trait`**: Common interface for all storage engines
//! - **`map_engine`**: `RwLock<HashMap>` baseline
//! - **`cow_node`**: Persistent copy-on-write trie node
//! - **`trie_engine`**: Store wrapper publishing `cow_node` versions
//! - **`mutable_trie`**: In-place trie, for comparison only
//!
//! All engines are in-memory; nothing survives the process.

pub mod cow_node;
pub mod kv_trait;
pub mod map_engine;
pub mod mutable_trie;
pub mod trie_engine;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use cow_node::CowNode;
pub use kv_trait::KvStore;
pub use map_engine::MapEngine;
pub use mutable_trie::MutableTrie;
pub use trie_engine::TrieEngine;

/// Which engine backs a store.
///
/// Deserializes through [`FromStr`], so configuration files and `COW_KV_*`
/// variables accept the same names as the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum EngineKind {
    /// `MapEngine`
    Map,
    /// `TrieEngine`
    #[default]
    Trie,
}

impl EngineKind {
    pub const ALL: [EngineKind; 2] = [EngineKind::Map, EngineKind::Trie];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Map => "map",
            EngineKind::Trie => "trie",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    /// Accepts "map"/"trie" and the longer "MapStore"/"TrieStore",
    /// case-insensitively.
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "map" | "mapstore" => Ok(EngineKind::Map),
            "trie" | "triestore" => Ok(EngineKind::Trie),
            _ => Err(anyhow!(
                "unknown engine type '{}' (available: map, trie)",
                s
            )),
        }
    }
}

impl TryFrom<String> for EngineKind {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        s.parse()
    }
}

/// Create an empty engine of the given kind.
pub fn open_engine(kind: EngineKind) -> Box<dyn KvStore> {
    match kind {
        EngineKind::Map => Box::new(MapEngine::new()),
        EngineKind::Trie => Box::new(TrieEngine::new()),
    }
}
