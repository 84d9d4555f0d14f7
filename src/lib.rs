//! # cow_kv
//!
//! In-memory key-value store with two interchangeable engines behind the
//! [`KvStore`] trait:
//!
//! - [`TrieEngine`]: a copy-on-write persistent trie. Writers are serialised
//!   and publish whole new versions; readers grab the current version and
//!   traverse it without holding any lock.
//! - [`MapEngine`]: a `RwLock<HashMap>` baseline.
//!
//! The [`server`] module exposes either engine over a small line protocol.

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{open_engine, CowNode, EngineKind, KvStore, MapEngine, MutableTrie, TrieEngine};
