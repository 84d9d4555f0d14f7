//! # Store Errors
//!
//! Every engine reports failures through [`StoreError`]. Errors are returned
//! synchronously and never leave a store in a partially mutated state, so the
//! store stays usable after any of them.

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store layer and the trie nodes beneath it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The caller passed an empty key
    #[error("key is empty")]
    KeyIsEmpty,

    /// No value is stored under the key
    #[error("key not found: '{key}'")]
    KeyNotFound { key: String },

    /// A delete tried to clear the root node's own value
    #[error("deleting parent node not allowed")]
    ParentDeleteNotAllowed,
}

impl StoreError {
    /// Create a key not found error
    pub fn key_not_found<S: Into<String>>(key: S) -> Self {
        StoreError::KeyNotFound { key: key.into() }
    }

    /// True for the `KeyNotFound` variant, whatever key it carries.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::KeyNotFound { .. })
    }
}

/// Reject empty keys before an engine touches its state.
pub(crate) fn ensure_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::KeyIsEmpty);
    }
    Ok(())
}
