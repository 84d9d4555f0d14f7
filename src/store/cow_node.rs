//! # Copy-on-Write Trie Node
//!
//! A persistent trie keyed by `char`. Every mutation returns a new root and
//! leaves the receiver untouched, so any number of versions can be read at
//! once while a writer builds the next one.
//!
//! ## Structural Sharing
//!
//! Children are held as `Arc<CowNode>`. Cloning a node copies its child map
//! (one `Arc` bump per entry) but none of the subtrees, so a mutation
//! allocates exactly one fresh node per character on the path it touches and
//! shares every sibling subtree with the previous version.
//!
//! ```text
//!   v1 root ──a──> n1 ──b──> n2("x")
//!                   └──c──> n3("y")
//!
//!   v2 = v1.set("ab", "z")
//!
//!   v2 root ──a──> n1' ──b──> n2'("z")
//!                   └──c──> n3("y")      (shared with v1)
//! ```
//!
//! A node reachable from a published root is never modified again.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, StoreError};

/// One node of the persistent trie; also the handle to a whole version when
/// used as a root.
#[derive(Debug, Clone, Default)]
pub struct CowNode {
    value: Option<Arc<str>>,
    children: HashMap<char, Arc<CowNode>>,
}

/// Outcome of deleting below a node, reported back to its parent.
enum Deletion {
    /// Install this clone in place of the old child.
    Kept(CowNode),
    /// The child ended up with no value and no children; drop the edge.
    Collapsed,
}

impl Deletion {
    fn of(node: CowNode) -> Self {
        if node.is_empty() {
            Deletion::Collapsed
        } else {
            Deletion::Kept(node)
        }
    }
}

impl CowNode {
    /// Create an empty node with no value and no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// The value stored at this exact node, if any.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// The child reached through `c`, if any.
    pub fn child(&self, c: char) -> Option<&Arc<CowNode>> {
        self.children.get(&c)
    }

    /// True when the node carries neither a value nor children.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Number of nodes reachable from this one, itself included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.values().map(|child| &**child));
        }
        count
    }

    /// Return a new version with `key` mapped to `value`.
    ///
    /// The empty key targets the receiver itself: the result is a clone with
    /// its value replaced. Otherwise every node on the path to `key` is
    /// freshly allocated and all other subtrees are shared with `self`.
    pub fn set(&self, key: &str, value: impl Into<Arc<str>>) -> CowNode {
        // Each step down records the node being left (if the path still
        // exists there) and the edge taken.
        let mut path: Vec<(Option<&CowNode>, char)> = Vec::new();
        let mut current = Some(self);
        for c in key.chars() {
            path.push((current, c));
            current = current
                .and_then(|node| node.children.get(&c))
                .map(|child| &**child);
        }

        let mut node = current.cloned().unwrap_or_default();
        node.value = Some(value.into());

        for (parent, c) in path.into_iter().rev() {
            let mut clone = parent.cloned().unwrap_or_default();
            clone.children.insert(c, Arc::new(node));
            node = clone;
        }
        node
    }

    /// Borrow the value stored under `key` without allocating.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let mut current = self;
        for c in key.chars() {
            current = current.children.get(&c)?;
        }
        current.value()
    }

    /// Read the value stored under `key`.
    ///
    /// Pure traversal: safe to run on any published version concurrently
    /// with other reads and with writers building newer versions.
    pub fn get(&self, key: &str) -> Result<String> {
        self.lookup(key)
            .map(str::to_owned)
            .ok_or_else(|| StoreError::key_not_found(key))
    }

    /// Return a new version without `key`.
    ///
    /// Nodes left with no value and no children are pruned on the way back
    /// up, so no dead chains survive the delete. The root itself is never
    /// pruned.
    ///
    /// # Errors
    /// * `ParentDeleteNotAllowed` - `key` is empty, i.e. it names the root
    /// * `KeyNotFound` - the path does not exist or holds no value
    pub fn delete(&self, key: &str) -> Result<CowNode> {
        let mut path: Vec<(&CowNode, char)> = Vec::new();
        let mut current = self;
        for c in key.chars() {
            let child = current
                .children
                .get(&c)
                .ok_or_else(|| StoreError::key_not_found(key))?;
            path.push((current, c));
            current = child;
        }

        let Some(((root, first), below_root)) = path.split_first() else {
            return Err(StoreError::ParentDeleteNotAllowed);
        };
        if current.value.is_none() {
            return Err(StoreError::key_not_found(key));
        }

        // Nothing is cloned until the whole path is known to exist.
        let mut target = current.clone();
        target.value = None;
        let mut outcome = Deletion::of(target);

        for (parent, c) in below_root.iter().rev() {
            let mut clone = CowNode::clone(parent);
            clone.replace_child(*c, outcome);
            outcome = Deletion::of(clone);
        }

        let mut new_root = CowNode::clone(root);
        new_root.replace_child(*first, outcome);
        Ok(new_root)
    }

    fn replace_child(&mut self, c: char, outcome: Deletion) {
        match outcome {
            Deletion::Kept(node) => {
                self.children.insert(c, Arc::new(node));
            }
            Deletion::Collapsed => {
                self.children.remove(&c);
            }
        }
    }
}

impl Drop for CowNode {
    /// Unlinks the subtree one node at a time so that long chains do not
    /// recurse once per level. Children still shared with another version
    /// only lose a reference.
    fn drop(&mut self) {
        let mut pending: Vec<Arc<CowNode>> =
            std::mem::take(&mut self.children).into_values().collect();
        while let Some(child) = pending.pop() {
            if let Ok(mut node) = Arc::try_unwrap(child) {
                pending.extend(std::mem::take(&mut node.children).into_values());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ENTRIES: &[(&str, &str)] = &[
        ("key1", "value1"),
        ("key2", "value2"),
        ("key3", "value3"),
        ("key4", "value3"),
        ("key5", "value3"),
        ("a", "1"),
        ("ab", "2"),
        ("abc", "3"),
        ("abcd", "4"),
        ("abcde", "5"),
        ("abcdef", "6"),
        ("abcdefg", "7"),
        ("abcdefgh", "8"),
    ];

    fn populated() -> CowNode {
        ENTRIES
            .iter()
            .fold(CowNode::new(), |root, (k, v)| root.set(k, *v))
    }

    /// Every non-root node must hold a value or lead to one.
    fn assert_pruned(node: &CowNode) {
        for child in node.children.values() {
            assert!(!child.is_empty(), "empty node left behind by delete");
            assert_pruned(child);
        }
    }

    #[test]
    fn test_get_missing_key() {
        let root = CowNode::new();
        assert_eq!(
            root.get("non existing key"),
            Err(StoreError::key_not_found("non existing key"))
        );
    }

    #[test]
    fn test_set_and_get() {
        let mut root = CowNode::new();
        for (k, v) in ENTRIES {
            root = root.set(k, *v);
            assert_eq!(root.get(k).unwrap(), *v);
        }
        for (k, v) in ENTRIES {
            assert_eq!(root.get(k).unwrap(), *v);
        }
    }

    #[test]
    fn test_set_and_get_reverse() {
        let mut root = CowNode::new();
        for (k, v) in ENTRIES.iter().rev() {
            root = root.set(k, *v);
            assert_eq!(root.get(k).unwrap(), *v);
        }
        for (k, v) in ENTRIES {
            assert_eq!(root.get(k).unwrap(), *v);
        }
    }

    #[test]
    fn test_prefix_without_value_is_not_found() {
        let root = CowNode::new().set("abc", "3");
        assert!(root.get("ab").unwrap_err().is_not_found());
        assert!(root.get("abcd").unwrap_err().is_not_found());
    }

    #[test]
    fn test_overwrite() {
        let root = CowNode::new().set("k", "v1").set("k", "v2");
        assert_eq!(root.get("k").unwrap(), "v2");
    }

    #[test]
    fn test_empty_string_is_a_value() {
        let root = CowNode::new().set("k", "");
        assert_eq!(root.get("k").unwrap(), "");
        let root = root.delete("k").unwrap();
        assert!(root.get("k").unwrap_err().is_not_found());
    }

    #[test]
    fn test_set_empty_key_clones_root() {
        let old = CowNode::new();
        let new = old.set("", "root value");
        assert_eq!(new.value(), Some("root value"));
        assert_eq!(old.value(), None);
    }

    #[test]
    fn test_unicode_keys() {
        let root = CowNode::new().set("用户键", "a").set("用户", "b");
        assert_eq!(root.get("用户键").unwrap(), "a");
        assert_eq!(root.get("用户").unwrap(), "b");
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_old_version_is_unchanged() {
        let v1 = CowNode::new().set("key", "before");
        let v2 = v1.set("key", "after").set("other", "x");
        assert_eq!(v1.get("key").unwrap(), "before");
        assert!(v1.get("other").unwrap_err().is_not_found());
        assert_eq!(v2.get("key").unwrap(), "after");

        let v3 = v2.delete("key").unwrap();
        assert_eq!(v2.get("key").unwrap(), "after");
        assert!(v3.get("key").unwrap_err().is_not_found());
    }

    #[test]
    fn test_untouched_subtrees_are_shared() {
        let v1 = CowNode::new().set("ab", "x").set("ac", "y").set("z", "w");
        let v2 = v1.set("ab", "changed");

        let a1 = v1.child('a').unwrap();
        let a2 = v2.child('a').unwrap();
        assert!(!Arc::ptr_eq(a1, a2));
        assert!(Arc::ptr_eq(a1.child('c').unwrap(), a2.child('c').unwrap()));
        assert!(Arc::ptr_eq(v1.child('z').unwrap(), v2.child('z').unwrap()));
        assert!(!Arc::ptr_eq(a1.child('b').unwrap(), a2.child('b').unwrap()));
    }

    #[test]
    fn test_delete_missing_key() {
        let root = CowNode::new();
        assert!(root.delete("non existing key").unwrap_err().is_not_found());

        let root = root.set("abc", "3");
        assert!(root.delete("ab").unwrap_err().is_not_found());
        assert!(root.delete("abd").unwrap_err().is_not_found());
        assert_eq!(root.get("abc").unwrap(), "3");
    }

    #[test]
    fn test_cannot_delete_root() {
        let root = CowNode::new();
        assert_eq!(root.delete("").unwrap_err(), StoreError::ParentDeleteNotAllowed);

        let root = root.set("", "v");
        assert_eq!(root.delete("").unwrap_err(), StoreError::ParentDeleteNotAllowed);
        assert_eq!(root.value(), Some("v"));
    }

    #[test]
    fn test_set_and_delete() {
        let mut root = populated();
        for (k, _) in ENTRIES {
            root = root.delete(k).unwrap();
            assert!(root.get(k).unwrap_err().is_not_found());
        }
        for (k, _) in ENTRIES {
            assert!(root.get(k).unwrap_err().is_not_found());
        }
        assert!(root.is_empty());
    }

    #[test]
    fn test_delete_in_order() {
        let mut root = populated();
        for (i, (k, _)) in ENTRIES.iter().enumerate() {
            root = root.delete(k).unwrap();
            for (rest_k, rest_v) in &ENTRIES[i + 1..] {
                assert_eq!(root.get(rest_k).unwrap(), *rest_v);
            }
            assert!(root.get(k).unwrap_err().is_not_found());
            assert_pruned(&root);
        }
    }

    #[test]
    fn test_delete_in_reverse_order() {
        let mut root = populated();
        for (i, (k, _)) in ENTRIES.iter().enumerate().rev() {
            root = root.delete(k).unwrap();
            for (rest_k, rest_v) in &ENTRIES[..i] {
                assert_eq!(root.get(rest_k).unwrap(), *rest_v);
            }
            assert!(root.get(k).unwrap_err().is_not_found());
            assert_pruned(&root);
        }
    }

    #[test]
    fn test_delete_keeps_longer_keys() {
        let root = CowNode::new().set("a", "1").set("ab", "2").set("abc", "3");

        let root = root.delete("a").unwrap();
        assert!(root.get("a").unwrap_err().is_not_found());
        assert_eq!(root.get("ab").unwrap(), "2");
        assert_eq!(root.get("abc").unwrap(), "3");

        let root = root.delete("ab").unwrap();
        assert!(root.get("ab").unwrap_err().is_not_found());
        assert_eq!(root.get("abc").unwrap(), "3");
        assert_eq!(root.node_count(), 4);
    }

    #[test]
    fn test_delete_prunes_dead_chain() {
        let root = CowNode::new().set("ab", "x").set("abcdef", "y");
        assert_eq!(root.node_count(), 7);

        // Everything below "ab" existed only for "abcdef"
        let root = root.delete("abcdef").unwrap();
        assert_eq!(root.node_count(), 3);
        assert_eq!(root.get("ab").unwrap(), "x");

        let root = root.delete("ab").unwrap();
        assert_eq!(root.node_count(), 1);
        assert!(root.is_empty());
    }

    #[test]
    fn test_failed_delete_leaves_receiver_intact() {
        let root = CowNode::new().set("abc", "3");
        let before = root.node_count();
        assert!(root.delete("abx").is_err());
        assert_eq!(root.node_count(), before);
        assert_eq!(root.get("abc").unwrap(), "3");
    }

    #[test]
    fn test_very_long_key() {
        let key = "k".repeat(200_000);
        let base = CowNode::new().set("k", "short");

        let v1 = base.set(&key, "long");
        assert_eq!(v1.get(&key).unwrap(), "long");
        assert_eq!(v1.node_count(), 200_001);

        let v2 = v1.set(&key, "longer");
        assert_eq!(v1.get(&key).unwrap(), "long");
        assert_eq!(v2.get(&key).unwrap(), "longer");

        let v3 = v2.delete(&key).unwrap();
        assert!(v3.get(&key).unwrap_err().is_not_found());
        assert_eq!(v3.get("k").unwrap(), "short");
        assert_eq!(v3.node_count(), 2);

        // Dropping versions that share most of a long chain
        drop(v1);
        drop(v2);
        assert_eq!(v3.get("k").unwrap(), "short");
    }

    #[test]
    fn test_drop_long_chain_on_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(64 * 1024)
            .spawn(|| {
                let key = "x".repeat(100_000);
                let root = CowNode::new().set(&key, "v");
                assert_eq!(root.lookup(&key), Some("v"));
                let pruned = root.delete(&key).unwrap();
                assert!(pruned.is_empty());
            })
            .unwrap();
        handle.join().unwrap();
    }

    proptest! {
        #[test]
        fn prop_versions_match_model(
            ops in prop::collection::vec((any::<bool>(), "[abc]{1,4}", "[a-z]{0,3}"), 1..64)
        ) {
            let mut root = CowNode::new();
            let mut model: HashMap<String, String> = HashMap::new();
            let mut versions = Vec::new();

            for (is_set, key, value) in ops {
                if is_set {
                    root = root.set(&key, value.as_str());
                    model.insert(key, value);
                } else {
                    match root.delete(&key) {
                        Ok(next) => {
                            prop_assert!(model.remove(&key).is_some());
                            root = next;
                        }
                        Err(e) => {
                            prop_assert!(e.is_not_found());
                            prop_assert!(!model.contains_key(&key));
                        }
                    }
                }
                assert_pruned(&root);
                versions.push((root.clone(), model.clone()));
            }

            // Every earlier version still answers exactly as it did when built
            for (version, snapshot) in &versions {
                for (k, v) in snapshot {
                    prop_assert_eq!(version.lookup(k), Some(v.as_str()));
                }
            }
        }
    }
}
