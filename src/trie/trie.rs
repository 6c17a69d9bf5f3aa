//! A persistent, copy-on-write prefix map from byte strings to typed
//! values.
//!
//! Tries are immutable: `put` and `remove` return a new trie that shares
//! every untouched subtree with the receiver, so existing handles keep
//! observing the state they were built from. Sharing makes the structure
//! lock-free under concurrent use.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Tagged payload stored at a value node. `get` only succeeds when the
/// requested type matches the stored tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TrieValue {
    U32(u32),
    U64(u64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Conversion between Rust types and the tagged trie payload.
pub trait TrieValueType: Sized {
    fn into_value(self) -> TrieValue;
    fn from_value(value: &TrieValue) -> Option<&Self>;
}

impl TrieValueType for u32 {
    fn into_value(self) -> TrieValue {
        TrieValue::U32(self)
    }

    fn from_value(value: &TrieValue) -> Option<&Self> {
        match value {
            TrieValue::U32(v) => Some(v),
            _ => None,
        }
    }
}

impl TrieValueType for u64 {
    fn into_value(self) -> TrieValue {
        TrieValue::U64(self)
    }

    fn from_value(value: &TrieValue) -> Option<&Self> {
        match value {
            TrieValue::U64(v) => Some(v),
            _ => None,
        }
    }
}

impl TrieValueType for String {
    fn into_value(self) -> TrieValue {
        TrieValue::Str(self)
    }

    fn from_value(value: &TrieValue) -> Option<&Self> {
        match value {
            TrieValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl TrieValueType for Vec<u8> {
    fn into_value(self) -> TrieValue {
        TrieValue::Bytes(self)
    }

    fn from_value(value: &TrieValue) -> Option<&Self> {
        match value {
            TrieValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct TrieNode {
    /// Children keyed by the next byte; shared across trie versions
    children: BTreeMap<u8, Arc<TrieNode>>,
    /// Present iff this is a value node
    value: Option<TrieValue>,
}

impl TrieNode {
    /// Shallow copy: child subtrees stay shared.
    fn shallow_clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            value: self.value.clone(),
        }
    }
}

/// Handle on one immutable trie version.
#[derive(Debug, Default, Clone)]
pub struct Trie {
    root: Option<Arc<TrieNode>>,
}

impl Trie {
    /// An empty trie.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Looks up `key`, succeeding only on a value node whose payload type
    /// matches `T`.
    pub fn get<T: TrieValueType>(&self, key: &[u8]) -> Option<&T> {
        let mut node = self.root.as_ref()?;
        for byte in key {
            node = node.children.get(byte)?;
        }
        node.value.as_ref().and_then(T::from_value)
    }

    /// Returns a new trie with `value` stored at `key`. Only the nodes on
    /// the key's path are cloned; everything else is shared with the
    /// receiver. The terminal keeps its existing children.
    pub fn put<T: TrieValueType>(&self, key: &[u8], value: T) -> Trie {
        let root = Self::put_node(self.root.as_deref(), key, value.into_value());
        Trie {
            root: Some(Arc::new(root)),
        }
    }

    fn put_node(node: Option<&TrieNode>, key: &[u8], value: TrieValue) -> TrieNode {
        let mut new_node = node.map(TrieNode::shallow_clone).unwrap_or_default();
        match key.split_first() {
            None => {
                new_node.value = Some(value);
            }
            Some((&byte, rest)) => {
                let child = node.and_then(|n| n.children.get(&byte)).map(Arc::as_ref);
                let rebuilt = Self::put_node(child, rest, value);
                new_node.children.insert(byte, Arc::new(rebuilt));
            }
        }
        new_node
    }

    /// Returns a new trie without a value at `key`. When the key holds no
    /// value the result shares the receiver's root outright. Nodes left
    /// both childless and valueless are pruned, up to and including the
    /// root.
    pub fn remove(&self, key: &[u8]) -> Trie {
        let Some(root) = self.root.as_ref() else {
            return self.clone();
        };
        if !Self::has_value_at(root, key) {
            return self.clone();
        }
        Trie {
            root: Self::remove_node(root, key).map(Arc::new),
        }
    }

    fn has_value_at(root: &Arc<TrieNode>, key: &[u8]) -> bool {
        let mut node = root;
        for byte in key {
            match node.children.get(byte) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.value.is_some()
    }

    fn remove_node(node: &TrieNode, key: &[u8]) -> Option<TrieNode> {
        let mut new_node = node.shallow_clone();
        match key.split_first() {
            None => {
                new_node.value = None;
            }
            Some((&byte, rest)) => {
                if let Some(child) = node.children.get(&byte) {
                    match Self::remove_node(child, rest) {
                        Some(rebuilt) => {
                            new_node.children.insert(byte, Arc::new(rebuilt));
                        }
                        None => {
                            new_node.children.remove(&byte);
                        }
                    }
                }
            }
        }
        if new_node.children.is_empty() && new_node.value.is_none() {
            None
        } else {
            Some(new_node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trie_empty_get() {
        let trie = Trie::new();
        assert_eq!(trie.get::<u32>(b"missing"), None);
        assert_eq!(trie.get::<u32>(b""), None);
    }

    #[test]
    fn test_trie_put_get_round_trip() {
        let trie = Trie::new().put(b"hello", 42u32);
        assert_eq!(trie.get::<u32>(b"hello"), Some(&42));
        assert_eq!(trie.get::<u32>(b"hell"), None);
        assert_eq!(trie.get::<u32>(b"hello!"), None);
    }

    #[test]
    fn test_trie_type_mismatch_is_a_miss() {
        let trie = Trie::new().put(b"key", 7u32);
        assert_eq!(trie.get::<u64>(b"key"), None);
        assert_eq!(trie.get::<String>(b"key"), None);
        assert_eq!(trie.get::<u32>(b"key"), Some(&7));
    }

    #[test]
    fn test_trie_empty_key_re_roots() {
        let trie = Trie::new().put(b"a", 1u32).put(b"", 2u32);
        assert_eq!(trie.get::<u32>(b""), Some(&2));
        // The old root's children are shared by the new root.
        assert_eq!(trie.get::<u32>(b"a"), Some(&1));
    }

    #[test]
    fn test_trie_overwrite_keeps_children() {
        let trie = Trie::new().put(b"ab", 1u32).put(b"a", 2u32).put(b"a", 3u32);
        assert_eq!(trie.get::<u32>(b"a"), Some(&3));
        assert_eq!(trie.get::<u32>(b"ab"), Some(&1));
    }

    #[test]
    fn test_trie_remove_prunes() {
        let t0 = Trie::new();
        let t1 = t0.put(b"ab", 7u32);
        let t2 = t1.put(b"a", 9u32);
        let t3 = t2.remove(b"ab");

        assert_eq!(t3.get::<u32>(b"a"), Some(&9));
        assert_eq!(t3.get::<u32>(b"ab"), None);
        // Earlier versions are untouched.
        assert_eq!(t2.get::<u32>(b"ab"), Some(&7));
        assert_eq!(t0.get::<u32>(b"a"), None);
    }

    #[test]
    fn test_trie_remove_to_empty() {
        let trie = Trie::new().put(b"x", 1u32).remove(b"x");
        assert!(trie.root.is_none());
        assert_eq!(trie.get::<u32>(b"x"), None);
    }

    #[test]
    fn test_trie_remove_absent_shares_root() {
        let t1 = Trie::new().put(b"a", 1u32);
        let t2 = t1.remove(b"zzz");
        assert!(Arc::ptr_eq(t1.root.as_ref().unwrap(), t2.root.as_ref().unwrap()));
    }

    #[test]
    fn test_trie_structural_sharing() {
        let t1 = Trie::new().put(b"aa", 1u32).put(b"bb", 2u32);
        let t2 = t1.put(b"aa", 3u32);

        let b1 = t1.root.as_ref().unwrap().children.get(&b'b').unwrap();
        let b2 = t2.root.as_ref().unwrap().children.get(&b'b').unwrap();
        // The untouched 'b' subtree is the same allocation in both.
        assert!(Arc::ptr_eq(b1, b2));
    }
}
