mod trie;

pub use trie::{Trie, TrieValue, TrieValueType};
