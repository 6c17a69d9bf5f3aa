pub mod btree;
pub mod btree_iterator;
pub mod btree_page;
pub mod key;

pub use btree::BPlusTree;
pub use btree_iterator::BPlusTreeIter;
pub use btree_page::{
    BTreePageRef, BTreePageType, HeaderPageMut, HeaderPageRef, InternalPageMut, InternalPageRef,
    LeafPageMut, LeafPageRef, INTERNAL_PAGE_CAPACITY, LEAF_PAGE_CAPACITY,
};
pub use key::{BytewiseComparator, IndexKey, IntegerComparator, KeyComparator};
