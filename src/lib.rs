//! Keel - storage-engine primitives for a disk-oriented database
//!
//! This crate provides the storage substrate that higher-level query,
//! transaction, and recovery layers build on: a buffer pool caching disk
//! pages in memory, an LRU-K replacement policy picking eviction victims,
//! a latch-crabbing B+-tree index, and a persistent copy-on-write trie.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Storage Layer** (`storage`): Disk I/O
//!   - `DiskManager`: Reads and writes pages to/from a database file
//!   - `DiskScheduler`: Background disk I/O worker
//!
//! - **Buffer Pool** (`buffer`): Memory management for database pages
//!   - `BufferPoolManager`: Fetches pages from disk and caches them in memory
//!   - `LruKReplacer`: LRU-K page replacement policy
//!   - `Frame`: Per-frame metadata and page bytes
//!   - `BasicPageGuard`/`ReadPageGuard`/`WritePageGuard`: RAII guards
//!     combining a pin with an optional page latch
//!
//! - **Index** (`index`): Ordered secondary index
//!   - `BPlusTree`: Concurrent B+-tree using latch crabbing over page guards
//!   - `BPlusTreeIter`: Key-ordered cursor over the leaf chain
//!
//! - **Trie** (`trie`): Standalone persistent byte-keyed map with
//!   structural sharing; does not use the buffer pool
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use keel::buffer::BufferPoolManager;
//! use keel::common::{RecordId, PageId, SlotId};
//! use keel::index::{BPlusTree, IndexKey, IntegerComparator};
//! use keel::storage::disk::DiskManager;
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
//!
//! let tree = BPlusTree::new(Arc::clone(&bpm), IntegerComparator, 64, 64).unwrap();
//! let rid = RecordId::new(PageId::new(100), SlotId::new(0));
//! assert!(tree.insert(&IndexKey::from_integer(1), rid).unwrap());
//! assert_eq!(tree.get_value(&IndexKey::from_integer(1)).unwrap(), Some(rid));
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;
pub mod trie;

// Re-export commonly used types at the crate root
pub use common::{KeelError, PageId, RecordId, Result, SlotId};
