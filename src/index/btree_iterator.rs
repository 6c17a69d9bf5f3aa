use std::sync::Arc;

use crate::buffer::{BufferPoolManager, ReadPageGuard};
use crate::common::{AccessType, RecordId, Result, INVALID_PAGE_ID};

use super::btree_page::LeafPageRef;
use super::key::IndexKey;

/// Cursor over the leaf chain of a B+-tree, yielding entries in key order.
///
/// The cursor holds a read guard on the current leaf only; stepping across
/// a leaf boundary acquires the next leaf's guard before releasing the
/// current one, so the chain stays reachable under concurrent splits.
pub struct BPlusTreeIter {
    bpm: Arc<BufferPoolManager>,
    guard: Option<ReadPageGuard>,
    index: usize,
}

impl BPlusTreeIter {
    pub(crate) fn new(bpm: Arc<BufferPoolManager>, guard: ReadPageGuard, index: usize) -> Self {
        Self {
            bpm,
            guard: Some(guard),
            index,
        }
    }

    pub(crate) fn empty(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            guard: None,
            index: 0,
        }
    }

    /// Advances the cursor, following `next_page_id` across leaves.
    pub fn advance(&mut self) -> Result<Option<(IndexKey, RecordId)>> {
        loop {
            let Some(guard) = self.guard.as_ref() else {
                return Ok(None);
            };
            let leaf = LeafPageRef::new(guard.data());

            if self.index < leaf.size() {
                let entry = (leaf.key_at(self.index), leaf.value_at(self.index));
                self.index += 1;
                return Ok(Some(entry));
            }

            let next_page_id = leaf.next_page_id();
            if next_page_id == INVALID_PAGE_ID {
                self.guard = None;
                return Ok(None);
            }

            // Next leaf's latch before the current one is released.
            let next_guard = self.bpm.fetch_page_read(next_page_id, AccessType::Scan)?;
            self.guard = Some(next_guard);
            self.index = 0;
        }
    }
}

impl Iterator for BPlusTreeIter {
    type Item = Result<(IndexKey, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
