use std::sync::Arc;

use log::debug;

use crate::buffer::{BufferPoolManager, WritePageGuard};
use crate::common::{AccessType, PageId, RecordId, Result, INVALID_PAGE_ID};

use super::btree_iterator::BPlusTreeIter;
use super::btree_page::{
    BTreePageRef, HeaderPageMut, HeaderPageRef, InternalPageMut, InternalPageRef, LeafPageMut,
    LeafPageRef,
};
use super::key::{IndexKey, KeyComparator};

/// Guards held across a structural operation: the write set is the
/// root-to-leaf chain of pages that may still change, and the header guard
/// is retained only while the root itself may change.
struct Context {
    header: Option<WritePageGuard>,
    write_set: Vec<WritePageGuard>,
}

/// A concurrent ordered unique index from fixed-width keys to record ids,
/// stored in buffer-pool pages and traversed with latch crabbing.
///
/// Readers crab downward with shared latches, acquiring each child before
/// releasing its parent. Writers crab with exclusive latches and release
/// every ancestor above the deepest node that might still split (insert)
/// or underflow (remove). The header page holds the root page id and is
/// kept latched across a write only when the root may change, which
/// serializes root replacement against everyone else passing through it.
pub struct BPlusTree<C: KeyComparator> {
    bpm: Arc<BufferPoolManager>,
    header_page_id: PageId,
    comparator: C,
    leaf_max_size: usize,
    internal_max_size: usize,
}

impl<C: KeyComparator> BPlusTree<C> {
    /// Creates a new, empty tree, allocating its header page.
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        let (header_page_id, guard) = bpm.new_page()?;
        {
            let mut header_guard = guard.upgrade_write();
            HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(INVALID_PAGE_ID);
        }
        Ok(Self {
            bpm,
            header_page_id,
            comparator,
            leaf_max_size,
            internal_max_size,
        })
    }

    /// Reattaches to an existing tree by its header page.
    pub fn open(
        bpm: Arc<BufferPoolManager>,
        header_page_id: PageId,
        comparator: C,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        Self {
            bpm,
            header_page_id,
            comparator,
            leaf_max_size,
            internal_max_size,
        }
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.root_page_id()? == INVALID_PAGE_ID)
    }

    /// Current root page id, `INVALID_PAGE_ID` for an empty tree.
    pub fn root_page_id(&self) -> Result<PageId> {
        let guard = self
            .bpm
            .fetch_page_read(self.header_page_id, AccessType::Index)?;
        Ok(HeaderPageRef::new(guard.data()).root_page_id())
    }

    /// Point lookup with reader-latch crabbing.
    pub fn get_value(&self, key: &IndexKey) -> Result<Option<RecordId>> {
        let header_guard = self
            .bpm
            .fetch_page_read(self.header_page_id, AccessType::Index)?;
        let root_page_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if root_page_id == INVALID_PAGE_ID {
            return Ok(None);
        }

        let mut guard = self.bpm.fetch_page_read(root_page_id, AccessType::Index)?;
        drop(header_guard);

        while !BTreePageRef::new(guard.data()).is_leaf() {
            let next_page_id = {
                let page = InternalPageRef::new(guard.data());
                page.value_at(page.key_index(key, &self.comparator))
            };
            // Child latch before parent release.
            let child = self.bpm.fetch_page_read(next_page_id, AccessType::Index)?;
            guard = child;
        }

        Ok(LeafPageRef::new(guard.data()).get_value(key, &self.comparator))
    }

    /// Inserts a unique (key, value) pair. Returns false if the key is
    /// already present.
    pub fn insert(&self, key: &IndexKey, value: RecordId) -> Result<bool> {
        let mut header_guard = self
            .bpm
            .fetch_page_write(self.header_page_id, AccessType::Index)?;
        let root_page_id = HeaderPageRef::new(header_guard.data()).root_page_id();

        // Empty-tree fast path: the first leaf becomes the root.
        if root_page_id == INVALID_PAGE_ID {
            let (new_root_id, guard) = self.bpm.new_page()?;
            {
                let mut leaf_guard = guard.upgrade_write();
                let mut leaf = LeafPageMut::new(leaf_guard.data_mut());
                leaf.init(self.leaf_max_size);
                leaf.insert_at_back(key, value);
            }
            HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(new_root_id);
            debug!("created root leaf {}", new_root_id);
            return Ok(true);
        }

        // Crab down with write latches, keeping the whole chain for now.
        let mut ctx = Context {
            header: Some(header_guard),
            write_set: Vec::new(),
        };
        let mut current = self.bpm.fetch_page_write(root_page_id, AccessType::Index)?;
        while !BTreePageRef::new(current.data()).is_leaf() {
            let next_page_id = {
                let page = InternalPageRef::new(current.data());
                page.value_at(page.key_index(key, &self.comparator))
            };
            let child = self.bpm.fetch_page_write(next_page_id, AccessType::Index)?;
            ctx.write_set.push(current);
            current = child;
        }
        let mut leaf_guard = current;

        // Duplicate check before any structural work.
        if LeafPageRef::new(leaf_guard.data())
            .get_value(key, &self.comparator)
            .is_some()
        {
            return Ok(false);
        }

        // Work out which suffix of the chain still needs to stay latched:
        // a leaf splits when this insertion fills it, an internal splits
        // when the lifted separator would not fit.
        let depth = ctx.write_set.len() + 1;
        let mut modification_count = 1;
        let mut need_split = {
            let leaf = LeafPageRef::new(leaf_guard.data());
            leaf.size() + 1 == leaf.max_size()
        };
        for i in (0..ctx.write_set.len()).rev() {
            if !need_split {
                break;
            }
            modification_count += 1;
            let page = InternalPageRef::new(ctx.write_set[i].data());
            need_split = page.size() == page.max_size();
        }
        let root_change = need_split && modification_count == depth;

        // Release the header unless the root may change, then every
        // ancestor above the retained suffix, top down.
        if !root_change {
            ctx.header = None;
        }
        let release_count = ctx.write_set.len() - (modification_count - 1);
        ctx.write_set.drain(..release_count);

        // Leaf insertion, splitting if it fills up.
        let mut pending: Option<(IndexKey, PageId)> = None;
        let leaf_page_id = leaf_guard.page_id();
        {
            let mut leaf = LeafPageMut::new(leaf_guard.data_mut());
            leaf.insert_value(key, value, &self.comparator);

            if leaf.size() == leaf.max_size() {
                let split_index = leaf.max_size() / 2;
                let (new_page_id, new_guard) = self.bpm.new_page()?;
                let mut new_leaf_guard = new_guard.upgrade_write();
                let mut new_leaf = LeafPageMut::new(new_leaf_guard.data_mut());
                new_leaf.init(self.leaf_max_size);
                new_leaf.set_next_page_id(leaf.next_page_id());
                for i in split_index..leaf.max_size() {
                    new_leaf.insert_at_back(&leaf.key_at(i), leaf.value_at(i));
                }
                leaf.reduce_to_half();
                leaf.set_next_page_id(new_page_id);
                pending = Some((new_leaf.key_at(0), new_page_id));
                debug!("split leaf {} -> {}", leaf_page_id, new_page_id);
            }
        }
        drop(leaf_guard);

        // Propagate the separator up the retained chain.
        while let Some((sep_key, sep_child)) = pending.take() {
            let Some(mut inner_guard) = ctx.write_set.pop() else {
                pending = Some((sep_key, sep_child));
                break;
            };
            let inner_page_id = inner_guard.page_id();
            let mut inner = InternalPageMut::new(inner_guard.data_mut());

            if inner.size() < inner.max_size() {
                inner.insert_value(&sep_key, sep_child, &self.comparator);
                continue;
            }

            // Split around (max + 1) / 2. Where the incoming pair falls
            // decides which existing key is lifted; when it falls exactly
            // on the split point the incoming key itself is lifted and
            // needs no insertion afterwards.
            let max_size = inner.max_size();
            let split_index = (max_size + 1) / 2;
            let to_insert = inner.as_ref().key_index(&sep_key, &self.comparator) + 1;

            let insert_to_lower = to_insert < split_index;
            let (lift_key, lift_child, right_first) = if to_insert < split_index {
                (
                    inner.key_at(split_index - 1),
                    inner.value_at(split_index - 1),
                    split_index,
                )
            } else if to_insert > split_index {
                (
                    inner.key_at(split_index),
                    inner.value_at(split_index),
                    split_index + 1,
                )
            } else {
                (sep_key, sep_child, split_index)
            };

            let (new_page_id, new_guard) = self.bpm.new_page()?;
            let mut new_inner_guard = new_guard.upgrade_write();
            let mut new_inner = InternalPageMut::new(new_inner_guard.data_mut());
            new_inner.init(self.internal_max_size);
            // The lifted pair becomes the new sibling's fence slot.
            new_inner.insert_at_back(&lift_key, lift_child);
            for i in right_first..max_size {
                new_inner.insert_at_back(&inner.key_at(i), inner.value_at(i));
            }
            inner.reduce_to_half(insert_to_lower);

            if to_insert < split_index {
                inner.insert_value(&sep_key, sep_child, &self.comparator);
            } else if to_insert > split_index {
                new_inner.insert_value(&sep_key, sep_child, &self.comparator);
            }

            debug!("split internal {} -> {}", inner_page_id, new_page_id);
            pending = Some((lift_key, new_page_id));
        }

        // The split reached above the old root: grow the tree by one level.
        if let Some((sep_key, sep_child)) = pending {
            if let Some(mut header_guard) = ctx.header.take() {
                let old_root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
                let (new_root_id, new_guard) = self.bpm.new_page()?;
                {
                    let mut root_guard = new_guard.upgrade_write();
                    let mut root = InternalPageMut::new(root_guard.data_mut());
                    root.init(self.internal_max_size);
                    root.populate_new_root(old_root_id, &sep_key, sep_child);
                }
                HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(new_root_id);
                debug!("new root {} over {}", new_root_id, old_root_id);
            }
        }

        Ok(true)
    }

    /// Removes a key if present. Underflowing pages borrow from a sibling
    /// when it has entries to spare, otherwise merge; the root collapses
    /// when an internal root is left with a single child.
    pub fn remove(&self, key: &IndexKey) -> Result<()> {
        let header_guard = self
            .bpm
            .fetch_page_write(self.header_page_id, AccessType::Index)?;
        let root_page_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if root_page_id == INVALID_PAGE_ID {
            return Ok(());
        }

        let mut ctx = Context {
            header: Some(header_guard),
            write_set: Vec::new(),
        };
        // Child slot taken at each internal page on the path.
        let mut slots: Vec<usize> = Vec::new();

        let mut current = self.bpm.fetch_page_write(root_page_id, AccessType::Index)?;
        while !BTreePageRef::new(current.data()).is_leaf() {
            let (slot, next_page_id) = {
                let page = InternalPageRef::new(current.data());
                let slot = page.key_index(key, &self.comparator);
                (slot, page.value_at(slot))
            };
            let child = self.bpm.fetch_page_write(next_page_id, AccessType::Index)?;
            ctx.write_set.push(current);
            slots.push(slot);
            current = child;
        }
        let mut leaf_guard = current;

        if LeafPageRef::new(leaf_guard.data())
            .get_value(key, &self.comparator)
            .is_none()
        {
            return Ok(());
        }

        // Retain the suffix of the chain that may still change: a page may
        // underflow when the loss of one entry puts it below its minimum.
        let depth = ctx.write_set.len() + 1;
        let mut modification_count = 1;
        let mut may_underflow = {
            let leaf = LeafPageRef::new(leaf_guard.data());
            leaf.size() <= leaf.min_size()
        };
        for i in (0..ctx.write_set.len()).rev() {
            if !may_underflow {
                break;
            }
            modification_count += 1;
            let page = InternalPageRef::new(ctx.write_set[i].data());
            may_underflow = page.size() <= page.min_size();
        }
        let root_may_change = may_underflow && modification_count == depth;

        if !root_may_change {
            ctx.header = None;
        }
        let release_count = ctx.write_set.len() - (modification_count - 1);
        ctx.write_set.drain(..release_count);
        slots.drain(..release_count);

        {
            let mut leaf = LeafPageMut::new(leaf_guard.data_mut());
            leaf.remove_value(key, &self.comparator);
        }

        // Walk back up repairing underflow until a level absorbs it.
        let mut child_guard = leaf_guard;
        let mut child_is_leaf = true;
        loop {
            let (size, min_size) = if child_is_leaf {
                let view = LeafPageRef::new(child_guard.data());
                (view.size(), view.min_size())
            } else {
                let view = InternalPageRef::new(child_guard.data());
                (view.size(), view.min_size())
            };

            if ctx.write_set.is_empty() {
                self.shrink_root(&mut ctx, child_guard, child_is_leaf)?;
                return Ok(());
            }
            if size >= min_size {
                return Ok(());
            }

            let Some(mut parent_guard) = ctx.write_set.pop() else {
                return Ok(());
            };
            let slot = slots.pop().unwrap_or(0);

            if child_is_leaf {
                self.repair_leaf_underflow(&mut parent_guard, slot, child_guard)?;
            } else {
                self.repair_internal_underflow(&mut parent_guard, slot, child_guard)?;
            }

            child_guard = parent_guard;
            child_is_leaf = false;
        }
    }

    /// Iterator from the leftmost leaf.
    pub fn iter(&self) -> Result<BPlusTreeIter> {
        let header_guard = self
            .bpm
            .fetch_page_read(self.header_page_id, AccessType::Scan)?;
        let root_page_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if root_page_id == INVALID_PAGE_ID {
            return Ok(BPlusTreeIter::empty(Arc::clone(&self.bpm)));
        }

        let mut guard = self.bpm.fetch_page_read(root_page_id, AccessType::Scan)?;
        drop(header_guard);

        while !BTreePageRef::new(guard.data()).is_leaf() {
            let next_page_id = InternalPageRef::new(guard.data()).value_at(0);
            let child = self.bpm.fetch_page_read(next_page_id, AccessType::Scan)?;
            guard = child;
        }

        Ok(BPlusTreeIter::new(Arc::clone(&self.bpm), guard, 0))
    }

    /// Iterator positioned at the first key >= `key`.
    pub fn iter_from(&self, key: &IndexKey) -> Result<BPlusTreeIter> {
        let header_guard = self
            .bpm
            .fetch_page_read(self.header_page_id, AccessType::Scan)?;
        let root_page_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if root_page_id == INVALID_PAGE_ID {
            return Ok(BPlusTreeIter::empty(Arc::clone(&self.bpm)));
        }

        let mut guard = self.bpm.fetch_page_read(root_page_id, AccessType::Scan)?;
        drop(header_guard);

        while !BTreePageRef::new(guard.data()).is_leaf() {
            let next_page_id = {
                let page = InternalPageRef::new(guard.data());
                page.value_at(page.key_index(key, &self.comparator))
            };
            let child = self.bpm.fetch_page_read(next_page_id, AccessType::Scan)?;
            guard = child;
        }

        let index = LeafPageRef::new(guard.data()).index_at(key, &self.comparator);
        Ok(BPlusTreeIter::new(Arc::clone(&self.bpm), guard, index))
    }

    /// Handles an underflowing root: an emptied leaf root unsets the tree,
    /// an internal root with a single child hands the root over to it.
    fn shrink_root(
        &self,
        ctx: &mut Context,
        root_guard: WritePageGuard,
        root_is_leaf: bool,
    ) -> Result<()> {
        if root_is_leaf {
            if LeafPageRef::new(root_guard.data()).size() > 0 {
                return Ok(());
            }
            if let Some(mut header_guard) = ctx.header.take() {
                HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(INVALID_PAGE_ID);
            }
            let page_id = root_guard.page_id();
            drop(root_guard);
            let _ = self.bpm.delete_page(page_id)?;
            debug!("tree emptied, freed root leaf {}", page_id);
            return Ok(());
        }

        let view = InternalPageRef::new(root_guard.data());
        if view.size() > 1 {
            return Ok(());
        }
        let only_child = view.value_at(0);
        if let Some(mut header_guard) = ctx.header.take() {
            HeaderPageMut::new(header_guard.data_mut()).set_root_page_id(only_child);
        }
        let page_id = root_guard.page_id();
        drop(root_guard);
        let _ = self.bpm.delete_page(page_id)?;
        debug!("collapsed root {} into {}", page_id, only_child);
        Ok(())
    }

    /// Repairs an underflowing leaf under a latched parent. Prefers the
    /// right sibling; the left sibling is only used for the parent's last
    /// child, and then the leaf's latch is dropped and reacquired after
    /// the sibling's so sibling latches are always taken left to right
    /// (the order readers walk the leaf chain). The parent's latch keeps
    /// the leaf stable in between.
    fn repair_leaf_underflow(
        &self,
        parent_guard: &mut WritePageGuard,
        slot: usize,
        mut leaf_guard: WritePageGuard,
    ) -> Result<()> {
        let parent_size = InternalPageRef::new(parent_guard.data()).size();
        debug_assert!(parent_size >= 2);

        if slot + 1 < parent_size {
            let right_id = InternalPageRef::new(parent_guard.data()).value_at(slot + 1);
            let mut right_guard = self.bpm.fetch_page_write(right_id, AccessType::Index)?;

            let (right_size, right_min) = {
                let view = LeafPageRef::new(right_guard.data());
                (view.size(), view.min_size())
            };

            if right_size > right_min {
                // Borrow the right sibling's first entry.
                let (borrow_key, borrow_value) = {
                    let view = LeafPageRef::new(right_guard.data());
                    (view.key_at(0), view.value_at(0))
                };
                LeafPageMut::new(right_guard.data_mut()).remove_at(0);
                LeafPageMut::new(leaf_guard.data_mut()).insert_at_back(&borrow_key, borrow_value);
                let new_separator = LeafPageRef::new(right_guard.data()).key_at(0);
                InternalPageMut::new(parent_guard.data_mut()).set_key_at(slot + 1, &new_separator);
            } else {
                // Merge the right sibling into this leaf.
                {
                    let right = LeafPageRef::new(right_guard.data());
                    let mut leaf = LeafPageMut::new(leaf_guard.data_mut());
                    for i in 0..right.size() {
                        leaf.insert_at_back(&right.key_at(i), right.value_at(i));
                    }
                    leaf.set_next_page_id(right.next_page_id());
                }
                InternalPageMut::new(parent_guard.data_mut()).remove_at(slot + 1);
                drop(right_guard);
                let _ = self.bpm.delete_page(right_id)?;
                debug!("merged leaf {} leftward", right_id);
            }
            return Ok(());
        }

        // Last child: go through the left sibling, reacquiring our own
        // latch after it.
        let left_id = InternalPageRef::new(parent_guard.data()).value_at(slot - 1);
        let leaf_id = leaf_guard.page_id();
        drop(leaf_guard);
        let mut left_guard = self.bpm.fetch_page_write(left_id, AccessType::Index)?;
        let mut leaf_guard = self.bpm.fetch_page_write(leaf_id, AccessType::Index)?;

        let (left_size, left_min) = {
            let view = LeafPageRef::new(left_guard.data());
            (view.size(), view.min_size())
        };

        if left_size > left_min {
            // Borrow the left sibling's last entry.
            let (borrow_key, borrow_value) = {
                let view = LeafPageRef::new(left_guard.data());
                (view.key_at(left_size - 1), view.value_at(left_size - 1))
            };
            LeafPageMut::new(left_guard.data_mut()).remove_at(left_size - 1);
            LeafPageMut::new(leaf_guard.data_mut()).insert_at_front(&borrow_key, borrow_value);
            InternalPageMut::new(parent_guard.data_mut()).set_key_at(slot, &borrow_key);
        } else {
            // Merge this leaf into the left sibling.
            {
                let leaf = LeafPageRef::new(leaf_guard.data());
                let mut left = LeafPageMut::new(left_guard.data_mut());
                for i in 0..leaf.size() {
                    left.insert_at_back(&leaf.key_at(i), leaf.value_at(i));
                }
                left.set_next_page_id(leaf.next_page_id());
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(slot);
            drop(leaf_guard);
            let _ = self.bpm.delete_page(leaf_id)?;
            debug!("merged leaf {} leftward", leaf_id);
        }
        Ok(())
    }

    /// Repairs an underflowing internal page; same sibling preference and
    /// latch ordering as the leaf case. Separator keys rotate through the
    /// parent, and each page's fence slot stays equal to its parent
    /// separator.
    fn repair_internal_underflow(
        &self,
        parent_guard: &mut WritePageGuard,
        slot: usize,
        mut node_guard: WritePageGuard,
    ) -> Result<()> {
        let parent_size = InternalPageRef::new(parent_guard.data()).size();
        debug_assert!(parent_size >= 2);

        if slot + 1 < parent_size {
            let (right_id, right_separator) = {
                let parent = InternalPageRef::new(parent_guard.data());
                (parent.value_at(slot + 1), parent.key_at(slot + 1))
            };
            let mut right_guard = self.bpm.fetch_page_write(right_id, AccessType::Index)?;

            let (right_size, right_min) = {
                let view = InternalPageRef::new(right_guard.data());
                (view.size(), view.min_size())
            };

            if right_size > right_min {
                // The right sibling's first child moves over; its fence
                // key (the separator) comes with it, and the sibling's
                // next key becomes the new separator.
                let first_child = InternalPageRef::new(right_guard.data()).value_at(0);
                InternalPageMut::new(node_guard.data_mut())
                    .insert_at_back(&right_separator, first_child);
                let mut right = InternalPageMut::new(right_guard.data_mut());
                right.remove_at(0);
                let new_separator = right.key_at(0);
                InternalPageMut::new(parent_guard.data_mut()).set_key_at(slot + 1, &new_separator);
            } else {
                // Merge the right sibling into this node; the separator
                // becomes the key above the sibling's first child.
                {
                    let right = InternalPageRef::new(right_guard.data());
                    let mut node = InternalPageMut::new(node_guard.data_mut());
                    for i in 0..right.size() {
                        let key = if i == 0 { right_separator } else { right.key_at(i) };
                        node.insert_at_back(&key, right.value_at(i));
                    }
                }
                InternalPageMut::new(parent_guard.data_mut()).remove_at(slot + 1);
                drop(right_guard);
                let _ = self.bpm.delete_page(right_id)?;
                debug!("merged internal {} leftward", right_id);
            }
            return Ok(());
        }

        // Last child: go through the left sibling.
        let (left_id, separator) = {
            let parent = InternalPageRef::new(parent_guard.data());
            (parent.value_at(slot - 1), parent.key_at(slot))
        };
        let node_id = node_guard.page_id();
        drop(node_guard);
        let mut left_guard = self.bpm.fetch_page_write(left_id, AccessType::Index)?;
        let mut node_guard = self.bpm.fetch_page_write(node_id, AccessType::Index)?;

        let (left_size, left_min) = {
            let view = InternalPageRef::new(left_guard.data());
            (view.size(), view.min_size())
        };

        if left_size > left_min {
            // The left sibling's last child moves over and its key becomes
            // the new separator; our old fence key (the old separator)
            // already sits above our previous first child.
            let (borrow_key, borrow_child) = {
                let view = InternalPageRef::new(left_guard.data());
                (view.key_at(left_size - 1), view.value_at(left_size - 1))
            };
            InternalPageMut::new(left_guard.data_mut()).remove_at(left_size - 1);
            InternalPageMut::new(node_guard.data_mut()).insert_at_front(&borrow_key, borrow_child);
            InternalPageMut::new(parent_guard.data_mut()).set_key_at(slot, &borrow_key);
        } else {
            // Merge this node into the left sibling.
            {
                let node = InternalPageRef::new(node_guard.data());
                let mut left = InternalPageMut::new(left_guard.data_mut());
                for i in 0..node.size() {
                    let key = if i == 0 { separator } else { node.key_at(i) };
                    left.insert_at_back(&key, node.value_at(i));
                }
            }
            InternalPageMut::new(parent_guard.data_mut()).remove_at(slot);
            drop(node_guard);
            let _ = self.bpm.delete_page(node_id)?;
            debug!("merged internal {} leftward", node_id);
        }
        Ok(())
    }
}
