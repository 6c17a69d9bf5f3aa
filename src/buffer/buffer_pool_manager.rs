use std::collections::{HashMap, LinkedList};
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::common::{AccessType, FrameId, KeelError, PageId, Result, INVALID_PAGE_ID};
use crate::storage::disk::{DiskManager, DiskScheduler};

use super::page_guard::ReleaseCallback;
use super::{BasicPageGuard, Frame, LruKReplacer, ReadPageGuard, WritePageGuard};

/// Bookkeeping guarded by the pool mutex. Every frame is in exactly one of
/// the free list or the page table, and a mapped frame's stored page id
/// equals its page-table key.
struct PoolInner {
    /// Page table: maps resident page IDs to frame IDs
    page_table: HashMap<PageId, FrameId>,
    /// Frames with no contents, available for immediate use
    free_list: LinkedList<FrameId>,
    /// Monotonic page id allocator
    next_page_id: u32,
}

/// State shared with guard release callbacks
struct PoolState {
    /// The buffer pool frames
    frames: Vec<Arc<Frame>>,
    /// LRU-K replacer for eviction decisions
    replacer: LruKReplacer,
    /// The pool mutex; held for the whole of every public operation
    inner: Mutex<PoolInner>,
}

impl PoolState {
    /// Unpin path shared by `unpin_page` and guard release. Returns false
    /// if the page is not resident or its pin count is already zero.
    fn release_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.as_usize()];

        if is_dirty {
            frame.set_dirty(true);
        }
        match frame.unpin() {
            None => false,
            Some(0) => {
                let _ = self.replacer.set_evictable(frame_id, true);
                true
            }
            Some(_) => true,
        }
    }
}

/// BufferPoolManager caches disk pages in a fixed set of frames, using the
/// LRU-K policy to pick eviction victims when the free list runs dry.
///
/// All public operations serialize on the pool mutex, including any disk
/// I/O needed to evict or fetch. Page latches are acquired by the returned
/// guards only after the mutex is released, so a long-held latch never
/// blocks unrelated pool traffic.
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool
    pool_size: usize,
    /// Shared state (frames, replacer, pool mutex)
    state: Arc<PoolState>,
    /// Disk scheduler for page I/O
    disk_scheduler: DiskScheduler,
}

impl BufferPoolManager {
    /// Creates a new BufferPoolManager with the given pool size, k value
    /// for LRU-K, and disk manager.
    pub fn new(pool_size: usize, k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = LinkedList::new();

        for i in 0..pool_size {
            let frame_id = FrameId::new(i as u32);
            frames.push(Arc::new(Frame::new(frame_id)));
            free_list.push_back(frame_id);
        }

        let state = Arc::new(PoolState {
            frames,
            replacer: LruKReplacer::new(k, pool_size),
            inner: Mutex::new(PoolInner {
                page_table: HashMap::new(),
                free_list,
                next_page_id: 0,
            }),
        });

        Self {
            pool_size,
            state,
            disk_scheduler: DiskScheduler::new(disk_manager),
        }
    }

    /// Allocates a fresh page id, installs it in a frame with a pin count
    /// of one, and returns it with a guard. The frame comes from the free
    /// list, or from evicting the replacer's victim (written back first if
    /// dirty). Fails with `PoolExhausted` when every frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, BasicPageGuard)> {
        let mut inner = self.state.inner.lock();

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        let page_id = PageId::new(inner.next_page_id);
        inner.next_page_id += 1;

        frame.set_page_id(page_id);
        frame.pin();
        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id, AccessType::Unknown)?;
        self.state.replacer.set_evictable(frame_id, false)?;

        drop(inner);
        debug!("allocated {} in {}", page_id, frame_id);

        let guard = BasicPageGuard::new(page_id, Arc::clone(frame), self.release_callback());
        Ok((page_id, guard))
    }

    /// Fetches a page with a bare pin and no data latch.
    pub fn fetch_page_basic(&self, page_id: PageId, access: AccessType) -> Result<BasicPageGuard> {
        let frame = self.fetch_page(page_id, access)?;
        Ok(BasicPageGuard::new(page_id, frame, self.release_callback()))
    }

    /// Fetches a page and takes the shared latch on its contents.
    pub fn fetch_page_read(&self, page_id: PageId, access: AccessType) -> Result<ReadPageGuard> {
        Ok(self.fetch_page_basic(page_id, access)?.upgrade_read())
    }

    /// Fetches a page and takes the exclusive latch on its contents.
    pub fn fetch_page_write(&self, page_id: PageId, access: AccessType) -> Result<WritePageGuard> {
        Ok(self.fetch_page_basic(page_id, access)?.upgrade_write())
    }

    /// Decrements a page's pin count, OR-ing in the dirty flag. Returns
    /// false if the page is not resident or was not pinned. At pin count
    /// zero the frame becomes evictable.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.state.release_page(page_id, is_dirty)
    }

    /// Writes a page's bytes to disk and clears its dirty flag, regardless
    /// of pin state. Returns false if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Err(KeelError::InvalidPageId(page_id));
        }

        let inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(false);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        let data = frame.read_data();
        self.disk_scheduler.schedule_write_sync(page_id, &data[..])?;
        frame.set_dirty(false);

        Ok(true)
    }

    /// Flushes every resident page.
    pub fn flush_all_pages(&self) -> Result<()> {
        let inner = self.state.inner.lock();

        for (&page_id, &frame_id) in inner.page_table.iter() {
            let frame = &self.state.frames[frame_id.as_usize()];
            let data = frame.read_data();
            self.disk_scheduler.schedule_write_sync(page_id, &data[..])?;
            frame.set_dirty(false);
        }

        Ok(())
    }

    /// Drops a page from the pool and deallocates it on disk. Returns true
    /// if the page was absent (nothing to do) or deleted, false if it is
    /// still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut inner = self.state.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return Ok(true);
        };
        let frame = &self.state.frames[frame_id.as_usize()];

        if frame.pin_count() > 0 {
            return Ok(false);
        }

        self.state.replacer.remove(frame_id)?;
        frame.reset();
        inner.free_list.push_back(frame_id);
        inner.page_table.remove(&page_id);
        self.disk_scheduler.disk_manager().deallocate_page(page_id)?;

        Ok(true)
    }

    /// Returns the pin count for a resident page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let inner = self.state.inner.lock();

        inner
            .page_table
            .get(&page_id)
            .map(|&frame_id| self.state.frames[frame_id.as_usize()].pin_count())
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames with no contents.
    pub fn free_frame_count(&self) -> usize {
        self.state.inner.lock().free_list.len()
    }

    /// Returns the number of resident pages.
    pub fn resident_page_count(&self) -> usize {
        self.state.inner.lock().page_table.len()
    }

    fn release_callback(&self) -> ReleaseCallback {
        let state = Arc::clone(&self.state);
        Box::new(move |page_id, is_dirty| {
            state.release_page(page_id, is_dirty);
        })
    }

    /// Pins the page into a frame, reading it from disk if not resident,
    /// and returns the frame. Fails with `PoolExhausted` when no frame can
    /// be freed.
    fn fetch_page(&self, page_id: PageId, access: AccessType) -> Result<Arc<Frame>> {
        if page_id == INVALID_PAGE_ID {
            return Err(KeelError::InvalidPageId(page_id));
        }

        let mut inner = self.state.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.state.frames[frame_id.as_usize()];
            frame.pin();
            self.state.replacer.record_access(frame_id, access)?;
            self.state.replacer.set_evictable(frame_id, false)?;
            return Ok(Arc::clone(frame));
        }

        let frame_id = self.acquire_frame(&mut inner)?;
        let frame = &self.state.frames[frame_id.as_usize()];

        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk_scheduler.schedule_read_sync(page_id, &mut data[..]) {
                // Hand the frame back so the pool invariant holds.
                drop(data);
                frame.reset();
                inner.free_list.push_back(frame_id);
                return Err(e);
            }
        }

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();
        inner.page_table.insert(page_id, frame_id);
        self.state.replacer.record_access(frame_id, access)?;
        self.state.replacer.set_evictable(frame_id, false)?;

        Ok(Arc::clone(frame))
    }

    /// Takes a frame off the free list, or evicts the replacer's victim:
    /// dirty evictees are written back, their page-table entry dropped and
    /// their old page id deallocated.
    fn acquire_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.state.replacer.evict() else {
            return Err(KeelError::PoolExhausted);
        };
        let frame = &self.state.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();

        debug!("evicting {} from {}", old_page_id, frame_id);

        if frame.is_dirty() {
            let data = frame.read_data();
            self.disk_scheduler.schedule_write_sync(old_page_id, &data[..])?;
        }

        inner.page_table.remove(&old_page_id);
        frame.reset();
        self.disk_scheduler.disk_manager().deallocate_page(old_page_id)?;

        Ok(frame_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_bpm(pool_size: usize) -> (BufferPoolManager, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm = BufferPoolManager::new(pool_size, 2, dm);
        (bpm, temp_file)
    }

    #[test]
    fn test_buffer_pool_manager_new() {
        let (bpm, _temp) = create_bpm(10);
        assert_eq!(bpm.pool_size(), 10);
        assert_eq!(bpm.free_frame_count(), 10);
        assert_eq!(bpm.resident_page_count(), 0);
    }

    #[test]
    fn test_buffer_pool_manager_new_page_is_pinned() {
        let (bpm, _temp) = create_bpm(10);

        let (page_id, guard) = bpm.new_page().unwrap();
        assert_eq!(page_id, PageId::new(0));
        assert_eq!(bpm.get_pin_count(page_id), Some(1));
        assert_eq!(bpm.free_frame_count(), 9);

        drop(guard);
        assert_eq!(bpm.get_pin_count(page_id), Some(0));
    }

    #[test]
    fn test_buffer_pool_manager_read_write() {
        let (bpm, _temp) = create_bpm(10);

        let (page_id, guard) = bpm.new_page().unwrap();

        {
            let mut write = guard.upgrade_write();
            write.data_mut()[0] = 42;
            write.data_mut()[100] = 255;
        }
        assert_eq!(bpm.get_pin_count(page_id), Some(0));

        {
            let read = bpm.fetch_page_read(page_id, AccessType::Lookup).unwrap();
            assert_eq!(read.data()[0], 42);
            assert_eq!(read.data()[100], 255);
        }
    }

    #[test]
    fn test_buffer_pool_manager_unpin_page() {
        let (bpm, _temp) = create_bpm(10);

        let (page_id, guard) = bpm.new_page().unwrap();
        // Never pinned / absent pages refuse the unpin.
        assert!(!bpm.unpin_page(PageId::new(99), false));

        drop(guard);
        assert!(!bpm.unpin_page(page_id, false));
    }

    #[test]
    fn test_buffer_pool_manager_eviction_writes_back() {
        let (bpm, _temp) = create_bpm(2);

        let (p0, g0) = bpm.new_page().unwrap();
        {
            let mut w = g0.upgrade_write();
            w.data_mut()[0] = 7;
        }
        let (_p1, g1) = bpm.new_page().unwrap();
        drop(g1);

        // Both frames occupied and unpinned; the third page evicts p0.
        let (_p2, g2) = bpm.new_page().unwrap();
        drop(g2);
        assert_eq!(bpm.resident_page_count(), 2);

        // Fetching p0 back evicts something else and reloads it from disk.
        let read = bpm.fetch_page_read(p0, AccessType::Lookup).unwrap();
        assert_eq!(read.data()[0], 7);
    }

    #[test]
    fn test_buffer_pool_manager_pool_exhausted() {
        let (bpm, _temp) = create_bpm(2);

        let (_p0, _g0) = bpm.new_page().unwrap();
        let (_p1, _g1) = bpm.new_page().unwrap();

        assert!(matches!(bpm.new_page(), Err(KeelError::PoolExhausted)));
    }

    #[test]
    fn test_buffer_pool_manager_delete_page() {
        let (bpm, _temp) = create_bpm(10);

        let (page_id, guard) = bpm.new_page().unwrap();

        // Pinned pages cannot be deleted.
        assert!(!bpm.delete_page(page_id).unwrap());

        drop(guard);
        assert!(bpm.delete_page(page_id).unwrap());
        assert_eq!(bpm.get_pin_count(page_id), None);
        assert_eq!(bpm.free_frame_count(), 10);

        // Deleting an absent page is a no-op success.
        assert!(bpm.delete_page(page_id).unwrap());
    }

    #[test]
    fn test_buffer_pool_manager_flush() {
        let (bpm, temp) = create_bpm(10);

        let (page_id, guard) = bpm.new_page().unwrap();
        {
            let mut w = guard.upgrade_write();
            w.data_mut()[0] = 42;
        }

        assert!(bpm.flush_page(page_id).unwrap());
        assert!(!bpm.flush_page(PageId::new(77)).unwrap());

        drop(bpm);

        let dm = Arc::new(DiskManager::new(temp.path()).unwrap());
        let bpm2 = BufferPoolManager::new(10, 2, dm);
        let read = bpm2.fetch_page_read(page_id, AccessType::Lookup).unwrap();
        assert_eq!(read.data()[0], 42);
    }

    #[test]
    fn test_buffer_pool_partition_invariant() {
        let (bpm, _temp) = create_bpm(4);

        let mut guards = Vec::new();
        for _ in 0..3 {
            guards.push(bpm.new_page().unwrap());
        }
        assert_eq!(
            bpm.free_frame_count() + bpm.resident_page_count(),
            bpm.pool_size()
        );

        guards.clear();
        assert_eq!(
            bpm.free_frame_count() + bpm.resident_page_count(),
            bpm.pool_size()
        );
    }
}
