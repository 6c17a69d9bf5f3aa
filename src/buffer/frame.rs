use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId, INVALID_PAGE_ID, PAGE_SIZE};

/// Bit 31 of `state` is the dirty flag; the low 31 bits are the pin count.
const DIRTY_FLAG: u32 = 1 << 31;
const PIN_MASK: u32 = DIRTY_FLAG - 1;

/// A single buffer frame: one page worth of bytes plus the metadata the
/// pool needs to manage its tenancy.
///
/// Pin count and dirty flag share one atomic state word, so a single load
/// observes both coherently. State transitions happen under the pool
/// mutex; the data latch is the reader/writer latch page guards hold
/// across their lifetime.
pub struct Frame {
    /// The frame ID (index in the buffer pool)
    frame_id: FrameId,
    /// Raw id of the resident page (INVALID_PAGE_ID when empty)
    tenant: AtomicU32,
    /// Packed dirty flag + pin count
    state: AtomicU32,
    /// The page bytes, behind the frame's reader/writer latch
    pub(crate) data: RwLock<Box<[u8; PAGE_SIZE]>>,
}

impl Frame {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            tenant: AtomicU32::new(INVALID_PAGE_ID.0),
            state: AtomicU32::new(0),
            data: RwLock::new(Box::new([0u8; PAGE_SIZE])),
        }
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(self.tenant.load(Ordering::SeqCst))
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.tenant.store(page_id.as_u32(), Ordering::SeqCst);
    }

    pub fn pin_count(&self) -> u32 {
        self.state.load(Ordering::SeqCst) & PIN_MASK
    }

    /// Increments the pin count and returns the new value.
    pub fn pin(&self) -> u32 {
        (self.state.fetch_add(1, Ordering::SeqCst) & PIN_MASK) + 1
    }

    /// Decrements the pin count and returns the new value, leaving the
    /// dirty flag untouched. Returns None if the pin count was already 0.
    pub fn unpin(&self) -> Option<u32> {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |word| {
                if word & PIN_MASK == 0 {
                    None
                } else {
                    Some(word - 1)
                }
            })
            .ok()
            .map(|previous| (previous & PIN_MASK) - 1)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.load(Ordering::SeqCst) & DIRTY_FLAG != 0
    }

    pub fn set_dirty(&self, dirty: bool) {
        if dirty {
            self.state.fetch_or(DIRTY_FLAG, Ordering::SeqCst);
        } else {
            self.state.fetch_and(!DIRTY_FLAG, Ordering::SeqCst);
        }
    }

    /// Shared access to the page bytes.
    pub fn read_data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.read()
    }

    /// Exclusive access to the page bytes.
    pub fn write_data(&self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.data.write()
    }

    /// Returns the frame to its empty state: no tenant, unpinned, clean,
    /// zeroed bytes.
    pub fn reset(&self) {
        self.tenant.store(INVALID_PAGE_ID.0, Ordering::SeqCst);
        self.state.store(0, Ordering::SeqCst);
        self.data.write().fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = Frame::new(FrameId::new(0));
        assert_eq!(frame.frame_id(), FrameId::new(0));
        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_pin_unpin() {
        let frame = Frame::new(FrameId::new(0));

        assert_eq!(frame.pin(), 1);
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.pin_count(), 2);

        assert_eq!(frame.unpin(), Some(1));
        assert_eq!(frame.unpin(), Some(0));
        assert_eq!(frame.unpin(), None);
    }

    #[test]
    fn test_frame_dirty_flag_survives_pin_churn() {
        let frame = Frame::new(FrameId::new(0));

        frame.set_dirty(true);
        frame.pin();
        frame.pin();
        assert!(frame.is_dirty());
        assert_eq!(frame.pin_count(), 2);

        frame.unpin();
        frame.unpin();
        assert!(frame.is_dirty());
        assert_eq!(frame.pin_count(), 0);

        // And an unpin underflow must not disturb the flag either.
        assert_eq!(frame.unpin(), None);
        assert!(frame.is_dirty());

        frame.set_dirty(false);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_frame_reset() {
        let frame = Frame::new(FrameId::new(3));

        frame.set_page_id(PageId::new(5));
        frame.pin();
        frame.set_dirty(true);
        frame.write_data()[17] = 9;

        frame.reset();

        assert_eq!(frame.page_id(), INVALID_PAGE_ID);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.read_data()[17], 0);
    }
}
