use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::Frame;

/// Callback type invoked when a guard releases its page
pub(crate) type ReleaseCallback = Box<dyn FnOnce(PageId, bool) + Send + Sync>;

/// Shared plumbing for the three guard flavours: the pinned frame, the
/// release callback, and the dirty bit accumulated through this guard.
struct GuardInner {
    page_id: PageId,
    frame: Arc<Frame>,
    release: Option<ReleaseCallback>,
    is_dirty: bool,
}

impl GuardInner {
    fn release(&mut self) {
        if let Some(callback) = self.release.take() {
            callback(self.page_id, self.is_dirty);
        }
    }
}

/// RAII guard holding only a pin on a page, without a data latch.
///
/// Used for handing out freshly allocated pages; upgrade to a read or
/// write guard to actually touch the bytes. Guards are movable but not
/// copyable, and a consumed (upgraded) guard is inert.
pub struct BasicPageGuard {
    inner: Option<GuardInner>,
}

impl BasicPageGuard {
    pub(crate) fn new(page_id: PageId, frame: Arc<Frame>, release: ReleaseCallback) -> Self {
        Self {
            inner: Some(GuardInner {
                page_id,
                frame,
                release: Some(release),
                is_dirty: false,
            }),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.as_ref().unwrap().page_id
    }

    /// Trades the bare pin for a pin plus the shared data latch.
    pub fn upgrade_read(mut self) -> ReadPageGuard {
        let inner = self.inner.take().unwrap();
        ReadPageGuard::from_inner(inner)
    }

    /// Trades the bare pin for a pin plus the exclusive data latch.
    pub fn upgrade_write(mut self) -> WritePageGuard {
        let inner = self.inner.take().unwrap();
        WritePageGuard::from_inner(inner)
    }
}

impl Drop for BasicPageGuard {
    fn drop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.release();
        }
    }
}

/// RAII guard for shared read access to a page.
/// Releases the latch and then unpins when dropped.
pub struct ReadPageGuard {
    inner: GuardInner,
    /// Read latch on the page data; dropped before the pin is released
    data_guard: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    fn from_inner(inner: GuardInner) -> Self {
        let data_guard = inner.frame.data.read();
        // Safety: the guard borrows from the frame, which the Arc in
        // `inner` keeps alive for at least as long as this guard.
        let data_guard: RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };

        Self {
            inner,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        // Latch first, pin second.
        self.data_guard.take();
        self.inner.release();
    }
}

/// RAII guard for exclusive write access to a page.
/// Writing through the guard marks the page dirty; dropping it releases
/// the latch and then unpins, carrying the dirty bit to the pool.
pub struct WritePageGuard {
    inner: GuardInner,
    /// Write latch on the page data; dropped before the pin is released
    data_guard: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl WritePageGuard {
    fn from_inner(inner: GuardInner) -> Self {
        let data_guard = inner.frame.data.write();
        // Safety: as for ReadPageGuard, the Arc'd frame outlives the guard.
        let data_guard: RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data_guard) };

        Self {
            inner,
            data_guard: Some(data_guard),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id
    }

    pub fn data(&self) -> &[u8] {
        &self.data_guard.as_ref().unwrap()[..]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.inner.is_dirty = true;
        &mut self.data_guard.as_mut().unwrap()[..]
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        // Latch first, pin second.
        self.data_guard.take();
        self.inner.release();
    }
}
