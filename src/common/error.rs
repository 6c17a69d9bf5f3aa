use thiserror::Error;

use super::types::{FrameId, PageId};

/// Storage engine error types
#[derive(Error, Debug)]
pub enum KeelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Buffer pool exhausted, no free or evictable frames")]
    PoolExhausted,

    #[error("Page {0} is still pinned")]
    PageStillPinned(PageId),

    #[error("Replacer is at capacity, cannot track frame {0}")]
    ReplacerAtCapacity(FrameId),

    #[error("Frame {0} is not tracked by the replacer")]
    FrameNotTracked(FrameId),

    #[error("Frame {0} is not evictable")]
    FrameNotEvictable(FrameId),

    #[error("Disk scheduler error: {0}")]
    DiskScheduler(String),
}

pub type Result<T> = std::result::Result<T, KeelError>;
