use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{AccessType, FrameId, KeelError, Result, Timestamp};

/// Tracks access history for a single frame
#[derive(Debug)]
struct LruKNode {
    /// History of access timestamps (most recent at back, trimmed to k)
    history: VecDeque<Timestamp>,
    /// Whether this frame is currently evictable
    is_evictable: bool,
}

impl LruKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable: false,
        }
    }

    fn record(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance at `now`; None means +inf (fewer than k accesses).
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn first_access(&self) -> Timestamp {
        // A tracked node always has at least one recorded access.
        *self.history.front().unwrap_or(&Timestamp::MAX)
    }
}

struct ReplacerInner {
    /// Logical clock, advanced once per recorded access
    clock: Timestamp,
    /// Access information for each tracked frame
    node_store: HashMap<FrameId, LruKNode>,
    /// Candidate list ordered by descending backward k-distance; eviction
    /// scans from the front
    queue: VecDeque<FrameId>,
    /// Number of evictable frames
    num_evictable: usize,
}

/// LRU-K replacement policy.
///
/// The replacer evicts the evictable frame whose backward k-distance is
/// largest: the difference between the current logical time and the
/// timestamp of the frame's k-th most recent access. A frame with fewer
/// than k recorded accesses has +inf distance; ties among +inf frames go
/// to the one with the earliest first access (classical LRU fallback).
///
/// Instead of recomputing distances on every eviction, the candidate list
/// is kept sorted: each `record_access` removes the frame and re-inserts
/// it at its new position, so `evict` only scans for the first evictable
/// entry from the front.
pub struct LruKReplacer {
    /// K value for the LRU-K algorithm
    k: usize,
    /// Maximum number of frames the replacer can track
    capacity: usize,
    inner: Mutex<ReplacerInner>,
}

impl LruKReplacer {
    /// Creates a new LRU-K replacer with the given k value and capacity.
    pub fn new(k: usize, capacity: usize) -> Self {
        assert!(k >= 1, "k must be at least 1");
        Self {
            k,
            capacity,
            inner: Mutex::new(ReplacerInner {
                clock: 0,
                node_store: HashMap::new(),
                queue: VecDeque::new(),
                num_evictable: 0,
            }),
        }
    }

    /// Records an access to the given frame, creating its node on first
    /// access. Fails with `ReplacerAtCapacity` when a new frame would
    /// exceed the tracked-frame capacity.
    ///
    /// The access type hint is accepted for interface compatibility; the
    /// base policy ignores it.
    pub fn record_access(&self, frame_id: FrameId, _access: AccessType) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let timestamp = inner.clock;
        inner.clock += 1;

        match inner.node_store.get_mut(&frame_id) {
            Some(node) => {
                node.record(timestamp, self.k);
                if let Some(pos) = inner.queue.iter().position(|&f| f == frame_id) {
                    inner.queue.remove(pos);
                }
            }
            None => {
                if inner.node_store.len() >= self.capacity {
                    return Err(KeelError::ReplacerAtCapacity(frame_id));
                }
                let mut node = LruKNode::new();
                node.record(timestamp, self.k);
                inner.node_store.insert(frame_id, node);
            }
        }

        // Re-insert at the position dictated by the new distance. The
        // clock has already advanced, matching the time eviction sees.
        let now = inner.clock;
        let me = &inner.node_store[&frame_id];
        let my_dist = me.k_distance(now, self.k);
        let my_first = me.first_access();

        let mut insert_at = inner.queue.len();
        for (i, fid) in inner.queue.iter().enumerate() {
            let other = &inner.node_store[fid];
            let ahead = match (my_dist, other.k_distance(now, self.k)) {
                (None, Some(_)) => true,
                (None, None) => my_first < other.first_access(),
                (Some(_), None) => false,
                (Some(mine), Some(theirs)) => mine > theirs,
            };
            if ahead {
                insert_at = i;
                break;
            }
        }
        inner.queue.insert(insert_at, frame_id);

        Ok(())
    }

    /// Evicts the evictable frame with the largest backward k-distance,
    /// removing it from the replacer entirely. Returns None if no frame
    /// is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.num_evictable == 0 {
            return None;
        }

        let pos = inner
            .queue
            .iter()
            .position(|fid| inner.node_store[fid].is_evictable)?;
        let frame_id = inner.queue.remove(pos)?;
        inner.node_store.remove(&frame_id);
        inner.num_evictable -= 1;
        Some(frame_id)
    }

    /// Sets whether a frame is evictable. When a frame's pin count drops
    /// to 0 the buffer pool marks it evictable here.
    pub fn set_evictable(&self, frame_id: FrameId, is_evictable: bool) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let node = inner
            .node_store
            .get_mut(&frame_id)
            .ok_or(KeelError::FrameNotTracked(frame_id))?;

        if node.is_evictable != is_evictable {
            node.is_evictable = is_evictable;
            if is_evictable {
                inner.num_evictable += 1;
            } else {
                inner.num_evictable -= 1;
            }
        }
        Ok(())
    }

    /// Drops a tracked, evictable frame; used when a page is explicitly
    /// deleted. Fails if the frame is untracked or still pinned.
    pub fn remove(&self, frame_id: FrameId) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        match inner.node_store.get(&frame_id) {
            None => return Err(KeelError::FrameNotTracked(frame_id)),
            Some(node) if !node.is_evictable => {
                return Err(KeelError::FrameNotEvictable(frame_id))
            }
            Some(_) => {}
        }

        inner.node_store.remove(&frame_id);
        if let Some(pos) = inner.queue.iter().position(|&f| f == frame_id) {
            inner.queue.remove(pos);
        }
        inner.num_evictable -= 1;
        Ok(())
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.inner.lock().num_evictable
    }

    /// Returns the k value of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
