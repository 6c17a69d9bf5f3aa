use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::common::{KeelError, PageId, Result, PAGE_SIZE};

use super::DiskManager;

/// A single disk I/O request processed by the scheduler's worker thread.
///
/// The buffer pointer must stay valid for `PAGE_SIZE` bytes until the
/// request has been processed; the synchronous wrappers below guarantee
/// this by blocking the caller, and the scheduler's drop joins the worker
/// before returning, covering fire-and-forget requests whose buffers
/// outlive the scheduler.
pub struct DiskRequest {
    /// Whether this is a write (true) or read (false) request
    pub is_write: bool,
    /// The page ID to read/write
    pub page_id: PageId,
    /// Buffer to fill (reads) or drain (writes)
    pub data: *mut u8,
    /// Completion channel carrying the outcome of the I/O
    pub completion: Option<Sender<Result<()>>>,
}

// Safety: the request is handed to exactly one worker thread, and the
// issuing side keeps the buffer alive and unaliased until the request is
// processed (see the struct docs).
unsafe impl Send for DiskRequest {}

impl DiskRequest {
    pub fn read(page_id: PageId, data: *mut u8) -> Self {
        Self {
            is_write: false,
            page_id,
            data,
            completion: None,
        }
    }

    pub fn write(page_id: PageId, data: *mut u8) -> Self {
        Self {
            is_write: true,
            page_id,
            data,
            completion: None,
        }
    }

    pub fn with_completion(mut self, completion: Sender<Result<()>>) -> Self {
        self.completion = Some(completion);
        self
    }
}

/// DiskScheduler funnels page I/O through a background worker thread.
///
/// The request queue is unbounded: callers are already serialized by the
/// pool mutex, so queue depth stays shallow and enqueueing never blocks.
/// There is no separate shutdown signal either; dropping the scheduler
/// hangs up the channel, and the worker exits once it has delivered every
/// request queued before the hang-up.
pub struct DiskScheduler {
    /// The disk manager for actual I/O operations
    disk_manager: Arc<DiskManager>,
    /// Channel sender for queuing requests; taken on drop to hang up
    request_sender: Option<Sender<DiskRequest>>,
    /// Handle to the background worker thread
    worker_handle: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Creates a new DiskScheduler and spawns its worker thread.
    pub fn new(disk_manager: Arc<DiskManager>) -> Self {
        let (sender, receiver) = unbounded::<DiskRequest>();

        let dm_clone = Arc::clone(&disk_manager);
        let worker_handle = thread::spawn(move || {
            Self::worker_loop(dm_clone, receiver);
        });

        Self {
            disk_manager,
            request_sender: Some(sender),
            worker_handle: Some(worker_handle),
        }
    }

    /// Queues a disk request for the background worker.
    pub fn schedule(&self, request: DiskRequest) -> Result<()> {
        let Some(sender) = self.request_sender.as_ref() else {
            return Err(KeelError::DiskScheduler("scheduler is shut down".to_string()));
        };
        sender
            .send(request)
            .map_err(|e| KeelError::DiskScheduler(format!("failed to schedule request: {e}")))
    }

    /// Schedules a read and blocks until the worker completes it.
    pub fn schedule_read_sync(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = bounded(1);
        let request = DiskRequest::read(page_id, data.as_mut_ptr()).with_completion(tx);

        self.schedule(request)?;

        rx.recv()
            .map_err(|e| KeelError::DiskScheduler(format!("worker hung up: {e}")))?
    }

    /// Schedules a write and blocks until the worker completes it.
    pub fn schedule_write_sync(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE);

        let (tx, rx) = bounded(1);
        // The worker only reads through this pointer for writes.
        let request = DiskRequest::write(page_id, data.as_ptr() as *mut u8).with_completion(tx);

        self.schedule(request)?;

        rx.recv()
            .map_err(|e| KeelError::DiskScheduler(format!("worker hung up: {e}")))?
    }

    /// Runs until every sender has hung up. The channel still delivers
    /// requests queued before the hang-up, so nothing in flight is lost.
    fn worker_loop(disk_manager: Arc<DiskManager>, receiver: Receiver<DiskRequest>) {
        while let Ok(request) = receiver.recv() {
            Self::process_request(&disk_manager, request);
        }
    }

    fn process_request(disk_manager: &DiskManager, request: DiskRequest) {
        let outcome = if request.is_write {
            // Safety: issuer keeps the buffer alive until the request is
            // processed
            let data = unsafe { std::slice::from_raw_parts(request.data, PAGE_SIZE) };
            disk_manager.write_page(request.page_id, data)
        } else {
            // Safety: as above, and the issuer holds the only reference
            let data = unsafe { std::slice::from_raw_parts_mut(request.data, PAGE_SIZE) };
            disk_manager.read_page(request.page_id, data)
        };

        if let Some(completion) = request.completion {
            let _ = completion.send(outcome);
        }
    }

    /// Returns a reference to the underlying DiskManager.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk_manager
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        // Hanging up the channel is the shutdown signal.
        self.request_sender.take();

        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
