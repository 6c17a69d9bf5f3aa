use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use parking_lot::Mutex;

use crate::common::{PageId, Result, PAGE_SIZE};

/// DiskManager is responsible for reading and writing fixed-size pages
/// to/from a single database file.
///
/// Page ids are allocated by the buffer pool; the disk manager only maps
/// them to byte offsets. Reads past the end of the file (a page that was
/// allocated but never flushed) come back zero-filled.
pub struct DiskManager {
    /// Database file handle; the mutex also guards the file cursor
    file: Mutex<File>,
    /// Path of the database file
    db_path: PathBuf,
    /// Number of disk reads performed
    num_reads: AtomicU32,
    /// Number of disk writes performed
    num_writes: AtomicU32,
    /// Number of deallocations requested
    num_deallocs: AtomicU32,
}

impl DiskManager {
    /// Opens the database file at the given path, creating it if absent.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&db_path)?;

        debug!("opened database file {}", db_path.display());

        Ok(Self {
            file: Mutex::new(file),
            db_path,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
            num_deallocs: AtomicU32::new(0),
        })
    }

    /// Reads a page from disk into the provided buffer.
    pub fn read_page(&self, page_id: PageId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let byte_offset = page_id.as_u64() * PAGE_SIZE as u64;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;

        let mut filled = 0;
        while filled < PAGE_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled < PAGE_SIZE {
            data[filled..].fill(0);
        }

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a page to disk from the provided buffer.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), PAGE_SIZE, "Buffer must be PAGE_SIZE bytes");

        let byte_offset = page_id.as_u64() * PAGE_SIZE as u64;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(byte_offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Releases a page at the disk level. The byte range is not reclaimed
    /// or reused; this only records the request.
    pub fn deallocate_page(&self, page_id: PageId) -> Result<()> {
        debug!("deallocate page {}", page_id);
        self.num_deallocs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    pub fn get_num_deallocs(&self) -> u32 {
        self.num_deallocs.load(Ordering::Relaxed)
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn sync(&self) -> Result<()> {
        let file = self.file.lock();
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.file.get_mut();
        let _ = file.sync_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disk_manager_read_write() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let mut write_data = [0u8; PAGE_SIZE];
        write_data[0] = 42;
        write_data[100] = 255;
        write_data[PAGE_SIZE - 1] = 128;
        dm.write_page(PageId::new(0), &write_data).unwrap();

        let mut read_data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(0), &mut read_data).unwrap();

        assert_eq!(read_data[0], 42);
        assert_eq!(read_data[100], 255);
        assert_eq!(read_data[PAGE_SIZE - 1], 128);
        assert_eq!(dm.get_num_reads(), 1);
        assert_eq!(dm.get_num_writes(), 1);
    }

    #[test]
    fn test_disk_manager_unwritten_page_reads_zeros() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let mut data = [7u8; PAGE_SIZE];
        dm.read_page(PageId::new(9), &mut data).unwrap();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_disk_manager_sparse_pages() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = DiskManager::new(temp_file.path()).unwrap();

        let a = [1u8; PAGE_SIZE];
        let b = [2u8; PAGE_SIZE];
        dm.write_page(PageId::new(3), &a).unwrap();
        dm.write_page(PageId::new(1), &b).unwrap();

        let mut read = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(3), &mut read).unwrap();
        assert_eq!(read[0], 1);
        dm.read_page(PageId::new(1), &mut read).unwrap();
        assert_eq!(read[0], 2);
        // Page 2 was never written; it reads back as zeros.
        dm.read_page(PageId::new(2), &mut read).unwrap();
        assert_eq!(read[0], 0);
    }

    #[test]
    fn test_disk_manager_persistence() {
        let temp_file = NamedTempFile::new().unwrap();

        {
            let dm = DiskManager::new(temp_file.path()).unwrap();
            let mut data = [0u8; PAGE_SIZE];
            data[0] = 123;
            dm.write_page(PageId::new(0), &data).unwrap();
        }

        {
            let dm = DiskManager::new(temp_file.path()).unwrap();
            let mut data = [0u8; PAGE_SIZE];
            dm.read_page(PageId::new(0), &mut data).unwrap();
            assert_eq!(data[0], 123);
        }
    }
}
