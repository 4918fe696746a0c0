//! Disk manager for page-level file I/O.

use keystone_common::page::{PageId, PAGE_SIZE};
use keystone_common::{KeystoneError, Result};
use log::debug;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Manages reading and writing pages to the database file.
///
/// Pages are allocated sequentially; page `n` lives at byte offset
/// `n * PAGE_SIZE`. Deallocated ids are not reused.
pub struct DiskManager {
    /// Path to the database file.
    path: PathBuf,
    /// Enable fsync after writes.
    fsync_enabled: bool,
    /// File handle and page count, updated together.
    inner: Mutex<DiskInner>,
}

struct DiskInner {
    file: File,
    /// Number of pages the file currently holds.
    num_pages: i32,
}

impl DiskManager {
    /// Opens (or creates) the database file at `path`.
    pub fn new(path: impl AsRef<Path>, fsync_enabled: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as i32;

        Ok(Self {
            path,
            fsync_enabled,
            inner: Mutex::new(DiskInner { file, num_pages }),
        })
    }

    /// Returns the path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocates a new page and returns its id.
    ///
    /// The file is extended with a zeroed page so the id is immediately
    /// readable.
    pub fn allocate_page(&self) -> Result<PageId> {
        let mut inner = self.inner.lock();

        let page_id = PageId(inner.num_pages);
        let offset = (inner.num_pages as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(&[0u8; PAGE_SIZE])?;
        if self.fsync_enabled {
            inner.file.sync_all()?;
        }
        inner.num_pages += 1;

        debug!("allocated page {}", page_id);
        Ok(page_id)
    }

    /// Releases a page id.
    ///
    /// Ids are not recycled; the page's bytes stay in the file until they
    /// are overwritten by a future allocation scheme.
    pub fn deallocate_page(&self, page_id: PageId) {
        debug!("deallocated page {}", page_id);
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        let mut inner = self.inner.lock();

        if !page_id.is_valid() || page_id.0 >= inner.num_pages {
            return Err(KeystoneError::PageNotFound { page_id: page_id.0 });
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        inner.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        if !page_id.is_valid() {
            return Err(KeystoneError::PageNotFound { page_id: page_id.0 });
        }

        let mut inner = self.inner.lock();

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        inner.file.seek(SeekFrom::Start(offset))?;
        inner.file.write_all(data)?;

        if self.fsync_enabled {
            inner.file.sync_all()?;
        }

        // Track growth if the write extended the file
        if page_id.0 >= inner.num_pages {
            inner.num_pages = page_id.0 + 1;
        }

        Ok(())
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> i32 {
        self.inner.lock().num_pages
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.inner.lock().file.sync_all();
    }
}
