//! Buffer pool manager.

use crate::disk::DiskManager;
use crate::frame::{Frame, FrameId};
use crate::hash_table::ExtendibleHashTable;
use crate::replacer::{LruReplacer, Replacer};
use keystone_common::config::StorageConfig;
use keystone_common::page::{PageId, PAGE_SIZE};
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use sysinfo::System;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub pool_size: usize,
    /// Per-bucket capacity of the page directory.
    pub bucket_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 1024,
            bucket_size: 64,
        }
    }
}

impl From<&StorageConfig> for BufferPoolConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            pool_size: config.buffer_pool_pages,
            bucket_size: config.bucket_size,
        }
    }
}

/// Buffer pool manager.
///
/// Owns a fixed array of frames and mediates between callers and the disk
/// manager: pages are fetched into frames, pinned while in use, written back
/// when evicted dirty, and recycled through a free list plus an LRU
/// replacer. An extendible-hash directory resolves page ids to frames.
///
/// A single latch serializes every public operation; disk I/O happens under
/// it. Frame metadata is atomic, so the pinned `&Frame` handed back to the
/// caller stays valid after the latch is released.
pub struct BufferPoolManager {
    /// Number of frames.
    pool_size: usize,
    /// Contiguous array of frames.
    frames: Vec<Frame>,
    /// Page id to frame id directory.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    /// Eviction policy over unpinned frames.
    replacer: LruReplacer,
    /// Frames not holding any page, preferred over eviction.
    free_list: Mutex<VecDeque<FrameId>>,
    /// Backing store.
    disk: Arc<DiskManager>,
    /// Serializes all public operations.
    latch: Mutex<()>,
}

impl BufferPoolManager {
    /// Creates a new buffer pool over the given disk manager.
    pub fn new(config: BufferPoolConfig, disk: Arc<DiskManager>) -> Self {
        let pool_size = config.pool_size;

        let frames: Vec<_> = (0..pool_size)
            .map(|i| Frame::new(FrameId(i as u32)))
            .collect();

        // All frames start in the free list
        let free_list: VecDeque<_> = (0..pool_size).map(|i| FrameId(i as u32)).collect();

        Self {
            pool_size,
            frames,
            page_table: ExtendibleHashTable::new(config.bucket_size),
            replacer: LruReplacer::new(),
            free_list: Mutex::new(free_list),
            disk,
            latch: Mutex::new(()),
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM.
    ///
    /// Minimum 1,000 frames so the pool is useful even on low-memory
    /// systems.
    pub fn auto_sized(disk: Arc<DiskManager>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4; // 25% of available RAM
        let pool_size = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(
            BufferPoolConfig {
                pool_size,
                ..Default::default()
            },
            disk,
        )
    }

    /// Returns the number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Checks whether a page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.find(&page_id).is_some()
    }

    /// Fetches a page, pinning its frame.
    ///
    /// On a directory hit the resident frame is pinned and returned. On a
    /// miss a frame is claimed (free list first, then eviction), the page is
    /// read from disk, and the mapping is installed. Returns None for the
    /// invalid page id or when every frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Option<&Frame> {
        if !page_id.is_valid() {
            return None;
        }
        let _latch = self.latch.lock();

        if let Some(frame_id) = self.page_table.find(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.pin_count() == 0 {
                self.replacer.erase(frame_id);
            }
            frame.pin();
            return Some(frame);
        }

        let frame_id = self.acquire_frame()?;
        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();

        match self.disk.read_page(page_id) {
            Ok(data) => frame.copy_from(&data),
            Err(e) => {
                warn!("fetch of page {} failed: {}", page_id, e);
                self.free_list.lock().push_back(frame_id);
                return None;
            }
        }

        frame.set_page_id(Some(page_id));
        frame.set_dirty(false);
        frame.pin();
        self.page_table.insert(page_id, frame_id);
        Some(frame)
    }

    /// Unpins a page, optionally marking it dirty.
    ///
    /// The dirty flag is sticky: unpinning with `is_dirty = false` does not
    /// clear a previously set flag. When the pin count reaches zero the
    /// frame becomes an eviction candidate. Returns false if the page id is
    /// invalid, the page is not resident, or the frame was not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if !page_id.is_valid() {
            return false;
        }
        let _latch = self.latch.lock();

        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return false,
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() < 1 {
            return false;
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.insert(frame_id);
        }
        true
    }

    /// Writes a page's in-memory image to disk and clears its dirty flag.
    ///
    /// Flushing a pinned page is permitted; the caller vouches that the
    /// frame bytes are consistent. Returns false if the page id is invalid
    /// or the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        if !page_id.is_valid() {
            return false;
        }
        let _latch = self.latch.lock();

        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return false,
        };
        let frame = &self.frames[frame_id.0 as usize];

        {
            let data = frame.read_data();
            if let Err(e) = self.disk.write_page(page_id, &data) {
                error!("flush of page {} failed: {}", page_id, e);
                return false;
            }
        }
        frame.set_dirty(false);
        true
    }

    /// Flushes every dirty resident page. Returns the number flushed.
    pub fn flush_all_pages(&self) -> usize {
        let _latch = self.latch.lock();

        let mut flushed = 0;
        for frame in &self.frames {
            let page_id = match frame.page_id() {
                Some(page_id) => page_id,
                None => continue,
            };
            if !frame.is_dirty() {
                continue;
            }
            let data = frame.read_data();
            match self.disk.write_page(page_id, &data) {
                Ok(()) => {
                    drop(data);
                    frame.set_dirty(false);
                    flushed += 1;
                }
                Err(e) => error!("flush of page {} failed: {}", page_id, e),
            }
        }
        flushed
    }

    /// Deletes a page from the pool and deallocates it on disk.
    ///
    /// Returns true when the page is absent (idempotent success) or was
    /// deleted; false when the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let _latch = self.latch.lock();

        let frame_id = match self.page_table.find(&page_id) {
            Some(frame_id) => frame_id,
            None => return true,
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() > 0 {
            return false;
        }

        self.page_table.remove(&page_id);
        self.replacer.erase(frame_id);
        self.disk.deallocate_page(page_id);
        frame.reset();
        self.free_list.lock().push_back(frame_id);
        true
    }

    /// Allocates a new page on disk and pins it in a frame.
    ///
    /// Returns the new page id together with its pinned frame, or None when
    /// every frame is pinned.
    pub fn new_page(&self) -> Option<(PageId, &Frame)> {
        let _latch = self.latch.lock();

        let frame_id = self.acquire_frame()?;
        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                error!("page allocation failed: {}", e);
                self.free_list.lock().push_back(frame_id);
                return None;
            }
        };

        // The freshly allocated page is zeroed on disk; mirror its image.
        match self.disk.read_page(page_id) {
            Ok(data) => frame.copy_from(&data),
            Err(e) => warn!("read of new page {} failed: {}", page_id, e),
        }

        frame.set_page_id(Some(page_id));
        frame.pin();
        self.page_table.insert(page_id, frame_id);
        debug!("installed new page {} in {}", page_id, frame_id);
        Some((page_id, frame))
    }

    /// Claims a frame for a new resident page. Free list first, eviction
    /// second; dirty victims are written back and their old mapping removed.
    ///
    /// Must be called with the latch held.
    fn acquire_frame(&self) -> Option<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop_front() {
            return Some(frame_id);
        }

        let frame_id = self.replacer.victim()?;
        let frame = &self.frames[frame_id.0 as usize];

        if let Some(old_page_id) = frame.page_id() {
            if frame.is_dirty() {
                let data = frame.read_data();
                if let Err(e) = self.disk.write_page(old_page_id, &data) {
                    error!("writeback of page {} failed: {}", old_page_id, e);
                    drop(data);
                    self.replacer.insert(frame_id);
                    return None;
                }
            }
            self.page_table.remove(&old_page_id);
        }
        Some(frame_id)
    }
}
