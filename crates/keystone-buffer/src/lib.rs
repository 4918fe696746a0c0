//! Buffer pool management for Keystone.
//!
//! This crate provides the page-server core:
//! - Disk manager for page-level file I/O
//! - Fixed-size buffer pool with pin counting and dirty tracking
//! - LRU eviction policy over unpinned frames
//! - Extendible-hash page directory mapping page ids to frames

mod disk;
mod frame;
mod hash_table;
mod pool;
mod replacer;

pub use disk::DiskManager;
pub use frame::{Frame, FrameId};
pub use hash_table::ExtendibleHashTable;
pub use pool::{BufferPoolConfig, BufferPoolManager};
pub use replacer::{LruReplacer, Replacer};
