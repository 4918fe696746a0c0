//! Configuration structures for Keystone.

use crate::page::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration for the page server core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the database file.
    pub db_path: PathBuf,
    /// Buffer pool size in number of frames.
    pub buffer_pool_pages: usize,
    /// Per-bucket entry capacity of the page directory.
    pub bucket_size: usize,
    /// Enable fsync for durability.
    pub fsync_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./keystone.db"),
            buffer_pool_pages: 1024, // 4 MB with 4 KB pages
            bucket_size: 64,
            fsync_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Returns the total buffer pool size in bytes.
    pub fn buffer_pool_size_bytes(&self) -> usize {
        self.buffer_pool_pages * PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./keystone.db"));
        assert_eq!(config.buffer_pool_pages, 1024);
        assert_eq!(config.bucket_size, 64);
        assert!(config.fsync_enabled);
    }

    #[test]
    fn test_buffer_pool_size_bytes() {
        let config = StorageConfig::default();
        assert_eq!(config.buffer_pool_size_bytes(), 1024 * 4096);
        assert_eq!(config.buffer_pool_size_bytes(), 4_194_304); // 4 MB
    }

    #[test]
    fn test_storage_config_custom() {
        let config = StorageConfig {
            db_path: PathBuf::from("/var/lib/keystone/data.db"),
            buffer_pool_pages: 64,
            bucket_size: 8,
            fsync_enabled: false,
        };

        assert_eq!(config.buffer_pool_pages, 64);
        assert_eq!(config.buffer_pool_size_bytes(), 64 * 4096);
        assert!(!config.fsync_enabled);
    }

    #[test]
    fn test_storage_config_serde_roundtrip() {
        let original = StorageConfig::default();
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: StorageConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(original.db_path, deserialized.db_path);
        assert_eq!(original.buffer_pool_pages, deserialized.buffer_pool_pages);
        assert_eq!(original.bucket_size, deserialized.bucket_size);
        assert_eq!(original.fsync_enabled, deserialized.fsync_enabled);
    }
}
