//! Record identifiers.

use crate::page::PageId;
use serde::{Deserialize, Serialize};

/// Identifies a record by the page that holds it and its slot on that page.
///
/// The 8-byte on-disk image is `page_id` followed by `slot_num`, both
/// little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rid {
    /// Page containing the record.
    pub page_id: PageId,
    /// Slot number within the page.
    pub slot_num: u32,
}

impl Rid {
    /// Size of the packed representation in bytes.
    pub const SIZE: usize = 8;

    /// Creates a new record id.
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }

    /// Serializes to the packed 8-byte representation.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.page_id.0.to_le_bytes());
        buf[4..8].copy_from_slice(&self.slot_num.to_le_bytes());
        buf
    }

    /// Deserializes from the packed representation.
    pub fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_id: PageId(i32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])),
            slot_num: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        }
    }
}

impl std::fmt::Display for Rid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_num)
    }
}
