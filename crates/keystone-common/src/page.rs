//! Page identifiers for Keystone storage.

use serde::{Deserialize, Serialize};

/// Page size in bytes (4 KB).
pub const PAGE_SIZE: usize = 4096;

/// Sentinel page id meaning "no page".
pub const INVALID_PAGE_ID: PageId = PageId(-1);

/// Logical identifier of a page within the database file.
///
/// Page ids are assigned sequentially by the disk manager. The value `-1`
/// is reserved as the invalid sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub i32);

impl PageId {
    /// Invalid page id.
    pub const INVALID: PageId = PageId(-1);

    /// Returns true if this is a valid page id.
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// Returns the raw i32 value.
    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Creates a PageId from a raw i32 value.
    pub fn from_i32(value: i32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
