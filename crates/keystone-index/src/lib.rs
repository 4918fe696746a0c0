//! B+Tree page layouts for Keystone.
//!
//! This crate provides the in-page binary format of B+Tree nodes and the
//! split/merge/redistribute operations an index layer drives:
//! - Fixed-width keys with order-preserving encodings
//! - Shared index-page header accessors
//! - Internal (routing) page layout
//! - Leaf page layout with sibling links

mod header;
mod internal;
mod key;
mod leaf;

pub use header::{BPlusTreePage, IndexPageType, HEADER_SIZE};
pub use internal::BPlusTreeInternalPage;
pub use key::{GenericComparator, GenericKey, KeyComparator};
pub use leaf::BPlusTreeLeafPage;
