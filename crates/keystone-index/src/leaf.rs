//! B+Tree leaf page layout.

use crate::header::{
    read_i32, write_i32, BPlusTreePage, IndexPageType, HEADER_SIZE, NEXT_PAGE_ID_OFFSET,
};
use crate::key::{GenericKey, KeyComparator};
use keystone_common::page::{PageId, INVALID_PAGE_ID, PAGE_SIZE};
use keystone_common::rid::Rid;
use std::cmp::Ordering;

/// B+Tree leaf page.
///
/// Stores `size` pairs of `(key, rid)` after the shared header, strictly
/// increasing by key. Leaves are chained in key order through
/// `next_page_id`, terminated by the invalid page id.
pub struct BPlusTreeLeafPage<const N: usize> {
    data: Box<[u8; PAGE_SIZE]>,
}

impl<const N: usize> BPlusTreeLeafPage<N> {
    const ENTRY_SIZE: usize = N + Rid::SIZE;

    /// Entry capacity for this key width.
    pub const fn capacity() -> usize {
        (PAGE_SIZE - HEADER_SIZE) / (N + Rid::SIZE)
    }

    /// Creates a zeroed, uninitialized page.
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
        }
    }

    /// Wraps an existing page image.
    pub fn from_bytes(data: [u8; PAGE_SIZE]) -> Self {
        Self {
            data: Box::new(data),
        }
    }

    /// Returns the raw page image.
    pub fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Initializes a freshly allocated leaf page.
    pub fn init(&mut self, page_id: PageId, parent_id: PageId) {
        self.set_page_type(IndexPageType::Leaf);
        self.set_size(0);
        self.set_max_size(Self::capacity());
        self.set_parent_page_id(parent_id);
        self.set_page_id(page_id);
        self.set_next_page_id(INVALID_PAGE_ID);
    }

    /// Returns the next leaf in key order, or the invalid id at the end of
    /// the chain.
    pub fn next_page_id(&self) -> PageId {
        PageId(read_i32(self.data.as_ref(), NEXT_PAGE_ID_OFFSET))
    }

    /// Sets the next leaf in key order.
    pub fn set_next_page_id(&mut self, next: PageId) {
        write_i32(self.data.as_mut(), NEXT_PAGE_ID_OFFSET, next.0);
    }

    fn entry_offset(index: usize) -> usize {
        HEADER_SIZE + index * Self::ENTRY_SIZE
    }

    fn entry(&self, index: usize) -> (GenericKey<N>, Rid) {
        let offset = Self::entry_offset(index);
        let key = GenericKey::from_slice(&self.data[offset..offset + N]);
        let rid = Rid::from_bytes(&self.data[offset + N..offset + N + Rid::SIZE]);
        (key, rid)
    }

    fn set_entry(&mut self, index: usize, entry: &(GenericKey<N>, Rid)) {
        let offset = Self::entry_offset(index);
        self.data[offset..offset + N].copy_from_slice(entry.0.as_bytes());
        self.data[offset + N..offset + N + Rid::SIZE].copy_from_slice(&entry.1.to_bytes());
    }

    /// Returns the key at `index`.
    pub fn key_at(&self, index: usize) -> GenericKey<N> {
        self.entry(index).0
    }

    /// Returns the key-rid pair at `index`.
    pub fn item(&self, index: usize) -> (GenericKey<N>, Rid) {
        self.entry(index)
    }

    /// Returns the first index whose key is not less than `key`, or `size`
    /// if every key is smaller.
    pub fn key_index<C: KeyComparator<N>>(&self, key: &GenericKey<N>, comparator: &C) -> usize {
        let size = self.size();
        for i in 0..size {
            if comparator.compare(&self.key_at(i), key) != Ordering::Less {
                return i;
            }
        }
        size
    }

    /// Inserts a pair in sorted position. Returns the new size.
    ///
    /// Keys are expected to be unique; the index layer screens duplicates
    /// with [`BPlusTreeLeafPage::lookup`] before inserting.
    pub fn insert<C: KeyComparator<N>>(
        &mut self,
        key: &GenericKey<N>,
        value: Rid,
        comparator: &C,
    ) -> usize {
        assert!(self.size() < self.max_size(), "insert into full leaf page");

        let index = self.key_index(key, comparator);
        let size = self.size();
        self.data.copy_within(
            Self::entry_offset(index)..Self::entry_offset(size),
            Self::entry_offset(index + 1),
        );
        self.set_entry(index, &(*key, value));
        self.increase_size(1);
        self.size()
    }

    /// Looks up the record id stored for `key`.
    pub fn lookup<C: KeyComparator<N>>(
        &self,
        key: &GenericKey<N>,
        comparator: &C,
    ) -> Option<Rid> {
        for i in 0..self.size() {
            let (k, rid) = self.entry(i);
            if comparator.compare(&k, key) == Ordering::Equal {
                return Some(rid);
            }
        }
        None
    }

    /// Removes the first pair matching `key`, if present. Returns the size
    /// after the operation.
    pub fn remove_and_delete_record<C: KeyComparator<N>>(
        &mut self,
        key: &GenericKey<N>,
        comparator: &C,
    ) -> usize {
        let size = self.size();
        let index = (0..size)
            .find(|&i| comparator.compare(&self.key_at(i), key) == Ordering::Equal);
        if let Some(index) = index {
            self.data.copy_within(
                Self::entry_offset(index + 1)..Self::entry_offset(size),
                Self::entry_offset(index),
            );
            self.increase_size(-1);
        }
        self.size()
    }

    /// Moves the upper half of this page's entries to `recipient`.
    ///
    /// The caller relinks the leaf chain afterwards: `recipient.next =
    /// self.next; self.next = recipient.page_id`.
    pub fn move_half_to(&mut self, recipient: &mut Self) {
        let new_size = self.size() / 2;
        let moved: Vec<_> = (new_size..self.size()).map(|i| self.entry(i)).collect();
        recipient.copy_half_from(&moved);
        self.set_size(new_size);
    }

    /// Appends split-off entries from a sibling.
    pub fn copy_half_from(&mut self, entries: &[(GenericKey<N>, Rid)]) {
        assert!(
            self.size() + entries.len() <= self.max_size(),
            "split recipient overflow"
        );
        let start = self.size();
        for (i, entry) in entries.iter().enumerate() {
            self.set_entry(start + i, entry);
        }
        self.increase_size(entries.len() as i32);
    }

    /// Moves every entry to `recipient` (merge) and drops out of the leaf
    /// chain. The caller relinks the chain before invoking.
    pub fn move_all_to(&mut self, recipient: &mut Self, _index_in_parent: usize) {
        let moved: Vec<_> = (0..self.size()).map(|i| self.entry(i)).collect();
        recipient.copy_all_from(&moved);
        self.set_size(0);
        self.set_next_page_id(INVALID_PAGE_ID);
    }

    /// Appends merged entries from a sibling.
    pub fn copy_all_from(&mut self, entries: &[(GenericKey<N>, Rid)]) {
        assert!(
            self.size() + entries.len() <= self.max_size(),
            "merge recipient overflow"
        );
        let start = self.size();
        for (i, entry) in entries.iter().enumerate() {
            self.set_entry(start + i, entry);
        }
        self.increase_size(entries.len() as i32);
    }

    /// Moves this page's first entry to the end of `recipient`. The caller
    /// updates the parent's separator key afterwards.
    pub fn move_first_to_end_of(&mut self, recipient: &mut Self) {
        let size = self.size();
        assert!(size > 0, "redistribution from an empty leaf");
        recipient.copy_last_from(&self.entry(0));
        self.data.copy_within(
            Self::entry_offset(1)..Self::entry_offset(size),
            Self::entry_offset(0),
        );
        self.increase_size(-1);
    }

    /// Appends a redistributed pair.
    pub fn copy_last_from(&mut self, entry: &(GenericKey<N>, Rid)) {
        assert!(self.size() < self.max_size(), "redistribution overflow");
        let index = self.size();
        self.set_entry(index, entry);
        self.increase_size(1);
    }

    /// Moves this page's last entry to the front of `recipient`. The caller
    /// updates the parent's separator key for `parent_index` afterwards.
    pub fn move_last_to_front_of(&mut self, recipient: &mut Self, parent_index: usize) {
        let size = self.size();
        assert!(size > 0, "redistribution from an empty leaf");
        recipient.copy_first_from(&self.entry(size - 1), parent_index);
        self.increase_size(-1);
    }

    /// Prepends a redistributed pair.
    pub fn copy_first_from(&mut self, entry: &(GenericKey<N>, Rid), _parent_index: usize) {
        assert!(self.size() < self.max_size(), "redistribution overflow");
        let size = self.size();
        self.data.copy_within(
            Self::entry_offset(0)..Self::entry_offset(size),
            Self::entry_offset(1),
        );
        self.set_entry(0, entry);
        self.increase_size(1);
    }

    /// Renders a human-readable dump, for debugging only.
    pub fn describe(&self, verbose: bool) -> String {
        if self.size() == 0 {
            return String::new();
        }
        let mut out = String::new();
        if verbose {
            out.push_str(&format!(
                "[pageId: {} parentId: {}]<{}> ",
                self.page_id(),
                self.parent_page_id(),
                self.size()
            ));
        }
        for i in 0..self.size() {
            if i > 0 {
                out.push(' ');
            }
            let (key, rid) = self.entry(i);
            out.push_str(&key.to_string());
            if verbose {
                out.push_str(&format!("({})", rid));
            }
        }
        out
    }
}

impl<const N: usize> Default for BPlusTreeLeafPage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BPlusTreePage for BPlusTreeLeafPage<N> {
    fn data(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    fn data_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }
}
