//! Page replacement policies for the buffer pool.

use crate::frame::FrameId;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Trait for page replacement algorithms.
pub trait Replacer: Send + Sync {
    /// Makes a frame a replacement candidate, or refreshes its recency if it
    /// already is one.
    fn insert(&self, frame_id: FrameId);

    /// Selects and removes a victim frame for eviction.
    ///
    /// Returns None if no frames are candidates.
    fn victim(&self) -> Option<FrameId>;

    /// Removes a frame from the replacer. Returns true if it was present.
    fn erase(&self, frame_id: FrameId) -> bool;

    /// Returns the number of candidate frames.
    fn size(&self) -> usize;
}

/// Least-recently-used replacement policy.
///
/// Frames become candidates when their pin count drops to zero; the buffer
/// pool inserts them at that moment, so the front of the queue is the frame
/// unpinned longest ago. Membership is unique: re-inserting a frame moves it
/// to the back instead of duplicating it.
pub struct LruReplacer {
    inner: Mutex<LruInner>,
}

struct LruInner {
    /// Candidate frames, least recent at the front.
    queue: VecDeque<FrameId>,
    /// Set view of the queue for O(1) membership checks.
    members: HashSet<FrameId>,
}

impl LruReplacer {
    /// Creates a new empty LRU replacer.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruInner {
                queue: VecDeque::new(),
                members: HashSet::new(),
            }),
        }
    }
}

impl Default for LruReplacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Replacer for LruReplacer {
    fn insert(&self, frame_id: FrameId) {
        let mut inner = self.inner.lock();
        if inner.members.contains(&frame_id) {
            // Touch: move to the back
            inner.queue.retain(|&f| f != frame_id);
        } else {
            inner.members.insert(frame_id);
        }
        inner.queue.push_back(frame_id);
    }

    fn victim(&self) -> Option<FrameId> {
        let mut inner = self.inner.lock();
        let victim = inner.queue.pop_front()?;
        inner.members.remove(&victim);
        Some(victim)
    }

    fn erase(&self, frame_id: FrameId) -> bool {
        let mut inner = self.inner.lock();
        if inner.members.remove(&frame_id) {
            inner.queue.retain(|&f| f != frame_id);
            true
        } else {
            false
        }
    }

    fn size(&self) -> usize {
        self.inner.lock().queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_replacer_new() {
        let replacer = LruReplacer::new();
        assert_eq!(replacer.size(), 0);
        assert!(replacer.victim().is_none());
    }

    #[test]
    fn test_lru_replacer_insert_victim() {
        let replacer = LruReplacer::new();

        replacer.insert(FrameId(0));
        replacer.insert(FrameId(1));
        replacer.insert(FrameId(2));
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.victim(), Some(FrameId(0)));
        assert_eq!(replacer.victim(), Some(FrameId(1)));
        assert_eq!(replacer.victim(), Some(FrameId(2)));
        assert!(replacer.victim().is_none());
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_lru_replacer_reinsert_touches() {
        let replacer = LruReplacer::new();

        // Scenario from the LRU ordering contract: 1, 2, 3, then touch 1.
        replacer.insert(FrameId(1));
        replacer.insert(FrameId(2));
        replacer.insert(FrameId(3));
        replacer.insert(FrameId(1));
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.victim(), Some(FrameId(2)));
        assert_eq!(replacer.victim(), Some(FrameId(3)));
        assert_eq!(replacer.victim(), Some(FrameId(1)));
        assert!(replacer.victim().is_none());
    }

    #[test]
    fn test_lru_replacer_erase() {
        let replacer = LruReplacer::new();

        replacer.insert(FrameId(0));
        replacer.insert(FrameId(1));
        replacer.insert(FrameId(2));

        assert!(replacer.erase(FrameId(1)));
        assert!(!replacer.erase(FrameId(1)));
        assert!(!replacer.erase(FrameId(99)));
        assert_eq!(replacer.size(), 2);

        assert_eq!(replacer.victim(), Some(FrameId(0)));
        assert_eq!(replacer.victim(), Some(FrameId(2)));
    }

    #[test]
    fn test_lru_replacer_unique_membership() {
        let replacer = LruReplacer::new();

        replacer.insert(FrameId(7));
        replacer.insert(FrameId(7));
        replacer.insert(FrameId(7));
        assert_eq!(replacer.size(), 1);

        assert_eq!(replacer.victim(), Some(FrameId(7)));
        assert!(replacer.victim().is_none());
    }

    #[test]
    fn test_lru_replacer_interleaved() {
        let replacer = LruReplacer::new();

        replacer.insert(FrameId(0));
        replacer.insert(FrameId(1));
        assert_eq!(replacer.victim(), Some(FrameId(0)));

        replacer.insert(FrameId(2));
        replacer.insert(FrameId(0));
        // Order is now 1, 2, 0
        assert_eq!(replacer.victim(), Some(FrameId(1)));
        assert_eq!(replacer.victim(), Some(FrameId(2)));
        assert_eq!(replacer.victim(), Some(FrameId(0)));
    }
}
