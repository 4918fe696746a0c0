//! Extendible hash table used as the buffer pool's page directory.

use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const HASH_BITS: u32 = u64::BITS;

/// Computes the 64-bit hash of a key.
fn hash_of<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// A bucket holding up to `bucket_size` key-value pairs.
struct Bucket<K, V> {
    local_depth: u32,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(bucket_size: usize, local_depth: u32) -> Self {
        Self {
            local_depth,
            items: Vec::with_capacity(bucket_size),
        }
    }
}

struct Inner<K, V> {
    global_depth: u32,
    /// Directory of 2^global_depth slots, each referencing a bucket by slab
    /// index. Buckets with local depth d are shared by 2^(global_depth - d)
    /// consecutive slots.
    directory: Vec<usize>,
    /// Bucket slab; freed entries are recycled through `free_slots`.
    buckets: Vec<Option<Bucket<K, V>>>,
    free_slots: Vec<usize>,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Directory slot for a key: the high `global_depth` bits of the
    /// bit-reversed hash. Reversing makes directory doubling a mirror
    /// expansion instead of a reshuffle.
    fn dir_index(&self, key: &K) -> usize {
        if self.global_depth == 0 {
            return 0;
        }
        (hash_of(key).reverse_bits() >> (HASH_BITS - self.global_depth)) as usize
    }

    fn bucket(&self, slab_index: usize) -> &Bucket<K, V> {
        self.buckets[slab_index]
            .as_ref()
            .expect("directory references a freed bucket")
    }

    fn bucket_mut(&mut self, slab_index: usize) -> &mut Bucket<K, V> {
        self.buckets[slab_index]
            .as_mut()
            .expect("directory references a freed bucket")
    }

    fn alloc_bucket(&mut self, bucket_size: usize, local_depth: u32) -> usize {
        let bucket = Bucket::new(bucket_size, local_depth);
        match self.free_slots.pop() {
            Some(slot) => {
                self.buckets[slot] = Some(bucket);
                slot
            }
            None => {
                self.buckets.push(Some(bucket));
                self.buckets.len() - 1
            }
        }
    }

    fn free_bucket(&mut self, slab_index: usize) -> Vec<(K, V)> {
        let bucket = self.buckets[slab_index]
            .take()
            .expect("double free of bucket");
        self.free_slots.push(slab_index);
        bucket.items
    }
}

/// Extendible hash table.
///
/// A directory of 2^global_depth slots addresses a set of shared buckets,
/// each with a fixed entry capacity and its own local depth. Overflowing
/// buckets split; when the overflowing bucket already distinguishes as many
/// hash bits as the directory, the directory doubles first. Buckets never
/// merge and the directory never shrinks.
///
/// All operations are serialized by a single internal mutex.
pub struct ExtendibleHashTable<K, V> {
    bucket_size: usize,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a table with one empty bucket and the given per-bucket
    /// capacity.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size > 0, "bucket_size must be positive");
        Self {
            bucket_size,
            inner: Mutex::new(Inner {
                global_depth: 0,
                directory: vec![0],
                buckets: vec![Some(Bucket::new(bucket_size, 0))],
                free_slots: Vec::new(),
            }),
        }
    }

    /// Looks up the value for a key.
    pub fn find(&self, key: &K) -> Option<V> {
        let inner = self.inner.lock();
        let slab = inner.directory[inner.dir_index(key)];
        inner
            .bucket(slab)
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Removes the entry for a key. Returns true if it was present.
    ///
    /// Buckets never merge on removal; the freed capacity is simply
    /// available for later inserts.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let slab = inner.directory[inner.dir_index(key)];
        let bucket = inner.bucket_mut(slab);
        match bucket.items.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                bucket.items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Inserts a key-value pair, overwriting the value if the key exists.
    ///
    /// Splits the target bucket (and doubles the directory when needed)
    /// until the pair fits. Each split raises either the bucket's local
    /// depth or the global depth, so the loop terminates for distinct keys.
    pub fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock();

        let slab = inner.directory[inner.dir_index(&key)];
        if let Some(slot) = inner
            .bucket_mut(slab)
            .items
            .iter_mut()
            .find(|(k, _)| *k == key)
        {
            slot.1 = value;
            return;
        }

        loop {
            let idx = inner.dir_index(&key);
            let slab = inner.directory[idx];
            let bucket = inner.bucket(slab);
            let local_depth = bucket.local_depth;

            if bucket.items.len() < self.bucket_size {
                inner.bucket_mut(slab).items.push((key, value));
                return;
            }

            if local_depth == inner.global_depth {
                // Mirror-expand the directory, then split the full bucket
                // into the two slots that now cover it.
                let old_dir = std::mem::take(&mut inner.directory);
                let mut new_dir = Vec::with_capacity(old_dir.len() * 2);
                for &slot in &old_dir {
                    new_dir.push(slot);
                    new_dir.push(slot);
                }
                inner.directory = new_dir;
                inner.global_depth += 1;

                let depth = inner.global_depth;
                let lo = self.alloc_locked(&mut inner, depth);
                let hi = self.alloc_locked(&mut inner, depth);
                inner.directory[idx << 1] = lo;
                inner.directory[(idx << 1) + 1] = hi;
                self.redistribute_locked(&mut inner, slab);
            } else {
                // Split without doubling: the 2^(global-local) slots sharing
                // this bucket are repointed half-and-half to two new buckets.
                let delta = inner.global_depth - local_depth;
                let start = (idx >> delta) << delta;
                let end = start + (1usize << delta);
                let mid = start + (1usize << (delta - 1));

                let lo = self.alloc_locked(&mut inner, local_depth + 1);
                let hi = self.alloc_locked(&mut inner, local_depth + 1);
                for i in start..mid {
                    inner.directory[i] = lo;
                }
                for i in mid..end {
                    inner.directory[i] = hi;
                }
                self.redistribute_locked(&mut inner, slab);
            }
        }
    }

    fn alloc_locked(&self, inner: &mut Inner<K, V>, local_depth: u32) -> usize {
        inner.alloc_bucket(self.bucket_size, local_depth)
    }

    /// Frees the bucket at `slab` and rehashes its entries through the
    /// (already repointed) directory.
    fn redistribute_locked(&self, inner: &mut Inner<K, V>, slab: usize) {
        for (k, v) in inner.free_bucket(slab) {
            let target = inner.directory[inner.dir_index(&k)];
            inner.bucket_mut(target).items.push((k, v));
        }
    }

    /// Returns the global depth of the directory.
    pub fn global_depth(&self) -> u32 {
        self.inner.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by a directory slot.
    pub fn local_depth(&self, directory_index: usize) -> u32 {
        let inner = self.inner.lock();
        let slab = inner.directory[directory_index];
        inner.bucket(slab).local_depth
    }

    /// Returns the number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        let inner = self.inner.lock();
        inner.buckets.iter().filter(|b| b.is_some()).count()
    }

    /// Returns the number of directory slots (2^global_depth).
    pub fn dir_size(&self) -> usize {
        self.inner.lock().directory.len()
    }

    /// Returns the total number of stored entries.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner
            .buckets
            .iter()
            .flatten()
            .map(|b| b.items.len())
            .sum()
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use std::sync::Arc;

    #[test]
    fn test_hash_table_new() {
        let table: ExtendibleHashTable<i32, i32> = ExtendibleHashTable::new(2);
        assert_eq!(table.global_depth(), 0);
        assert_eq!(table.num_buckets(), 1);
        assert_eq!(table.dir_size(), 1);
        assert!(table.is_empty());
    }

    #[test]
    fn test_hash_table_insert_find() {
        let table = ExtendibleHashTable::new(4);

        table.insert(1, "one");
        table.insert(2, "two");

        assert_eq!(table.find(&1), Some("one"));
        assert_eq!(table.find(&2), Some("two"));
        assert_eq!(table.find(&3), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_hash_table_overwrite() {
        let table = ExtendibleHashTable::new(4);

        table.insert(1, 100);
        table.insert(1, 200);

        assert_eq!(table.find(&1), Some(200));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_hash_table_remove() {
        let table = ExtendibleHashTable::new(4);

        table.insert(1, 10);
        table.insert(2, 20);

        assert!(table.remove(&1));
        assert!(!table.remove(&1));
        assert!(!table.remove(&99));
        assert_eq!(table.find(&1), None);
        assert_eq!(table.find(&2), Some(20));
    }

    #[test]
    fn test_hash_table_remove_frees_capacity() {
        let table = ExtendibleHashTable::new(2);

        table.insert(1, 1);
        table.insert(2, 2);
        let buckets_before = table.num_buckets();

        // Removing and re-adding a key to the same bucket must not split.
        assert!(table.remove(&1));
        table.insert(1, 11);
        assert_eq!(table.num_buckets(), buckets_before);
        assert_eq!(table.find(&1), Some(11));
    }

    #[test]
    fn test_hash_table_growth() {
        // Five keys through capacity-2 buckets force at least one directory
        // doubling and leave at least three distinct buckets.
        let table = ExtendibleHashTable::new(2);

        for k in 0..5i64 {
            table.insert(k, k);
        }

        for k in 0..5i64 {
            assert_eq!(table.find(&k), Some(k), "key {} lost during growth", k);
        }
        assert!(table.global_depth() >= 1);
        assert!(table.num_buckets() >= 3);
    }

    #[test]
    fn test_hash_table_depth_invariants() {
        let table = ExtendibleHashTable::new(2);
        for k in 0..64i64 {
            table.insert(k, k * 10);
        }

        let global = table.global_depth();
        let dir_size = table.dir_size();
        assert_eq!(dir_size, 1 << global);

        for slot in 0..dir_size {
            let local = table.local_depth(slot);
            assert!(local <= global, "local depth exceeds global at slot {}", slot);
        }
        // Every bucket with local depth d must be shared by exactly
        // 2^(global - d) consecutive slots: slots with the same high d bits
        // must agree on local depth.
        for slot in 0..dir_size {
            let local = table.local_depth(slot);
            let span = 1usize << (global - local);
            let start = (slot / span) * span;
            for other in start..start + span {
                assert_eq!(table.local_depth(other), local);
            }
        }
    }

    #[test]
    fn test_hash_table_many_keys_findable() {
        let mut keys: Vec<i64> = (0..1000).collect();
        keys.shuffle(&mut rand::thread_rng());

        let table = ExtendibleHashTable::new(8);
        for &k in &keys {
            table.insert(k, k * 3);
        }

        assert_eq!(table.len(), 1000);
        for &k in &keys {
            assert_eq!(table.find(&k), Some(k * 3));
        }
    }

    #[test]
    fn test_hash_table_concurrent_inserts() {
        let table = Arc::new(ExtendibleHashTable::new(4));
        let mut handles = Vec::new();

        for t in 0..4i64 {
            let table = Arc::clone(&table);
            handles.push(std::thread::spawn(move || {
                for i in 0..250i64 {
                    let k = t * 1000 + i;
                    table.insert(k, k);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), 1000);
        for t in 0..4i64 {
            for i in 0..250i64 {
                let k = t * 1000 + i;
                assert_eq!(table.find(&k), Some(k));
            }
        }
    }

    #[test]
    fn test_hash_table_string_keys() {
        let table = ExtendibleHashTable::new(2);

        for word in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            table.insert(word.to_string(), word.len());
        }

        assert_eq!(table.find(&"gamma".to_string()), Some(5));
        assert_eq!(table.find(&"zeta".to_string()), None);
    }
}
