//! Hash table with separate chaining.

use std::fmt;

use tracing::trace;

use crate::error::StoreError;
use crate::traits::{KeyPolicy, StringKeys};

/// Bucket count used by [`ChainedStore::new`].
pub const DEFAULT_BUCKETS: u32 = 128;

/// One stored pair. The store owns both halves.
struct Entry {
    key: Box<[u8]>,
    value: Box<[u8]>,
}

/// What a [`ChainedStore::put`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was absent; a new entry was created.
    Inserted,
    /// The key existed with a different value, which was replaced.
    Replaced,
    /// The key already held an identical value; nothing was copied.
    Unchanged,
}

/// Fixed-size hash table with separate chaining.
///
/// Keys are hashed with the store's [`KeyPolicy`] and reduced modulo the
/// bucket count, which never changes after construction. Each bucket is an
/// owned chain of entries; chains grow without rehashing, so lookups degrade
/// linearly once the load factor climbs well past 1.
pub struct ChainedStore<P: KeyPolicy = StringKeys> {
    buckets: Vec<Vec<Entry>>,
    len: usize,
    policy: P,
}

impl ChainedStore<StringKeys> {
    /// Create an empty byte-string store with [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self::from_parts(DEFAULT_BUCKETS, StringKeys)
    }
}

impl Default for ChainedStore<StringKeys> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: KeyPolicy> ChainedStore<P> {
    /// Create an empty store with a fixed number of buckets.
    pub fn with_buckets(bucket_count: u32) -> Result<Self, StoreError> {
        if bucket_count == 0 {
            return Err(StoreError::ZeroBuckets);
        }
        Ok(Self::from_parts(bucket_count, P::default()))
    }

    fn from_parts(bucket_count: u32, policy: P) -> Self {
        Self {
            buckets: empty_buckets(bucket_count),
            len: 0,
            policy,
        }
    }

    fn bucket_index(&self, key: &[u8]) -> usize {
        // Bucket count fits in u32, so the remainder does too.
        (self.policy.hash(key) % self.buckets.len() as u32) as usize
    }

    fn find(&self, key: &[u8]) -> Option<&Entry> {
        let chain = &self.buckets[self.bucket_index(key)];
        chain
            .iter()
            .find(|e| self.policy.compare(&e.key, key).is_eq())
    }

    /// Store a copy of `value` under a copy of `key`.
    ///
    /// An existing key keeps its entry; its value is only reallocated when the
    /// new bytes differ from the stored ones.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> PutOutcome {
        let idx = self.bucket_index(key);
        let policy = &self.policy;
        if let Some(entry) = self.buckets[idx]
            .iter_mut()
            .find(|e| policy.compare(&e.key, key).is_eq())
        {
            if *entry.value == *value {
                trace!(key_len = key.len(), bucket = idx, "value unchanged");
                return PutOutcome::Unchanged;
            }
            entry.value = Box::from(value);
            trace!(key_len = key.len(), bucket = idx, "replaced value");
            return PutOutcome::Replaced;
        }

        self.buckets[idx].push(Entry {
            key: Box::from(key),
            value: Box::from(value),
        });
        self.len += 1;
        trace!(key_len = key.len(), bucket = idx, "inserted entry");
        PutOutcome::Inserted
    }

    /// Store an already-owned pair without copying it.
    ///
    /// Same semantics as [`put`](Self::put); used when pairs move between
    /// stores during rebalancing.
    pub fn put_owned(&mut self, key: Box<[u8]>, value: Box<[u8]>) -> PutOutcome {
        let idx = self.bucket_index(&key);
        let policy = &self.policy;
        if let Some(entry) = self.buckets[idx]
            .iter_mut()
            .find(|e| policy.compare(&e.key, &key).is_eq())
        {
            if entry.value == value {
                trace!(key_len = key.len(), bucket = idx, "value unchanged");
                return PutOutcome::Unchanged;
            }
            entry.value = value;
            trace!(key_len = key.len(), bucket = idx, "replaced value");
            return PutOutcome::Replaced;
        }

        trace!(key_len = key.len(), bucket = idx, "inserted entry");
        self.buckets[idx].push(Entry { key, value });
        self.len += 1;
        PutOutcome::Inserted
    }

    /// Borrow the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.find(key).map(|e| &*e.value)
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Delete the entry for `key`, handing back its value.
    ///
    /// Absent keys are a no-op.
    pub fn remove(&mut self, key: &[u8]) -> Option<Box<[u8]>> {
        let idx = self.bucket_index(key);
        let policy = &self.policy;
        let chain = &mut self.buckets[idx];
        let pos = chain
            .iter()
            .position(|e| policy.compare(&e.key, key).is_eq())?;
        let entry = chain.swap_remove(pos);
        self.len -= 1;
        trace!(key_len = key.len(), bucket = idx, "removed entry");
        Some(entry.value)
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the store holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed number of buckets.
    pub fn bucket_count(&self) -> u32 {
        self.buckets.len() as u32
    }

    /// Iterate over all pairs, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.buckets
            .iter()
            .flatten()
            .map(|e| (&*e.key, &*e.value))
    }

    /// Take every pair out of the store, leaving it empty.
    ///
    /// The store is emptied immediately, even if the returned iterator is
    /// dropped before it is exhausted.
    pub fn drain(&mut self) -> Drain {
        let count = self.bucket_count();
        let buckets = std::mem::replace(&mut self.buckets, empty_buckets(count));
        self.len = 0;
        Drain {
            inner: buckets.into_iter().flatten(),
        }
    }

    /// Release every entry and the bucket array.
    pub fn destroy(self) {
        trace!(entries = self.len, "destroying store");
    }
}

impl<P: KeyPolicy> fmt::Debug for ChainedStore<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedStore")
            .field("buckets", &self.buckets.len())
            .field("len", &self.len)
            .finish()
    }
}

/// Owning iterator returned by [`ChainedStore::drain`].
pub struct Drain {
    inner: std::iter::Flatten<std::vec::IntoIter<Vec<Entry>>>,
}

impl Iterator for Drain {
    type Item = (Box<[u8]>, Box<[u8]>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|e| (e.key, e.value))
    }
}

fn empty_buckets(count: u32) -> Vec<Vec<Entry>> {
    (0..count).map(|_| Vec::new()).collect()
}
