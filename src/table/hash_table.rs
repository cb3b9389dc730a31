//! HashTable implementation
//!
//! Fixed array of bucket heads, each owning a singly linked collision chain.
//! New keys are prepended, so a chain lists its keys newest-first.

use crate::config::BucketStrategy;

use super::bucket::{bucket_index, TABLE_SIZE};

/// One entry of a collision chain
#[derive(Debug)]
struct KeyNode {
    key: String,
    value: String,
    next: Option<Box<KeyNode>>,
}

/// Chained hash table with `TABLE_SIZE` buckets and no resizing
///
/// Not synchronized: the engine owns the only instance behind its mutex.
#[derive(Debug)]
pub struct HashTable {
    /// Bucket heads
    buckets: Vec<Option<Box<KeyNode>>>,

    /// Key → bucket mapping, fixed at creation
    strategy: BucketStrategy,

    /// Number of stored pairs
    len: usize,
}

impl HashTable {
    /// Create a table with every bucket empty
    pub fn new(strategy: BucketStrategy) -> Self {
        Self {
            buckets: (0..TABLE_SIZE).map(|_| None).collect(),
            strategy,
            len: 0,
        }
    }

    /// Insert or overwrite `key`.
    ///
    /// Returns `false` when the key has no bucket under the table's strategy;
    /// such keys are dropped.
    pub fn put(&mut self, key: &str, value: &str) -> bool {
        let Some(index) = bucket_index(self.strategy, key) else {
            return false;
        };

        let mut node = self.buckets[index].as_deref_mut();
        while let Some(current) = node {
            if current.key == key {
                current.value = value.to_string();
                return true;
            }
            node = current.next.as_deref_mut();
        }

        let head = self.buckets[index].take();
        self.buckets[index] = Some(Box::new(KeyNode {
            key: key.to_string(),
            value: value.to_string(),
            next: head,
        }));
        self.len += 1;
        true
    }

    /// Copy of the value stored under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        let index = bucket_index(self.strategy, key)?;

        let mut node = self.buckets[index].as_deref();
        while let Some(current) = node {
            if current.key == key {
                return Some(current.value.clone());
            }
            node = current.next.as_deref();
        }
        None
    }

    /// Unlink `key` from its chain. Returns `false` if it was absent.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(index) = bucket_index(self.strategy, key) else {
            return false;
        };

        // Walk to the link that points at the match (or at the end of the chain)
        let mut link = &mut self.buckets[index];
        while link.as_ref().map_or(false, |node| node.key != key) {
            if let Some(node) = link {
                link = &mut node.next;
            }
        }

        match link.take() {
            Some(removed) => {
                let KeyNode { next, .. } = *removed;
                *link = next;
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Number of stored pairs
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the table holds no pairs
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bucket strategy this table was created with
    pub fn strategy(&self) -> BucketStrategy {
        self.strategy
    }

    /// Iterate pairs in bucket order, newest-first within each chain
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            buckets: self.buckets.iter(),
            node: None,
        }
    }

    /// Owned copy of every pair, in `iter()` order
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    /// Remove every pair, keeping the bucket array
    pub fn clear(&mut self) {
        for bucket in self.buckets.iter_mut() {
            let mut node = bucket.take();
            while let Some(mut current) = node {
                node = current.next.take();
            }
        }
        self.len = 0;
    }
}

impl Drop for HashTable {
    // Chains are unlinked iteratively so a long chain cannot overflow the stack
    fn drop(&mut self) {
        self.clear();
    }
}

/// Iterator over `(key, value)` pairs of a [`HashTable`]
pub struct Iter<'a> {
    buckets: std::slice::Iter<'a, Option<Box<KeyNode>>>,
    node: Option<&'a KeyNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                return Some((node.key.as_str(), node.value.as_str()));
            }
            self.node = self.buckets.next()?.as_deref();
        }
    }
}
