//! Chained hash table shared by dicts, call-frame variables and the command
//! registry.
//!
//! Buckets are singly-linked chains, the bucket count is always a power of
//! two and the index is taken with a mask. Every table carries its own seed
//! which is mixed into the hash, so two tables holding the same keys lay
//! them out differently. Build with the `deterministic-hash` feature to pin
//! the seed.

use std::fmt::Write as _;

const INITIAL_SIZE: usize = 16;

/// Anything that can be used as a key: hashing and equality both work on
/// the key's byte view.
pub trait HashKey {
    fn key_bytes(&self) -> &[u8];
}

impl HashKey for str {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl HashKey for String {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl HashKey for Box<str> {
    fn key_bytes(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl HashKey for [u8] {
    fn key_bytes(&self) -> &[u8] {
        self
    }
}

/// The string hash: walks the bytes back to front, `h += (h << 3) + byte`,
/// starting from the table seed.
pub fn hash_bytes(seed: u32, bytes: &[u8]) -> u32 {
    let mut h = seed;
    for &b in bytes.iter().rev() {
        h = h.wrapping_add(h.wrapping_shl(3)).wrapping_add(u32::from(b));
    }
    h
}

#[cfg(feature = "deterministic-hash")]
fn new_seed() -> u32 {
    0
}

#[cfg(not(feature = "deterministic-hash"))]
fn new_seed() -> u32 {
    fastrand::u32(..)
}

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    next: Option<Box<Entry<K, V>>>,
}

#[derive(Clone)]
pub struct HashTable<K, V> {
    buckets: Vec<Option<Box<Entry<K, V>>>>,
    used: usize,
    seed: u32,
}

impl<K: HashKey, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HashKey, V> HashTable<K, V> {
    /// An empty table with a fresh seed. No buckets are allocated until the
    /// first insert.
    pub fn new() -> Self {
        Self::with_seed(new_seed())
    }

    pub fn with_seed(seed: u32) -> Self {
        HashTable { buckets: Vec::new(), used: 0, seed }
    }

    pub fn len(&self) -> usize {
        self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of buckets (always zero or a power of two).
    pub fn size(&self) -> usize {
        self.buckets.len()
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    fn index_for(&self, bytes: &[u8]) -> usize {
        hash_bytes(self.seed, bytes) as usize & (self.buckets.len() - 1)
    }

    // ---- Lookup ----

    pub fn get<Q: HashKey + ?Sized>(&self, key: &Q) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q: HashKey + ?Sized>(&self, key: &Q) -> Option<(&K, &V)> {
        if self.buckets.is_empty() {
            return None;
        }
        let bytes = key.key_bytes();
        let mut cur = self.buckets[self.index_for(bytes)].as_deref();
        while let Some(entry) = cur {
            if entry.key.key_bytes() == bytes {
                return Some((&entry.key, &entry.value));
            }
            cur = entry.next.as_deref();
        }
        None
    }

    pub fn get_mut<Q: HashKey + ?Sized>(&mut self, key: &Q) -> Option<&mut V> {
        if self.buckets.is_empty() {
            return None;
        }
        let bytes = key.key_bytes();
        let idx = self.index_for(bytes);
        let mut cur = self.buckets[idx].as_deref_mut();
        while let Some(entry) = cur {
            if entry.key.key_bytes() == bytes {
                return Some(&mut entry.value);
            }
            cur = entry.next.as_deref_mut();
        }
        None
    }

    pub fn contains_key<Q: HashKey + ?Sized>(&self, key: &Q) -> bool {
        self.get_key_value(key).is_some()
    }

    // ---- Mutation ----

    fn expand_if_needed(&mut self) {
        if self.buckets.is_empty() {
            self.resize(INITIAL_SIZE);
        } else if self.used == self.buckets.len() {
            self.resize(self.buckets.len() * 2);
        }
    }

    /// Re-hash into `size` buckets, moving entries bucket by bucket.
    fn resize(&mut self, size: usize) {
        let size = size.max(INITIAL_SIZE).next_power_of_two();
        let old = std::mem::replace(&mut self.buckets, Vec::with_capacity(size));
        self.buckets.resize_with(size, || None);
        for mut chain in old {
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                let idx = self.index_for(entry.key.key_bytes());
                entry.next = self.buckets[idx].take();
                self.buckets[idx] = Some(entry);
            }
        }
    }

    fn insert_new(&mut self, key: K, value: V) {
        self.expand_if_needed();
        let idx = self.index_for(key.key_bytes());
        let next = self.buckets[idx].take();
        self.buckets[idx] = Some(Box::new(Entry { key, value, next }));
        self.used += 1;
    }

    /// Inserts a new entry. Returns `false` (and drops the pair) when the key
    /// is already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if self.contains_key(key.key_bytes()) {
            return false;
        }
        self.insert_new(key, value);
        true
    }

    /// Insert-or-update. An existing entry keeps its original key and gets
    /// the new value. Returns `true` when the key already existed.
    pub fn replace(&mut self, key: K, value: V) -> bool {
        if let Some(slot) = self.get_mut(key.key_bytes()) {
            *slot = value;
            return true;
        }
        self.insert_new(key, value);
        false
    }

    /// Removes an entry, returning its key and value.
    pub fn remove_entry<Q: HashKey + ?Sized>(&mut self, key: &Q) -> Option<(K, V)> {
        if self.buckets.is_empty() {
            return None;
        }
        let bytes = key.key_bytes();
        let idx = self.index_for(bytes);
        let mut link = &mut self.buckets[idx];
        while link.as_ref().is_some_and(|e| e.key.key_bytes() != bytes) {
            link = &mut link.as_mut()?.next;
        }
        let entry = link.take()?;
        let Entry { key, value, next } = *entry;
        *link = next;
        self.used -= 1;
        Some((key, value))
    }

    pub fn remove<Q: HashKey + ?Sized>(&mut self, key: &Q) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.used = 0;
    }

    /// Keeps only the entries for which `keep` returns true. This is the
    /// supported way to delete while walking the table.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        for bucket in &mut self.buckets {
            let mut chain = bucket.take();
            let mut tail = &mut *bucket;
            while let Some(mut entry) = chain {
                chain = entry.next.take();
                if keep(&entry.key, &mut entry.value) {
                    tail = &mut tail.insert(entry).next;
                } else {
                    self.used -= 1;
                }
            }
        }
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&K, &mut V)) {
        for bucket in &mut self.buckets {
            let mut cur = bucket.as_deref_mut();
            while let Some(entry) = cur {
                f(&entry.key, &mut entry.value);
                cur = entry.next.as_deref_mut();
            }
        }
    }

    // ---- Iteration ----

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter { buckets: self.buckets.iter(), current: None, remaining: self.used }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Bucket distribution report, as shown by `dict info`.
    pub fn stats(&self) -> String {
        let mut out = format!("{} entries in table, {} buckets", self.used, self.buckets.len());
        let mut histogram = [0usize; 10];
        let mut longest = 0;
        for bucket in &self.buckets {
            let mut len = 0;
            let mut cur = bucket.as_deref();
            while let Some(entry) = cur {
                len += 1;
                cur = entry.next.as_deref();
            }
            longest = longest.max(len);
            histogram[len.min(histogram.len() - 1)] += 1;
        }
        for (len, count) in histogram.iter().enumerate() {
            if *count > 0 {
                let _ = write!(out, "\nnumber of buckets with {len} entries: {count}");
            }
        }
        let _ = write!(out, "\nmax chain length: {longest}");
        out
    }
}

impl<K: HashKey + std::fmt::Debug, V: std::fmt::Debug> std::fmt::Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, V> {
    buckets: std::slice::Iter<'a, Option<Box<Entry<K, V>>>>,
    current: Option<&'a Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current {
                self.current = entry.next.as_deref();
                self.remaining -= 1;
                return Some((&entry.key, &entry.value));
            }
            self.current = self.buckets.next()?.as_deref();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K: HashKey, V> IntoIterator for &'a HashTable<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
