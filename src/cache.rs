//! Bounded cache of directory listings, keyed by directory path.
//!
//! A single `/api/fs/list` call populates both `iterdir()` and the
//! `stat()` of every child, so resolving a directory and then statting
//! its entries costs one round-trip instead of N+1. Eviction is FIFO by
//! insertion order; an entry's age is not refreshed by overwrites.

use std::collections::{HashMap, VecDeque};

use crate::api::models::Item;

/// Default ceiling on the number of distinct cached directory paths.
pub const DIR_CACHE_CAP: usize = 1000;

/// FIFO-bounded mapping from directory path to its last-known listing.
#[derive(Debug)]
pub struct DirCache {
    entries: HashMap<String, HashMap<String, Item>>,
    order: VecDeque<String>,
    capacity: usize,
}

impl DirCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cached listing for `dir`, if any.
    pub fn get(&self, dir: &str) -> Option<&HashMap<String, Item>> {
        self.entries.get(dir)
    }

    /// Cached metadata for a single child of `dir`.
    pub fn lookup(&self, dir: &str, name: &str) -> Option<Item> {
        self.entries.get(dir).and_then(|m| m.get(name).cloned())
    }

    /// Store a listing for `dir`, evicting the oldest entry at capacity.
    ///
    /// An empty listing is stored only when `allow_empty` is set; without
    /// it the stale entry (if any) is dropped instead, so the next read
    /// re-fetches rather than treating the directory as permanently empty.
    /// Returns whether the listing was stored.
    pub fn insert(&mut self, dir: &str, listing: HashMap<String, Item>, allow_empty: bool) -> bool {
        if listing.is_empty() && !allow_empty {
            self.invalidate(dir);
            return false;
        }

        if !self.entries.contains_key(dir) {
            if self.entries.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
            self.order.push_back(dir.to_string());
        }
        self.entries.insert(dir.to_string(), listing);
        true
    }

    /// Drop the entry for `dir`, if present.
    pub fn invalidate(&mut self, dir: &str) {
        if self.entries.remove(dir).is_some() {
            self.order.retain(|k| k != dir);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DirCache {
    fn default() -> Self {
        Self::new(DIR_CACHE_CAP)
    }
}
