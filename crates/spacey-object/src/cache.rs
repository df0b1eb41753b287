// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-context property cache.
//!
//! Maps a terminal shape and an id to the shape describing that id on the
//! chain. Shape nodes never change after creation and freed nodes come
//! back under a new generation, so an entry can only go stale by becoming
//! unreachable; it is never wrong.

use crate::id::PropertyId;
use crate::shape::ShapeId;
use rustc_hash::FxHashMap;

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that fell through to the scope.
    pub misses: u64,
    /// Times the cache was emptied.
    pub flushes: u64,
}

/// Cache of own-property lookups keyed by terminal shape.
#[derive(Debug)]
pub struct PropertyCache {
    map: FxHashMap<(ShapeId, PropertyId), ShapeId>,
    capacity: usize,
    stats: CacheStats,
}

impl PropertyCache {
    /// Creates a cache holding at most `capacity` entries. Zero disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            capacity,
            stats: CacheStats::default(),
        }
    }

    /// Looks up `id` on the chain ending at `last`.
    pub fn get(&mut self, last: ShapeId, id: &PropertyId) -> Option<ShapeId> {
        if self.capacity == 0 {
            return None;
        }
        match self.map.get(&(last, id.clone())) {
            Some(sid) => {
                self.stats.hits += 1;
                Some(*sid)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Records a lookup result, flushing first when full.
    pub fn insert(&mut self, last: ShapeId, id: PropertyId, sid: ShapeId) {
        if self.capacity == 0 {
            return;
        }
        if self.map.len() >= self.capacity {
            self.purge();
        }
        self.map.insert((last, id), sid);
    }

    /// Drops every entry.
    pub fn purge(&mut self) {
        if !self.map.is_empty() {
            self.map.clear();
            self.stats.flushes += 1;
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Counters.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_and_miss() {
        let mut cache = PropertyCache::new(8);
        let id = PropertyId::from("x");
        assert!(cache.get(ShapeId::EMPTY, &id).is_none());
        cache.insert(ShapeId::EMPTY, id.clone(), ShapeId::EMPTY);
        assert_eq!(cache.get(ShapeId::EMPTY, &id), Some(ShapeId::EMPTY));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_flushes_when_full() {
        let mut cache = PropertyCache::new(2);
        for i in 0..3u32 {
            cache.insert(ShapeId::EMPTY, PropertyId::from(i), ShapeId::EMPTY);
        }
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().flushes, 1);
    }

    #[test]
    fn test_disabled_cache() {
        let mut cache = PropertyCache::new(0);
        cache.insert(ShapeId::EMPTY, PropertyId::from("x"), ShapeId::EMPTY);
        assert!(cache.is_empty());
    }
}
