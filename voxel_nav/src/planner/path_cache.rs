//! # Path Cache
//!
//! Stores the result of every successful search keyed by its rounded start and goal.
//!
//! Entries are never trusted: terrain may have changed since the route was planned and there is
//! no invalidation scheme, so the planner treats every entry as stale and searches again. The
//! cache is still populated and bounded so that reuse can be enabled once invalidation exists.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashMap, VecDeque};

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use super::PathResult;
use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of cached results.
pub const PATH_CACHE_CAPACITY: usize = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Key of a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub start: Voxel,
    pub goal: Voxel,
}

/// Bounded map of search results, evicting the oldest inserted key once full.
#[derive(Debug, Clone)]
pub struct PathCache {
    entries: HashMap<CacheKey, PathResult>,
    order: VecDeque<CacheKey>,
    capacity: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CacheKey {
    pub fn new(start: &Point3<f64>, goal: &Point3<f64>) -> Self {
        Self {
            start: Voxel::round(start),
            goal: Voxel::round(goal),
        }
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::with_capacity(PATH_CACHE_CAPACITY)
    }
}

impl PathCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Get the stored entry for the key, if there is one.
    pub fn lookup(&self, key: &CacheKey) -> Option<&PathResult> {
        self.entries.get(key)
    }

    /// Whether a looked up entry can be returned in place of a new search. Always false, see the
    /// module documentation.
    pub fn is_fresh(&self, _entry: &PathResult) -> bool {
        false
    }

    /// Store a result. Replacing an existing key keeps its original insertion position.
    pub fn store(&mut self, key: CacheKey, result: PathResult) {
        if self.entries.insert(key, result).is_none() {
            self.order.push_back(key);
        }

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn key(i: i32) -> CacheKey {
        CacheKey {
            start: Voxel::new(0, 64, 0),
            goal: Voxel::new(i, 64, 0),
        }
    }

    #[test]
    fn test_store_and_evict() {
        let mut cache = PathCache::new();
        for i in 0..(PATH_CACHE_CAPACITY as i32 + 20) {
            cache.store(key(i), PathResult::default());
            assert!(cache.len() <= PATH_CACHE_CAPACITY);
        }

        assert_eq!(cache.len(), PATH_CACHE_CAPACITY);
        assert!(cache.lookup(&key(19)).is_none());
        assert!(cache.lookup(&key(20)).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_are_never_fresh() {
        let mut cache = PathCache::with_capacity(2);
        cache.store(key(1), PathResult::default());
        let entry = cache.lookup(&key(1)).unwrap();
        assert!(!cache.is_fresh(entry));
    }

    #[test]
    fn test_key_rounds_positions() {
        let k = CacheKey::new(&Point3::new(0.4, 64.6, -0.6), &Point3::new(9.5, 64.0, 0.0));
        assert_eq!(k.start, Voxel::new(0, 65, -1));
        assert_eq!(k.goal, Voxel::new(10, 64, 0));
    }
}
