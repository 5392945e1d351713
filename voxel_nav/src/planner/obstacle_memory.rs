//! # Obstacle Memory
//!
//! Voxels previously found unreachable. The planner never expands a remembered voxel.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::{HashSet, VecDeque};

use log::trace;

use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maximum number of remembered obstacles.
pub const OBSTACLE_MEMORY_CAPACITY: usize = 1000;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Bounded set of obstacle voxels, evicting the oldest inserted entry once full.
#[derive(Debug, Clone)]
pub struct ObstacleMemory {
    set: HashSet<Voxel>,

    /// Insertion order, oldest at the front
    order: VecDeque<Voxel>,

    capacity: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for ObstacleMemory {
    fn default() -> Self {
        Self::with_capacity(OBSTACLE_MEMORY_CAPACITY)
    }
}

impl ObstacleMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            set: HashSet::with_capacity(capacity + 1),
            order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Remember the voxel as an obstacle. Marking an already remembered voxel does not refresh its
    /// age.
    pub fn mark(&mut self, voxel: Voxel) {
        if !self.set.insert(voxel) {
            return;
        }
        self.order.push_back(voxel);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
                trace!("Obstacle memory full, forgetting {}", oldest);
            }
        }
    }

    /// Forget the voxel, no-op if it isn't remembered.
    pub fn clear(&mut self, voxel: Voxel) {
        if self.set.remove(&voxel) {
            self.order.retain(|v| *v != voxel);
        }
    }

    /// Forget every obstacle.
    pub fn clear_all(&mut self) {
        self.set.clear();
        self.order.clear();
    }

    pub fn contains(&self, voxel: &Voxel) -> bool {
        self.set.contains(voxel)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mark_and_clear() {
        let mut mem = ObstacleMemory::new();
        let v = Voxel::new(1, 2, 3);

        mem.mark(v);
        mem.mark(v);
        assert_eq!(mem.len(), 1);
        assert!(mem.contains(&v));

        mem.clear(v);
        assert!(!mem.contains(&v));
        assert!(mem.is_empty());

        // Clearing something never marked is a no-op
        mem.clear(Voxel::new(9, 9, 9));
        assert!(mem.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut mem = ObstacleMemory::new();
        for i in 0..(OBSTACLE_MEMORY_CAPACITY as i32 + 250) {
            mem.mark(Voxel::new(i, 0, 0));
            assert!(mem.len() <= OBSTACLE_MEMORY_CAPACITY);
        }

        assert_eq!(mem.len(), OBSTACLE_MEMORY_CAPACITY);
        assert!(!mem.contains(&Voxel::new(0, 0, 0)));
        assert!(!mem.contains(&Voxel::new(249, 0, 0)));
        assert!(mem.contains(&Voxel::new(250, 0, 0)));
        assert!(mem.contains(&Voxel::new(OBSTACLE_MEMORY_CAPACITY as i32 + 249, 0, 0)));

        mem.clear_all();
        assert!(mem.is_empty());
        mem.mark(Voxel::new(0, 0, 0));
        assert_eq!(mem.len(), 1);
    }

    #[test]
    fn test_clear_keeps_order_consistent() {
        let mut mem = ObstacleMemory::with_capacity(3);
        mem.mark(Voxel::new(0, 0, 0));
        mem.mark(Voxel::new(1, 0, 0));
        mem.clear(Voxel::new(0, 0, 0));
        mem.mark(Voxel::new(2, 0, 0));
        mem.mark(Voxel::new(3, 0, 0));

        // Nothing should have been evicted, the cleared entry freed a slot
        assert_eq!(mem.len(), 3);
        assert!(mem.contains(&Voxel::new(1, 0, 0)));

        mem.mark(Voxel::new(4, 0, 0));
        assert!(!mem.contains(&Voxel::new(1, 0, 0)));
        assert_eq!(mem.len(), 3);
    }
}
