//! Sparse in-memory voxel map

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use super::{Block, TerrainOracle, VoxelInfo};
use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A sparse voxel world. Any voxel which hasn't been set is air.
#[derive(Debug, Clone, Default)]
pub struct VoxelMap {
    blocks: HashMap<Voxel, Block>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VoxelMap {
    /// Create a new map filled with air.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map with a single solid floor layer at `ground_y`, spanning the given inclusive
    /// x and z ranges. Agents stand at `ground_y + 1`.
    pub fn flat(min_x: i32, max_x: i32, min_z: i32, max_z: i32, ground_y: i32) -> Self {
        let mut map = Self::new();
        map.fill(
            Voxel::new(min_x, ground_y, min_z),
            Voxel::new(max_x, ground_y, max_z),
            Block::Solid,
        );
        map
    }

    /// Set a single voxel. Setting air removes the entry.
    pub fn set(&mut self, voxel: Voxel, block: Block) {
        match block {
            Block::Air => {
                self.blocks.remove(&voxel);
            }
            b => {
                self.blocks.insert(voxel, b);
            }
        }
    }

    /// Fill the inclusive box between the two corners with the given block.
    pub fn fill(&mut self, a: Voxel, b: Voxel, block: Block) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.set(Voxel::new(x, y, z), block);
                }
            }
        }
    }

    /// Get the block at the given voxel.
    pub fn get(&self, voxel: Voxel) -> Block {
        self.blocks.get(&voxel).copied().unwrap_or_default()
    }

    /// Number of non-air voxels.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl TerrainOracle for VoxelMap {
    fn query(&self, voxel: Voxel) -> VoxelInfo {
        self.get(voxel).info()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_voxel_map() {
        let mut map = VoxelMap::flat(-2, 2, -2, 2, 63);
        assert_eq!(map.len(), 25);
        assert!(map.query(Voxel::new(0, 63, 0)).is_solid);
        assert!(!map.query(Voxel::new(0, 64, 0)).is_solid);
        assert!(!map.query(Voxel::new(3, 63, 0)).is_solid);

        map.set(Voxel::new(1, 63, 1), Block::Water);
        let info = map.query(Voxel::new(1, 63, 1));
        assert!(info.is_water && !info.is_solid);

        map.set(Voxel::new(1, 64, 1), Block::Lava);
        assert!(map.query(Voxel::new(1, 64, 1)).is_hazard());

        map.set(Voxel::new(1, 64, 1), Block::Air);
        assert_eq!(map.get(Voxel::new(1, 64, 1)), Block::Air);
        assert_eq!(map.len(), 25);
    }
}
