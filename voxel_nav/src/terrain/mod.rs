//! # Terrain
//!
//! The planner only sees the world through the [`TerrainOracle`] trait, a synchronous point query
//! which must be cheap and side-effect free since a single search calls it many times.
//!
//! [`VoxelMap`] is an in-memory oracle, used by the simulation harness, tests and benchmarks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::voxel::Voxel;

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod voxel_map;

pub use voxel_map::VoxelMap;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Answers point queries about voxel properties.
pub trait TerrainOracle: Send + Sync {
    /// Get the properties of the given voxel.
    fn query(&self, voxel: Voxel) -> VoxelInfo;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Properties of a single voxel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VoxelInfo {
    pub is_solid: bool,
    pub is_water: bool,
    pub is_lava: bool,

    /// Hazardous for some other reason than lava (fire, cactus, ...)
    pub is_dangerous: bool,

    /// Can be climbed vertically, e.g. ladders and vines
    pub is_climbable: bool,

    /// Occupied height of the voxel, from 0 (empty) to 1 (full).
    pub height: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Kinds of block stored in a [`VoxelMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Air,
    Solid,
    Water,
    Lava,
    /// A non-solid block which hurts when stood in
    Hazard,
    /// A non-solid climbable block
    Ladder,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VoxelInfo {
    /// True if standing in or on this voxel would hurt the agent.
    pub fn is_hazard(&self) -> bool {
        self.is_lava || self.is_dangerous
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::Air
    }
}

impl Block {
    /// The oracle answer for this kind of block.
    pub fn info(self) -> VoxelInfo {
        match self {
            Block::Air => VoxelInfo::default(),
            Block::Solid => VoxelInfo {
                is_solid: true,
                height: 1.0,
                ..Default::default()
            },
            Block::Water => VoxelInfo {
                is_water: true,
                height: 1.0,
                ..Default::default()
            },
            Block::Lava => VoxelInfo {
                is_lava: true,
                height: 1.0,
                ..Default::default()
            },
            Block::Hazard => VoxelInfo {
                is_dangerous: true,
                height: 1.0,
                ..Default::default()
            },
            Block::Ladder => VoxelInfo {
                is_climbable: true,
                ..Default::default()
            },
        }
    }
}
