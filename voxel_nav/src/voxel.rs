//! # Voxel
//!
//! Integer-aligned coordinates of a unit cell in the world grid. All grid reasoning happens on
//! the floor of real-valued positions.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A voxel coordinate, `y` is up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Voxel {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Voxel {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel containing the given position.
    pub fn floor(position: &Point3<f64>) -> Self {
        Self::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// The voxel nearest to the given position.
    pub fn round(position: &Point3<f64>) -> Self {
        Self::new(
            position.x.round() as i32,
            position.y.round() as i32,
            position.z.round() as i32,
        )
    }

    /// The position of the voxel's minimum corner.
    pub fn to_point(self) -> Point3<f64> {
        Point3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// The point an agent standing in the voxel occupies, the centre of its footprint.
    pub fn centre(self) -> Point3<f64> {
        Point3::new(self.x as f64 + 0.5, self.y as f64, self.z as f64 + 0.5)
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// Straight line distance between two voxels.
    pub fn distance(self, other: Voxel) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        let dz = (other.z - self.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Largest per-axis difference between two voxels.
    pub fn chebyshev_distance(self, other: Voxel) -> i32 {
        (other.x - self.x)
            .abs()
            .max((other.y - self.y).abs())
            .max((other.z - self.z).abs())
    }
}

impl fmt::Display for Voxel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<[i32; 3]> for Voxel {
    fn from(v: [i32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
