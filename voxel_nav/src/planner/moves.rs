//! Neighbour generation, movement cost and heuristic for the voxel A* search.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{MoveAction, PathPlannerParams};
use crate::{terrain::TerrainOracle, voxel::Voxel};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The 4 cardinal then 4 diagonal horizontal directions, as (dx, dz).
pub const HORIZONTAL_DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Weight of vertical distance in the heuristic.
const HEURISTIC_VERTICAL_WEIGHT: f64 = 1.5;

/// Cost added to any move which changes height when flat routes are preferred.
const PREFER_FLAT_COST: f64 = 0.2;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A candidate move out of a voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub to: Voxel,
    pub action: MoveAction,
}

/// Generates the moves possible from a voxel under the given parameters.
pub struct MoveGen<'a> {
    oracle: &'a dyn TerrainOracle,
    params: &'a PathPlannerParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MoveAction {
    /// Extra cost of performing this action on top of the distance moved.
    pub fn surcharge(self) -> f64 {
        match self {
            MoveAction::Walk => 0.0,
            MoveAction::Jump => 0.5,
            MoveAction::Swim => 1.0,
            MoveAction::Climb => 0.3,
            MoveAction::Fall => 0.1,
        }
    }
}

impl<'a> MoveGen<'a> {
    pub fn new(oracle: &'a dyn TerrainOracle, params: &'a PathPlannerParams) -> Self {
        Self { oracle, params }
    }

    /// Push every valid move out of `from` into `out`.
    pub fn neighbours(&self, from: Voxel, out: &mut Vec<Move>) {
        let jump_clearance = self.params.allow_jump
            && !self.oracle.query(from.above()).is_solid
            && !self.oracle.query(from.offset(0, 2, 0)).is_solid;

        for &(dx, dz) in HORIZONTAL_DIRECTIONS.iter() {
            // Walk
            let dest = from.offset(dx, 0, dz);
            if let Some(swim) = self.standable(dest) {
                out.push(Move {
                    to: dest,
                    action: if swim {
                        MoveAction::Swim
                    } else {
                        MoveAction::Walk
                    },
                });
            }

            // Jump
            if jump_clearance {
                let dest = from.offset(dx, 1, dz);
                if self.standable(dest).is_some() {
                    out.push(Move {
                        to: dest,
                        action: MoveAction::Jump,
                    });
                }
            }

            // Fall
            if let Some(dest) = self.fall_destination(from, dx, dz) {
                out.push(Move {
                    to: dest,
                    action: MoveAction::Fall,
                });
            }
        }

        // Climb
        if self.params.allow_climb {
            let here_climbable = self.oracle.query(from).is_climbable;
            for dy in [1, -1] {
                let dest = from.offset(0, dy, 0);
                let info = self.oracle.query(dest);

                if self.params.avoid_danger && info.is_hazard() {
                    continue;
                }

                if info.is_climbable || (here_climbable && !info.is_solid) {
                    out.push(Move {
                        to: dest,
                        action: MoveAction::Climb,
                    });
                }
            }
        }
    }

    /// Returns `Some(is_swimming)` if the agent can stand with its feet in `dest`.
    ///
    /// The ground below must be solid or water, the feet and head voxels must not be solid, and
    /// hazards and water are rejected according to the parameters.
    pub fn standable(&self, dest: Voxel) -> Option<bool> {
        let ground = self.oracle.query(dest.below());
        if !(ground.is_solid || ground.is_water) {
            return None;
        }

        let feet = self.oracle.query(dest);
        if feet.is_solid {
            return None;
        }

        if self.oracle.query(dest.above()).is_solid {
            return None;
        }

        if self.params.avoid_danger && (ground.is_hazard() || feet.is_hazard()) {
            return None;
        }

        let swim = ground.is_water || feet.is_water;
        if swim && !self.params.allow_swim {
            return None;
        }

        Some(swim)
    }

    /// Find the shallowest valid fall in the given direction, stepping off at the current height.
    ///
    /// Every voxel in the column from the current height down to the landing voxel must be
    /// non-solid.
    fn fall_destination(&self, from: Voxel, dx: i32, dz: i32) -> Option<Voxel> {
        if self.params.max_fall_height < 1 || self.oracle.query(from.offset(dx, 0, dz)).is_solid {
            return None;
        }

        for depth in 1..=self.params.max_fall_height {
            let dest = from.offset(dx, -depth, dz);
            if self.oracle.query(dest).is_solid {
                return None;
            }

            if self.standable(dest).is_some() {
                return Some(dest);
            }
        }

        None
    }

    /// The cost of moving between two voxels with the given action.
    pub fn cost(&self, from: Voxel, to: Voxel, action: MoveAction) -> f64 {
        let mut cost = from.distance(to) + action.surcharge();

        if self.params.prefer_flat && from.y != to.y {
            cost += PREFER_FLAT_COST;
        }

        cost
    }
}

/// Estimated cost between a voxel and the goal.
///
/// Vertical distance is weighted above horizontal, which makes this inadmissible: routes are found
/// quickly but are not guaranteed to be the cheapest.
pub fn heuristic(from: Voxel, goal: Voxel) -> f64 {
    (goal.x - from.x).abs() as f64
        + HEURISTIC_VERTICAL_WEIGHT * (goal.y - from.y).abs() as f64
        + (goal.z - from.z).abs() as f64
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::terrain::{Block, VoxelMap};

    fn moves_from(map: &VoxelMap, params: &PathPlannerParams, from: Voxel) -> Vec<Move> {
        let mut out = Vec::new();
        MoveGen::new(map, params).neighbours(from, &mut out);
        out
    }

    #[test]
    fn test_flat_walks() {
        let map = VoxelMap::flat(-5, 5, -5, 5, 63);
        let params = PathPlannerParams::default();
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));

        assert_eq!(moves.len(), 8);
        assert!(moves.iter().all(|m| m.action == MoveAction::Walk && m.to.y == 64));
    }

    #[test]
    fn test_jump_needs_clearance() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.set(Voxel::new(1, 64, 0), Block::Solid);
        let params = PathPlannerParams::default();

        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert!(moves.contains(&Move {
            to: Voxel::new(1, 65, 0),
            action: MoveAction::Jump
        }));

        // Block the space above the agent's head
        map.set(Voxel::new(0, 66, 0), Block::Solid);
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert!(moves.iter().all(|m| m.action != MoveAction::Jump));

        // Jumping disabled
        map.set(Voxel::new(0, 66, 0), Block::Air);
        let params = PathPlannerParams {
            allow_jump: false,
            ..Default::default()
        };
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert!(moves.iter().all(|m| m.action != MoveAction::Jump));
    }

    #[test]
    fn test_fall_uses_shallowest_landing() {
        let mut map = VoxelMap::new();
        map.set(Voxel::new(0, 63, 0), Block::Solid);
        // Landing 3 below the step off point, with a ledge further down that must not be used
        map.set(Voxel::new(1, 60, 0), Block::Solid);
        map.set(Voxel::new(1, 58, 0), Block::Solid);

        let params = PathPlannerParams::default();
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert_eq!(
            moves,
            vec![Move {
                to: Voxel::new(1, 61, 0),
                action: MoveAction::Fall
            }]
        );

        // Too deep for the configured limit
        let params = PathPlannerParams {
            max_fall_height: 2,
            ..Default::default()
        };
        assert!(moves_from(&map, &params, Voxel::new(0, 64, 0)).is_empty());
    }

    #[test]
    fn test_water_needs_swimming() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.set(Voxel::new(1, 63, 0), Block::Water);
        map.set(Voxel::new(1, 64, 0), Block::Water);

        let params = PathPlannerParams::default();
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert!(moves.contains(&Move {
            to: Voxel::new(1, 64, 0),
            action: MoveAction::Swim
        }));

        let params = PathPlannerParams {
            allow_swim: false,
            ..Default::default()
        };
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert!(moves.iter().all(|m| m.to.x != 1 || m.to.z != 0));
    }

    #[test]
    fn test_hazards_avoided() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.set(Voxel::new(1, 63, 0), Block::Lava);
        map.set(Voxel::new(-1, 64, 0), Block::Hazard);

        let params = PathPlannerParams::default();
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert_eq!(moves.len(), 6);

        let params = PathPlannerParams {
            avoid_danger: false,
            ..Default::default()
        };
        // Lava isn't solid ground so it still can't be walked on, the hazard block can
        let moves = moves_from(&map, &params, Voxel::new(0, 64, 0));
        assert_eq!(moves.len(), 7);
    }

    #[test]
    fn test_climb() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.fill(Voxel::new(0, 64, 0), Voxel::new(0, 67, 0), Block::Ladder);

        let params = PathPlannerParams::default();
        let moves = moves_from(&map, &params, Voxel::new(0, 65, 0));
        let climbs: Vec<Voxel> = moves
            .iter()
            .filter(|m| m.action == MoveAction::Climb)
            .map(|m| m.to)
            .collect();
        assert_eq!(climbs, vec![Voxel::new(0, 66, 0), Voxel::new(0, 64, 0)]);

        // The top of the ladder can be left into the air above it
        let moves = moves_from(&map, &params, Voxel::new(0, 67, 0));
        assert!(moves.contains(&Move {
            to: Voxel::new(0, 68, 0),
            action: MoveAction::Climb
        }));

        // Unless it's hazardous and danger is being avoided
        map.set(Voxel::new(0, 68, 0), Block::Hazard);
        let leave_top = Move {
            to: Voxel::new(0, 68, 0),
            action: MoveAction::Climb,
        };
        assert!(!moves_from(&map, &params, Voxel::new(0, 67, 0)).contains(&leave_top));
        let reckless = PathPlannerParams {
            avoid_danger: false,
            ..Default::default()
        };
        assert!(moves_from(&map, &reckless, Voxel::new(0, 67, 0)).contains(&leave_top));

        let params = PathPlannerParams {
            allow_climb: false,
            ..Default::default()
        };
        let moves = moves_from(&map, &params, Voxel::new(0, 65, 0));
        assert!(moves.iter().all(|m| m.action != MoveAction::Climb));
    }

    #[test]
    fn test_cost_and_heuristic() {
        let map = VoxelMap::new();
        let params = PathPlannerParams::default();
        let gen = MoveGen::new(&map, &params);

        let a = Voxel::new(0, 64, 0);
        assert_eq!(gen.cost(a, a.offset(1, 0, 0), MoveAction::Walk), 1.0);
        assert_eq!(gen.cost(a, a.offset(0, 1, 0), MoveAction::Climb), 1.3);
        assert_eq!(gen.cost(a, a.offset(1, 0, 0), MoveAction::Swim), 2.0);

        let params = PathPlannerParams {
            prefer_flat: true,
            ..Default::default()
        };
        let gen = MoveGen::new(&map, &params);
        let jump = gen.cost(a, a.offset(1, 1, 0), MoveAction::Jump);
        assert!((jump - (2f64.sqrt() + 0.7)).abs() < 1e-9);

        assert_eq!(heuristic(a, Voxel::new(3, 66, -4)), 10.0);
    }
}
