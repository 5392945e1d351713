//! # Path Planner
//!
//! Plans routes through the voxel world using an A* search over voxels queried from a
//! [`TerrainOracle`].
//!
//! Each planner belongs to a single agent and owns that agent's [`ObstacleMemory`] and
//! [`PathCache`], so agents never see each other's learned obstacles.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::{BinaryHeap, HashMap, HashSet},
    fmt,
    sync::Arc,
};

use log::{debug, trace};
use nalgebra::Point3;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{terrain::TerrainOracle, voxel::Voxel};

use self::{
    moves::heuristic,
    search::{Node, OpenEntry},
};

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod moves;
pub mod obstacle_memory;
pub mod params;
pub mod path_cache;
pub mod search;

pub use moves::{Move, HORIZONTAL_DIRECTIONS};
pub(crate) use moves::MoveGen;
pub use obstacle_memory::ObstacleMemory;
pub use params::{PathPlannerParams, PathPlannerParamsUpdate};
pub use path_cache::{CacheKey, PathCache};
pub use search::SearchTree;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PathPlanner {
    params: PathPlannerParams,

    oracle: Arc<dyn TerrainOracle>,

    obstacles: ObstacleMemory,

    cache: PathCache,
}

/// A successfully planned route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathResult {
    /// Waypoints from the start to the final voxel, inclusive.
    pub positions: Vec<Voxel>,

    /// The action used to move into each waypoint after the first, one fewer than `positions`.
    pub actions: Vec<MoveAction>,

    /// Straight line distance between the start and the goal.
    pub cost: f64,

    /// Summed length of every segment of the route.
    pub total_length_m: f64,

    /// Estimated time to walk the route.
    pub estimated_time_s: f64,

    /// Number of nodes expanded by the search which found this route.
    pub nodes_expanded: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The way the agent moves into a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Walk,
    Jump,
    Swim,
    Climb,
    Fall,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// The goal is further than `max_distance_m` from the start, no search was performed.
    #[error("Goal is too far away")]
    TooFar { distance_m: f64, max_distance_m: f64 },

    /// The search ran out of iterations with nodes still left to expand.
    #[error("Max iterations reached")]
    IterationLimitExceeded { iterations: usize },

    /// Every reachable voxel was expanded without reaching the goal.
    #[error("No path exists")]
    NoPathExists { nodes_expanded: usize },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathPlanner {
    pub fn new(params: PathPlannerParams, oracle: Arc<dyn TerrainOracle>) -> Self {
        Self {
            params,
            oracle,
            obstacles: ObstacleMemory::new(),
            cache: PathCache::new(),
        }
    }

    pub fn params(&self) -> &PathPlannerParams {
        &self.params
    }

    /// Replace the parameters wholesale.
    pub fn set_params(&mut self, params: PathPlannerParams) {
        self.params = params;
    }

    /// Apply a partial set of parameters, leaving the rest unchanged.
    pub fn update_params(&mut self, update: &PathPlannerParamsUpdate) {
        self.params.apply(update);
        debug!("Planner parameters updated: {:?}", self.params);
    }

    /// Remember the voxel as unreachable, searches will not pass through it.
    pub fn mark_obstacle(&mut self, voxel: Voxel) {
        debug!("Marking obstacle at {}", voxel);
        self.obstacles.mark(voxel);
    }

    /// Forget a previously marked obstacle.
    pub fn clear_obstacle(&mut self, voxel: Voxel) {
        self.obstacles.clear(voxel);
    }

    pub fn obstacles(&self) -> &ObstacleMemory {
        &self.obstacles
    }

    pub fn cache(&self) -> &PathCache {
        &self.cache
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Plan a route from `start` to `goal`.
    ///
    /// Both positions are floored to voxels before searching. The search succeeds once it
    /// expands a voxel within one voxel of the goal on every axis, so the last waypoint may not
    /// be the goal itself.
    pub fn find_path(
        &mut self,
        start: &Point3<f64>,
        goal: &Point3<f64>,
    ) -> Result<PathResult, PlanError> {
        let key = CacheKey::new(start, goal);
        if let Some(entry) = self.cache.lookup(&key) {
            if self.cache.is_fresh(entry) {
                return Ok(entry.clone());
            }
            trace!("Cached path {} -> {} is stale, searching again", key.start, key.goal);
        }

        let start_v = Voxel::floor(start);
        let goal_v = Voxel::floor(goal);

        let (tree, result) = self.search(start_v, goal_v);

        let (end_idx, nodes_expanded) = match result {
            Ok(r) => r,
            Err(e) => {
                debug!("No path from {} to {}: {} ({} nodes)", start_v, goal_v, e, tree.len());
                return Err(e);
            }
        };

        let (positions, actions) = tree.reconstruct(end_idx);

        let total_length_m: f64 = positions.windows(2).map(|w| w[0].distance(w[1])).sum();

        let path = PathResult {
            cost: start_v.distance(goal_v),
            total_length_m,
            estimated_time_s: total_length_m / self.params.walk_speed_m_s.max(f64::EPSILON),
            nodes_expanded,
            positions,
            actions,
        };

        debug!(
            "Path found from {} to {}: {} steps, {:.2} m, {} nodes expanded",
            start_v,
            goal_v,
            path.steps(),
            path.total_length_m,
            nodes_expanded
        );

        self.cache.store(key, path.clone());

        Ok(path)
    }

    /// Run the A* search, returning the search tree along with either the index of the node which
    /// reached the goal and the number of expanded nodes, or the reason the search failed.
    pub fn search(
        &self,
        start: Voxel,
        goal: Voxel,
    ) -> (SearchTree, Result<(usize, usize), PlanError>) {
        let mut tree = SearchTree::new();

        let distance_m = start.distance(goal);
        if distance_m > self.params.max_distance_m {
            return (
                tree,
                Err(PlanError::TooFar {
                    distance_m,
                    max_distance_m: self.params.max_distance_m,
                }),
            );
        }

        let move_gen = MoveGen::new(self.oracle.as_ref(), &self.params);

        let mut heap = BinaryHeap::new();
        let mut open: HashMap<Voxel, usize> = HashMap::new();
        let mut closed: HashSet<Voxel> = HashSet::new();
        let mut seq = 0u64;
        let mut iterations = 0usize;
        let mut moves = Vec::with_capacity(16);

        let start_idx = tree.push(Node::new(start, 0.0, heuristic(start, goal), None, None));
        heap.push(OpenEntry {
            f: OrderedFloat(tree.node(start_idx).f),
            seq,
            node: start_idx,
        });
        open.insert(start, start_idx);

        loop {
            if iterations >= self.params.max_iterations {
                return if open.is_empty() {
                    (tree, Err(PlanError::NoPathExists { nodes_expanded: iterations }))
                } else {
                    (tree, Err(PlanError::IterationLimitExceeded { iterations }))
                };
            }

            // Get the minimum score node, skipping outdated entries
            let current_idx = loop {
                match heap.pop() {
                    Some(e) => {
                        let node = tree.node(e.node);
                        if closed.contains(&node.position) || OrderedFloat(node.f) != e.f {
                            continue;
                        }
                        break Some(e.node);
                    }
                    None => break None,
                }
            };
            let current_idx = match current_idx {
                Some(i) => i,
                None => {
                    return (tree, Err(PlanError::NoPathExists { nodes_expanded: iterations }))
                }
            };

            iterations += 1;

            let (current, current_g) = {
                let node = tree.node(current_idx);
                (node.position, node.g)
            };
            open.remove(&current);
            closed.insert(current);

            if current.chebyshev_distance(goal) <= 1 {
                return (tree, Ok((current_idx, iterations)));
            }

            moves.clear();
            move_gen.neighbours(current, &mut moves);

            for mv in moves.iter() {
                if closed.contains(&mv.to) || self.obstacles.contains(&mv.to) {
                    continue;
                }

                let tentative_g = current_g + move_gen.cost(current, mv.to, mv.action);

                match open.get(&mv.to).copied() {
                    None => {
                        let idx = tree.push(Node::new(
                            mv.to,
                            tentative_g,
                            heuristic(mv.to, goal),
                            Some(current_idx),
                            Some(mv.action),
                        ));
                        open.insert(mv.to, idx);
                        seq += 1;
                        heap.push(OpenEntry {
                            f: OrderedFloat(tree.node(idx).f),
                            seq,
                            node: idx,
                        });
                    }
                    Some(idx) => {
                        if tentative_g < tree.node(idx).g {
                            tree.node_mut(idx).reparent(tentative_g, current_idx, mv.action);
                            seq += 1;
                            heap.push(OpenEntry {
                                f: OrderedFloat(tree.node(idx).f),
                                seq,
                                node: idx,
                            });
                        }
                    }
                }
            }

            trace!(
                "Expanded {} (g = {:.2}), {} open",
                current,
                current_g,
                open.len()
            );
        }
    }
}

impl fmt::Debug for PathPlanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathPlanner")
            .field("params", &self.params)
            .field("obstacles", &self.obstacles.len())
            .field("cached_paths", &self.cache.len())
            .finish()
    }
}

impl PathResult {
    /// Number of moves in the route.
    pub fn steps(&self) -> usize {
        self.actions.len()
    }

    /// True for any route produced by a search, failed searches are reported as a [`PlanError`].
    pub fn success(&self) -> bool {
        !self.positions.is_empty()
    }

    /// The final waypoint.
    pub fn end(&self) -> Option<Voxel> {
        self.positions.last().copied()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::terrain::{Block, VoxelMap};

    fn planner(map: VoxelMap, params: PathPlannerParams) -> PathPlanner {
        PathPlanner::new(params, Arc::new(map))
    }

    fn p(x: i32, y: i32, z: i32) -> Point3<f64> {
        Voxel::new(x, y, z).to_point()
    }

    /// Checks every step of the route is a move the planner could have generated.
    fn assert_valid_moves(path: &PathResult, params: &PathPlannerParams) {
        assert_eq!(path.positions.len(), path.actions.len() + 1);
        for (w, action) in path.positions.windows(2).zip(path.actions.iter()) {
            let (dx, dy, dz) = (w[1].x - w[0].x, w[1].y - w[0].y, w[1].z - w[0].z);
            let horizontal = dx.abs() <= 1 && dz.abs() <= 1 && (dx, dz) != (0, 0);
            match action {
                MoveAction::Walk | MoveAction::Swim => assert!(horizontal && dy == 0),
                MoveAction::Jump => assert!(params.allow_jump && horizontal && dy == 1),
                MoveAction::Fall => {
                    assert!(horizontal && dy < 0 && -dy <= params.max_fall_height)
                }
                MoveAction::Climb => {
                    assert!(params.allow_climb && dx == 0 && dz == 0 && dy.abs() == 1)
                }
            }
        }
    }

    #[test]
    fn test_straight_line() {
        let params = PathPlannerParams::default();
        let mut planner = planner(VoxelMap::flat(-20, 20, -20, 20, 63), params.clone());

        let path = planner.find_path(&p(0, 64, 0), &p(10, 64, 0)).unwrap();

        assert!(path.success());
        assert_eq!(path.positions[0], Voxel::new(0, 64, 0));
        // The goal tolerance stops the search one voxel short
        assert_eq!(path.end(), Some(Voxel::new(9, 64, 0)));
        assert!(path.actions.iter().all(|a| *a == MoveAction::Walk));
        assert_eq!(path.cost, 10.0);
        assert_eq!(path.total_length_m, 9.0);
        assert!((path.estimated_time_s - 9.0 / params.walk_speed_m_s).abs() < 1e-9);
        assert_valid_moves(&path, &params);
    }

    #[test]
    fn test_start_next_to_goal() {
        let mut planner = planner(VoxelMap::flat(-5, 5, -5, 5, 63), Default::default());
        let path = planner.find_path(&p(0, 64, 0), &p(1, 64, 1)).unwrap();
        assert_eq!(path.positions, vec![Voxel::new(0, 64, 0)]);
        assert!(path.actions.is_empty());
        assert_eq!(path.nodes_expanded, 1);
    }

    #[test]
    fn test_positions_are_floored() {
        let mut planner = planner(VoxelMap::flat(-5, 5, -5, 5, 63), Default::default());
        let path = planner
            .find_path(&Point3::new(0.9, 64.99, 0.5), &Point3::new(4.2, 64.1, 0.7))
            .unwrap();
        assert_eq!(path.positions[0], Voxel::new(0, 64, 0));
        assert_eq!(path.end(), Some(Voxel::new(3, 64, 0)));
    }

    #[test]
    fn test_too_far() {
        let params = PathPlannerParams {
            max_distance_m: 20.0,
            ..Default::default()
        };
        let mut planner = planner(VoxelMap::flat(-50, 50, -5, 5, 63), params);

        let err = planner.find_path(&p(0, 64, 0), &p(21, 64, 0)).unwrap_err();
        assert_eq!(err.to_string(), "Goal is too far away");

        let (tree, _) = planner.search(Voxel::new(0, 64, 0), Voxel::new(21, 64, 0));
        assert!(tree.is_empty());

        assert!(planner.find_path(&p(0, 64, 0), &p(20, 64, 0)).is_ok());
    }

    #[test]
    fn test_max_iterations() {
        let params = PathPlannerParams {
            max_iterations: 1,
            ..Default::default()
        };
        let mut planner = planner(VoxelMap::flat(-20, 20, -20, 20, 63), params);

        let err = planner.find_path(&p(0, 64, 0), &p(10, 64, 0)).unwrap_err();
        assert_eq!(err, PlanError::IterationLimitExceeded { iterations: 1 });
        assert_eq!(err.to_string(), "Max iterations reached");
    }

    #[test]
    fn test_no_path_when_isolated() {
        // Two platforms with a gap too wide to cross
        let mut map = VoxelMap::flat(-3, 3, -3, 3, 63);
        map.fill(Voxel::new(10, 63, -3), Voxel::new(15, 63, 3), Block::Solid);
        let mut planner = planner(map, Default::default());

        let err = planner.find_path(&p(0, 64, 0), &p(12, 64, 0)).unwrap_err();
        assert_eq!(err, PlanError::NoPathExists { nodes_expanded: 49 });
        assert_eq!(err.to_string(), "No path exists");
    }

    #[test]
    fn test_jumps_single_wall() {
        let mut map = VoxelMap::flat(-5, 10, -5, 5, 63);
        map.fill(Voxel::new(2, 64, -5), Voxel::new(2, 64, 5), Block::Solid);
        let params = PathPlannerParams {
            allow_jump: true,
            max_fall_height: 3,
            ..Default::default()
        };
        let mut planner = planner(map, params.clone());

        let path = planner.find_path(&p(0, 64, 0), &p(5, 64, 0)).unwrap();
        assert!(path.actions.contains(&MoveAction::Jump));
        assert!(path.actions.contains(&MoveAction::Fall));
        assert_valid_moves(&path, &params);

        planner.update_params(&PathPlannerParamsUpdate {
            allow_jump: Some(false),
            ..Default::default()
        });
        assert!(matches!(
            planner.find_path(&p(0, 64, 0), &p(5, 64, 0)),
            Err(PlanError::NoPathExists { .. })
        ));
    }

    #[test]
    fn test_water_goal_without_swimming() {
        let mut map = VoxelMap::flat(-5, 15, -5, 5, 63);
        // A pool two voxels deep around the goal
        map.fill(Voxel::new(7, 62, -3), Voxel::new(13, 64, 3), Block::Water);
        map.fill(Voxel::new(7, 61, -3), Voxel::new(13, 61, 3), Block::Solid);
        let params = PathPlannerParams {
            allow_swim: false,
            ..Default::default()
        };
        let mut planner = planner(map, params);

        let err = planner.find_path(&p(0, 64, 0), &p(10, 64, 0)).unwrap_err();
        assert_eq!(err.to_string(), "No path exists");

        planner.update_params(&PathPlannerParamsUpdate {
            allow_swim: Some(true),
            ..Default::default()
        });
        let path = planner.find_path(&p(0, 64, 0), &p(10, 64, 0)).unwrap();
        assert!(path.end().unwrap().chebyshev_distance(Voxel::new(10, 64, 0)) <= 1);
    }

    #[test]
    fn test_obstacle_mark_and_clear() {
        // A corridor one voxel wide so the only route passes through (3, 64, 0)
        let map = VoxelMap::flat(0, 8, 0, 0, 63);
        let mut planner = planner(map, Default::default());
        let blocked = Voxel::new(3, 64, 0);

        let before = planner.find_path(&p(0, 64, 0), &p(8, 64, 0)).unwrap();
        assert!(before.positions.contains(&blocked));

        planner.mark_obstacle(blocked);
        assert!(matches!(
            planner.find_path(&p(0, 64, 0), &p(8, 64, 0)),
            Err(PlanError::NoPathExists { .. })
        ));

        planner.clear_obstacle(blocked);
        let after = planner.find_path(&p(0, 64, 0), &p(8, 64, 0)).unwrap();
        assert_eq!(before.positions, after.positions);
    }

    #[test]
    fn test_prefers_walking_around_obstacle_marks() {
        let mut planner = planner(VoxelMap::flat(-10, 10, -10, 10, 63), Default::default());
        for z in -3..=3 {
            planner.mark_obstacle(Voxel::new(3, 64, z));
        }

        let path = planner.find_path(&p(0, 64, 0), &p(6, 64, 0)).unwrap();
        assert!(path.positions.iter().all(|v| !planner.obstacles().contains(v)));
        assert_valid_moves(&path, planner.params());
    }

    #[test]
    fn test_cache_populated_but_never_reused() {
        let mut planner = planner(VoxelMap::flat(-60, 60, -60, 60, 63), Default::default());

        for i in 0..110 {
            let goal = p(-50 + i % 100, 64, if i < 100 { 5 } else { -5 });
            planner.find_path(&p(0, 64, 0), &goal).unwrap();
            assert!(planner.cache().len() <= path_cache::PATH_CACHE_CAPACITY);
        }
        assert_eq!(planner.cache().len(), path_cache::PATH_CACHE_CAPACITY);

        // Repeating a search still searches
        let a = planner.find_path(&p(0, 64, 0), &p(5, 64, 5)).unwrap();
        assert!(a.nodes_expanded > 0);

        planner.clear_cache();
        assert!(planner.cache().is_empty());
    }

    #[test]
    fn test_search_tree_serialises() {
        let planner = planner(VoxelMap::flat(-5, 5, -5, 5, 63), Default::default());
        let (tree, result) = planner.search(Voxel::new(0, 64, 0), Voxel::new(3, 64, 0));
        let (end, _) = result.unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let restored: SearchTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), tree.len());
        assert_eq!(restored.reconstruct(end).0, tree.reconstruct(end).0);

        // g never increases walking back up a parent chain
        let mut idx = Some(end);
        let mut last_g = f64::INFINITY;
        while let Some(i) = idx {
            let node = tree.get(i).unwrap();
            assert!(node.g <= last_g);
            assert_eq!(node.f, node.g + node.h);
            last_g = node.g;
            idx = node.parent;
        }
    }
}
