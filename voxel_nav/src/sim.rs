//! # Simulated Actuator
//!
//! A [`MovementActuator`] which moves an agent around a [`VoxelMap`] by teleporting it between
//! voxels. A move only succeeds if it is one the planner itself could have produced from the
//! agent's current voxel, so routes planned against the same map can be followed exactly.
//!
//! Used by the `nav_sim` binary and the integration tests.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::trace;
use nalgebra::Point3;

use crate::{
    executor::MovementActuator,
    planner::{MoveGen, PathPlannerParams},
    terrain::VoxelMap,
    voxel::Voxel,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimActuator {
    world: Arc<VoxelMap>,

    /// What the simulated agent is physically capable of
    physics: PathPlannerParams,

    /// Time each move takes
    move_duration: Duration,

    state: Mutex<SimRecord>,
}

/// Everything the simulated agent has done.
#[derive(Debug, Clone, PartialEq)]
pub struct SimRecord {
    pub position: Point3<f64>,

    /// Voxels the agent can't enter, unknown to the map
    pub blocked: HashSet<Voxel>,

    pub jumps: usize,
    pub sprinting: bool,

    /// Every sprint request, in order
    pub sprint_requests: Vec<bool>,

    /// Every voxel looked at, in order
    pub looked_at: Vec<Voxel>,

    /// Every attempted move and whether it succeeded
    pub moves: Vec<(Voxel, bool)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimActuator {
    /// Create a new simulated agent standing in the given voxel.
    pub fn new(world: Arc<VoxelMap>, start: Voxel) -> Self {
        let physics = PathPlannerParams {
            avoid_danger: false,
            ..Default::default()
        };

        Self {
            world,
            physics,
            move_duration: Duration::from_millis(250),
            state: Mutex::new(SimRecord {
                position: start.centre(),
                blocked: HashSet::new(),
                jumps: 0,
                sprinting: false,
                sprint_requests: Vec::new(),
                looked_at: Vec::new(),
                moves: Vec::new(),
            }),
        }
    }

    /// Set how long each move takes.
    pub fn with_move_duration(mut self, move_duration: Duration) -> Self {
        self.move_duration = move_duration;
        self
    }

    /// Set the physical capabilities of the agent.
    pub fn with_physics(mut self, physics: PathPlannerParams) -> Self {
        self.physics = physics;
        self
    }

    /// Add a blockage the map doesn't know about.
    pub fn block(&self, voxel: Voxel) {
        self.lock().blocked.insert(voxel);
    }

    pub fn unblock(&self, voxel: Voxel) {
        self.lock().blocked.remove(&voxel);
    }

    /// Place the agent in a voxel.
    pub fn teleport(&self, voxel: Voxel) {
        self.lock().position = voxel.centre();
    }

    pub fn voxel(&self) -> Voxel {
        Voxel::floor(&self.lock().position)
    }

    /// A snapshot of what the agent has done so far.
    pub fn record(&self) -> SimRecord {
        self.lock().clone()
    }

    fn can_move(&self, from: Voxel, to: Voxel) -> bool {
        let mut moves = Vec::new();
        MoveGen::new(self.world.as_ref(), &self.physics).neighbours(from, &mut moves);
        moves.iter().any(|m| m.to == to)
    }

    fn lock(&self) -> MutexGuard<'_, SimRecord> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MovementActuator for SimActuator {
    async fn move_toward(&self, target: Voxel) -> bool {
        tokio::time::sleep(self.move_duration).await;

        let from = self.voxel();
        let ok = !self.lock().blocked.contains(&target) && self.can_move(from, target);

        let mut state = self.lock();
        if ok {
            state.position = target.centre();
        }
        state.moves.push((target, ok));

        trace!("Sim move {} -> {}: {}", from, target, if ok { "ok" } else { "failed" });

        ok
    }

    fn jump(&self) {
        self.lock().jumps += 1;
    }

    fn set_sprint(&self, enabled: bool) {
        let mut state = self.lock();
        state.sprinting = enabled;
        state.sprint_requests.push(enabled);
    }

    fn look_at(&self, target: Voxel) {
        self.lock().looked_at.push(target);
    }

    fn current_position(&self) -> Point3<f64> {
        self.lock().position
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::terrain::Block;

    #[tokio::test(start_paused = true)]
    async fn test_sim_moves() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.set(Voxel::new(2, 64, 0), Block::Solid);
        let sim = SimActuator::new(Arc::new(map), Voxel::new(0, 64, 0));

        // Adjacent walk
        assert!(sim.move_toward(Voxel::new(1, 64, 0)).await);
        assert_eq!(sim.voxel(), Voxel::new(1, 64, 0));

        // Into a wall
        assert!(!sim.move_toward(Voxel::new(2, 64, 0)).await);

        // Onto the wall
        assert!(sim.move_toward(Voxel::new(2, 65, 0)).await);

        // Not adjacent
        assert!(!sim.move_toward(Voxel::new(5, 64, 5)).await);

        // Blocked without the map knowing
        sim.block(Voxel::new(3, 64, 0));
        assert!(!sim.move_toward(Voxel::new(3, 64, 0)).await);
        sim.unblock(Voxel::new(3, 64, 0));
        assert!(sim.move_toward(Voxel::new(3, 64, 0)).await);

        let record = sim.record();
        assert_eq!(record.moves.len(), 6);
        assert_eq!(record.moves.iter().filter(|(_, ok)| *ok).count(), 3);
        assert_eq!(record.position, Point3::new(3.5, 64.0, 0.5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sim_physics() {
        let mut map = VoxelMap::flat(-5, 5, -5, 5, 63);
        map.set(Voxel::new(2, 64, 0), Block::Solid);
        let physics = PathPlannerParams {
            allow_jump: false,
            ..Default::default()
        };
        let sim = SimActuator::new(Arc::new(map), Voxel::new(0, 64, 0)).with_physics(physics);

        sim.teleport(Voxel::new(1, 64, 0));
        assert_eq!(sim.current_position(), Point3::new(1.5, 64.0, 0.5));

        // Can't get onto the wall without jumping
        assert!(!sim.move_toward(Voxel::new(2, 65, 0)).await);
        assert_eq!(sim.voxel(), Voxel::new(1, 64, 0));
    }
}
