//! # Voxel navigation library.
//!
//! Plans routes for autonomous agents through a voxel world and drives them along those routes
//! against a movement actuator, recovering when an agent stalls.
//!
//! Data flows executor -> planner -> (terrain oracle, obstacle memory, path cache) -> executor ->
//! actuator, with the actuator's position feedback closing the loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Integer voxel coordinates
pub mod voxel;

/// Terrain oracle interface and an in-memory voxel map implementing it
pub mod terrain;

/// A* path planner with obstacle memory and path cache
pub mod planner;

/// Per-agent path executor and the movement actuator interface it drives
pub mod executor;

/// Simulated movement actuator over a voxel map
pub mod sim;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use executor::{ExecError, ExecState, ExecutorParams, MovementActuator, PathExecutor};
pub use planner::{
    MoveAction, PathPlanner, PathPlannerParams, PathPlannerParamsUpdate, PathResult, PlanError,
};
pub use terrain::{Block, TerrainOracle, VoxelInfo, VoxelMap};
pub use voxel::Voxel;
