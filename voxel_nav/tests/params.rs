//! Checks the parameter files shipped in `params/` load and match the built in defaults.

use std::sync::Arc;

use util::{host::SW_ROOT_ENV_VAR, params};
use voxel_nav::{
    sim::SimActuator, ExecutorParams, PathExecutor, PathPlannerParams, Voxel, VoxelMap,
};

fn set_sw_root() {
    std::env::set_var(SW_ROOT_ENV_VAR, concat!(env!("CARGO_MANIFEST_DIR"), "/.."));
}

#[test]
fn test_param_files_match_defaults() {
    set_sw_root();

    let planner: PathPlannerParams = params::load("path_planner.toml").unwrap();
    assert_eq!(planner, PathPlannerParams::default());

    let executor: ExecutorParams = params::load("path_executor.toml").unwrap();
    assert_eq!(executor, ExecutorParams::default());
}

#[test]
fn test_executor_load() {
    set_sw_root();

    let world = Arc::new(VoxelMap::flat(-5, 5, -5, 5, 63));
    let actuator = Arc::new(SimActuator::new(world.clone(), Voxel::new(0, 64, 0)));

    let exec = PathExecutor::load(world, actuator).unwrap();
    assert_eq!(exec.params(), &ExecutorParams::default());
    assert_eq!(exec.planner_params().unwrap(), PathPlannerParams::default());
}
