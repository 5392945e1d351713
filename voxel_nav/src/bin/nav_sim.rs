//! # Navigation Simulation
//!
//! Runs a single simulated agent through a small demo world, so that the planner and executor can
//! be developed and watched without a game server.
//!
//! Usage: `nav_sim [X Y Z]`, where the optional arguments are the destination.
//!
//! The world is a flat floor with a one block high wall to jump, a pool of water to swim through
//! and a patch of lava to keep away from.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{env, sync::Arc, time::Duration};

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, warn};
use nalgebra::Point3;
use util::logger::{logger_init, LevelFilter};
use voxel_nav::{
    sim::SimActuator, Block, ExecError, ExecutorParams, PathExecutor, PathPlanner,
    PathPlannerParams, Voxel, VoxelMap,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Height of the top of the floor, agents stand at this height plus one.
const FLOOR_Y: i32 = 63;

const DEFAULT_DESTINATION: [f64; 3] = [25.5, 64.0, 0.5];

/// Period between progress reports.
const REPORT_PERIOD: Duration = Duration::from_secs(1);

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    logger_init(LevelFilter::Debug, None).wrap_err("Failed to initialise logging")?;

    info!("Navigation Simulation\n");

    let destination = parse_destination().wrap_err("Invalid destination")?;

    // ---- WORLD ----

    let world = Arc::new(demo_world());
    info!("Demo world built with {} blocks", world.len());

    let actuator = Arc::new(
        SimActuator::new(world.clone(), Voxel::new(0, FLOOR_Y + 1, 0))
            .with_move_duration(Duration::from_millis(200)),
    );

    // ---- EXECUTOR ----

    let executor = match PathExecutor::load(world.clone(), actuator.clone()) {
        Ok(e) => e,
        Err(ExecError::ParamLoadError(e)) => {
            warn!("Couldn't load parameters ({}), using defaults", e);
            PathExecutor::new(
                ExecutorParams::default(),
                PathPlanner::new(PathPlannerParams::default(), world.clone()),
                actuator.clone(),
            )
        }
        Err(e) => return Err(e).wrap_err("Failed to initialise the executor"),
    };

    info!("Executor initialised, navigating to {}", destination);

    // ---- RUN ----

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .wrap_err("Failed to build the runtime")?;

    let result = runtime.block_on(async {
        let mut report = tokio::time::interval(REPORT_PERIOD);

        let navigation = executor.navigate_to(destination);
        tokio::pin!(navigation);

        loop {
            tokio::select! {
                r = &mut navigation => break r,
                _ = report.tick() => info!(
                    "{:?}: {:.0} % complete, agent at {}",
                    executor.state(),
                    executor.progress(),
                    actuator.voxel()
                ),
            }
        }
    });

    // ---- SUMMARY ----

    let record = actuator.record();
    info!("Navigation finished in state {:?}", executor.state());
    info!("    Final voxel: {}", actuator.voxel());
    info!("    Replans: {}", executor.replan_count());
    info!(
        "    Moves: {} ({} failed)",
        record.moves.len(),
        record.moves.iter().filter(|(_, ok)| !ok).count()
    );
    info!("    Jumps: {}", record.jumps);

    result.wrap_err("Navigation failed")
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn parse_destination() -> Result<Point3<f64>> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.len() {
        0 => Ok(Point3::new(
            DEFAULT_DESTINATION[0],
            DEFAULT_DESTINATION[1],
            DEFAULT_DESTINATION[2],
        )),
        3 => {
            let mut coords = [0f64; 3];
            for (c, a) in coords.iter_mut().zip(args.iter()) {
                *c = a
                    .parse()
                    .wrap_err_with(|| format!("\"{}\" is not a number", a))?;
            }
            Ok(Point3::new(coords[0], coords[1], coords[2]))
        }
        n => Err(eyre!("Expected 0 or 3 arguments, found {}", n)),
    }
}

/// Build the demo world.
fn demo_world() -> VoxelMap {
    let mut world = VoxelMap::flat(-10, 30, -10, 10, FLOOR_Y);

    // Wall across the whole floor
    world.fill(
        Voxel::new(8, FLOOR_Y + 1, -10),
        Voxel::new(8, FLOOR_Y + 1, 10),
        Block::Solid,
    );

    // Pool which is cheaper to swim through than to walk around
    world.fill(
        Voxel::new(16, FLOOR_Y, -8),
        Voxel::new(19, FLOOR_Y, 8),
        Block::Water,
    );

    // Lava to the side of the direct route
    world.fill(
        Voxel::new(2, FLOOR_Y, 3),
        Voxel::new(6, FLOOR_Y, 5),
        Block::Lava,
    );

    world
}
