//! # Path Executor
//!
//! Walks an agent along a planned route, one waypoint at a time, through a [`MovementActuator`].
//!
//! When moves keep failing without the agent making progress the executor marks the waypoint it
//! was heading for as an obstacle and replans from wherever the agent actually is. A single failed
//! replan ends the navigation.
//!
//! ```text
//!            navigate_to
//!   Idle ───────────────► Navigating ──── route done, arrived ───► Succeeded
//!    ▲                     │      ▲  └─── route done, not arrived ─► Failed
//!    │ stop                │stuck │replan ok
//!    │                     ▼      │
//!    └──────────────── StuckRecovery ──── replan failed ──────────► Failed
//! ```
//!
//! All state lives behind locks or atomics so that [`PathExecutor::stop`] and the progress
//! accessors can be used while [`PathExecutor::navigate_to`] is suspended. Only one navigation may
//! run at a time on an executor.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, PoisonError, RwLock,
};

use log::{debug, error, info, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use util::params::{load as load_params, LoadError};

use crate::{
    planner::{
        MoveAction, PathPlanner, PathPlannerParams, PathPlannerParamsUpdate, PathResult, PlanError,
    },
    terrain::TerrainOracle,
    voxel::Voxel,
};

use self::stuck::StuckDetector;

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod actuator;
pub mod params;
pub mod stuck;

pub use actuator::MovementActuator;
pub use params::ExecutorParams;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Drives a single agent along planned routes.
pub struct PathExecutor<A> {
    params: ExecutorParams,

    actuator: Arc<A>,

    planner: Mutex<PathPlanner>,

    state: RwLock<ExecState>,
    route: RwLock<Option<ActiveRoute>>,

    /// Set while a navigation is running
    navigating: AtomicBool,

    /// Set by `stop`, checked by the running navigation at each suspension point
    cancel: AtomicBool,

    /// Replans performed by the current (or last) navigation
    replans: AtomicUsize,
}

/// The route currently being followed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRoute {
    pub path: PathResult,

    /// The destination originally requested
    pub destination: Point3<f64>,

    /// Index of the next step to perform, the number of steps already done
    pub step: usize,
}

/// Releases the navigation flag when the navigation ends, however it ends.
struct NavigationGuard<'a>(&'a AtomicBool);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecState {
    /// No navigation has been requested, or the last one was stopped
    Idle,
    /// Following a route
    Navigating,
    /// Marking a blockage and replanning
    StuckRecovery,
    /// The last navigation reached its destination
    Succeeded,
    /// The last navigation failed
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Couldn't load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Sync primitive is poisoned")]
    PoisonError,

    #[error("Cannot start another navigation as a previous navigation hasn't finished")]
    AlreadyNavigating,

    #[error("Planning failed: {0}")]
    Planning(PlanError),

    #[error("Stuck moving to {target} and replanning failed: {source}")]
    StuckUnrecoverable { target: Voxel, source: PlanError },

    #[error("Navigation was stopped")]
    Cancelled,

    #[error("Route finished {distance_m:.2} m from the destination")]
    DestinationNotReached { distance_m: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<A: MovementActuator> PathExecutor<A> {
    pub fn new(params: ExecutorParams, planner: PathPlanner, actuator: Arc<A>) -> Self {
        Self {
            params,
            actuator,
            planner: Mutex::new(planner),
            state: RwLock::new(ExecState::Idle),
            route: RwLock::new(None),
            navigating: AtomicBool::new(false),
            cancel: AtomicBool::new(false),
            replans: AtomicUsize::new(0),
        }
    }

    /// Create a new executor, loading the executor and planner parameters from
    /// `path_executor.toml` and `path_planner.toml`.
    pub fn load(oracle: Arc<dyn TerrainOracle>, actuator: Arc<A>) -> Result<Self, ExecError> {
        let params: ExecutorParams = load_params("path_executor.toml")?;
        let planner_params: PathPlannerParams = load_params("path_planner.toml")?;

        Ok(Self::new(
            params,
            PathPlanner::new(planner_params, oracle),
            actuator,
        ))
    }

    pub fn params(&self) -> &ExecutorParams {
        &self.params
    }

    /// Navigate the agent to the destination.
    ///
    /// Resolves once the route has been followed to its end (successfully or not), planning or
    /// recovery has failed, or [`PathExecutor::stop`] was called.
    pub async fn navigate_to(&self, destination: Point3<f64>) -> Result<(), ExecError> {
        let _guard = NavigationGuard::acquire(&self.navigating)?;
        self.cancel.store(false, Ordering::SeqCst);
        self.replans.store(0, Ordering::SeqCst);

        let start = self.actuator.current_position();
        info!(
            "Navigating from {} to {}",
            Voxel::floor(&start),
            Voxel::floor(&destination)
        );

        let planned = self.planner.lock()?.find_path(&start, &destination);
        let path = match planned {
            Ok(p) => p,
            Err(e) => {
                error!("Couldn't plan a route: {}", e);
                *self.route.write()? = None;
                self.set_state(ExecState::Failed)?;
                return Err(ExecError::Planning(e));
            }
        };

        self.begin_route(path, destination)?;

        let mut stuck = StuckDetector::new(
            start,
            Instant::now(),
            self.params.min_movement_m,
            self.params.stuck_window(),
        );
        let mut step = 0;

        while let Some((target, action, remaining)) = self.step_target(step)? {
            if self.is_cancelled() {
                return Err(ExecError::Cancelled);
            }

            self.actuator.look_at(target);

            if action == MoveAction::Jump {
                self.actuator.jump();
                tokio::time::sleep(self.params.jump_settle()).await;
                if self.is_cancelled() {
                    return Err(ExecError::Cancelled);
                }
            }

            self.actuator.set_sprint(
                action == MoveAction::Walk && remaining > self.params.sprint_min_remaining_steps,
            );

            debug!("Step {}: {:?} to {}", step, action, target);

            let moved = self.actuator.move_toward(target).await;

            if self.is_cancelled() {
                return Err(ExecError::Cancelled);
            }

            if !moved {
                let position = self.actuator.current_position();
                let count = stuck.evaluate(&position, Instant::now());

                debug!("Move to {} failed, stuck count {}", target, count);

                if count >= self.params.max_stuck_count {
                    warn!(
                        "Stuck moving to {}, marking it as an obstacle and replanning",
                        target
                    );
                    self.set_state(ExecState::StuckRecovery)?;
                    self.replans.fetch_add(1, Ordering::SeqCst);

                    let replan = {
                        let mut planner = self.planner.lock()?;
                        planner.mark_obstacle(target);
                        planner.find_path(&position, &destination)
                    };

                    match replan {
                        Ok(path) => {
                            info!("Replanned route with {} steps", path.steps());
                            self.begin_route(path, destination)?;
                            stuck.reset(position, Instant::now());
                            step = 0;
                            continue;
                        }
                        Err(e) => {
                            error!("Couldn't recover from being stuck: {}", e);
                            self.actuator.set_sprint(false);
                            self.set_state(ExecState::Failed)?;
                            return Err(ExecError::StuckUnrecoverable { target, source: e });
                        }
                    }
                }
            }

            step += 1;
            if let Some(route) = self.route.write()?.as_mut() {
                route.step = step;
            }
        }

        self.actuator.set_sprint(false);

        if self.is_cancelled() {
            return Err(ExecError::Cancelled);
        }

        let distance_m = nalgebra::distance(&self.actuator.current_position(), &destination);
        if distance_m <= self.params.arrival_tolerance_m {
            info!("Destination reached");
            self.set_state(ExecState::Succeeded)?;
            Ok(())
        } else {
            warn!("Route finished {:.2} m from the destination", distance_m);
            self.set_state(ExecState::Failed)?;
            Err(ExecError::DestinationNotReached { distance_m })
        }
    }

    /// Stop the current navigation, if any, and return to idle.
    ///
    /// A running `navigate_to` returns [`ExecError::Cancelled`] at its next suspension point.
    pub fn stop(&self) -> Result<(), ExecError> {
        self.cancel.store(true, Ordering::SeqCst);

        *self.route.write()? = None;
        self.actuator.set_sprint(false);
        self.set_state(ExecState::Idle)?;

        info!("Navigation stopped");

        Ok(())
    }

    /// Returns whether or not a navigation is running.
    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ExecState {
        match self.state.read() {
            Ok(s) => *s,
            Err(e) => *e.into_inner(),
        }
    }

    /// Percentage of the current route's steps which have been performed, 0 if idle.
    pub fn progress(&self) -> f64 {
        if self.state() == ExecState::Idle {
            return 0.0;
        }

        match self.route.read() {
            Ok(route) => match route.as_ref() {
                Some(r) if r.path.steps() > 0 => 100.0 * r.step as f64 / r.path.steps() as f64,
                Some(_) => 100.0,
                None => 0.0,
            },
            Err(_) => 0.0,
        }
    }

    /// A copy of the route currently being followed.
    pub fn current_route(&self) -> Option<ActiveRoute> {
        self.route.read().ok().and_then(|r| r.clone())
    }

    /// Number of replans performed by the current or last navigation.
    pub fn replan_count(&self) -> usize {
        self.replans.load(Ordering::SeqCst)
    }

    pub fn mark_obstacle(&self, voxel: Voxel) -> Result<(), ExecError> {
        self.planner.lock()?.mark_obstacle(voxel);
        Ok(())
    }

    pub fn clear_obstacle(&self, voxel: Voxel) -> Result<(), ExecError> {
        self.planner.lock()?.clear_obstacle(voxel);
        Ok(())
    }

    /// Apply a partial update to the planner's parameters.
    pub fn update_options(&self, update: &PathPlannerParamsUpdate) -> Result<(), ExecError> {
        self.planner.lock()?.update_params(update);
        Ok(())
    }

    pub fn planner_params(&self) -> Result<PathPlannerParams, ExecError> {
        Ok(self.planner.lock()?.params().clone())
    }

    pub fn clear_cache(&self) -> Result<(), ExecError> {
        self.planner.lock()?.clear_cache();
        Ok(())
    }

    /// Run a closure with read access to the planner.
    pub fn with_planner<R>(&self, f: impl FnOnce(&PathPlanner) -> R) -> Result<R, ExecError> {
        Ok(f(&*self.planner.lock()?))
    }

    fn begin_route(&self, path: PathResult, destination: Point3<f64>) -> Result<(), ExecError> {
        *self.route.write()? = Some(ActiveRoute {
            path,
            destination,
            step: 0,
        });
        self.set_state(ExecState::Navigating)
    }

    /// Get the target, action and number of remaining steps for the given step of the route.
    ///
    /// Returns `None` if the route is finished or has been cleared.
    fn step_target(&self, step: usize) -> Result<Option<(Voxel, MoveAction, usize)>, ExecError> {
        let route = self.route.read()?;
        Ok(route.as_ref().and_then(|r| {
            let target = *r.path.positions.get(step + 1)?;
            let action = *r.path.actions.get(step)?;
            Some((target, action, r.path.steps() - step))
        }))
    }

    fn set_state(&self, state: ExecState) -> Result<(), ExecError> {
        *self.state.write()? = state;
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

impl<'a> NavigationGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ExecError> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| Self(flag))
            .map_err(|_| ExecError::AlreadyNavigating)
    }
}

impl Drop for NavigationGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl From<LoadError> for ExecError {
    fn from(e: LoadError) -> Self {
        Self::ParamLoadError(e)
    }
}

impl<G> From<PoisonError<G>> for ExecError {
    fn from(_: PoisonError<G>) -> Self {
        Self::PoisonError
    }
}
