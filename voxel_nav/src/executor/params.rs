//! Parameters for the path executor

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use std::time::Duration;

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorParams {
    /// Displacement below which a stuck evaluation counts as no progress.
    pub min_movement_m: f64,

    /// Minimum time between two stuck evaluations.
    pub stuck_window_s: f64,

    /// Number of consecutive stuck evaluations which trigger a replan.
    pub max_stuck_count: u32,

    /// Distance from the destination within which a navigation has succeeded.
    pub arrival_tolerance_m: f64,

    /// Sprint while walking if more than this many steps remain.
    pub sprint_min_remaining_steps: usize,

    /// Time to wait after a jump before moving.
    pub jump_settle_s: f64,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for ExecutorParams {
    fn default() -> Self {
        Self {
            min_movement_m: 0.5,
            stuck_window_s: 3.0,
            max_stuck_count: 5,
            arrival_tolerance_m: 2.0,
            sprint_min_remaining_steps: 5,
            jump_settle_s: 0.1,
        }
    }
}

impl ExecutorParams {
    pub fn stuck_window(&self) -> Duration {
        Duration::from_secs_f64(self.stuck_window_s.max(0.0))
    }

    pub fn jump_settle(&self) -> Duration {
        Duration::from_secs_f64(self.jump_settle_s.max(0.0))
    }
}
