//! Parameters for the path planner

// -----------------------------------------------------------------------------------------------
// IMPORTS
// -----------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPlannerParams {
    /// Searches whose start and goal are further apart than this are rejected without searching.
    pub max_distance_m: f64,

    /// Maximum number of node expansions in a single search.
    pub max_iterations: usize,

    /// Allow stepping up one voxel.
    pub allow_jump: bool,

    /// Allow moving into water.
    pub allow_swim: bool,

    /// Allow moving vertically on climbable voxels.
    pub allow_climb: bool,

    /// Reject voxels which are lava or otherwise dangerous.
    pub avoid_danger: bool,

    /// Add a cost to every move which changes height.
    pub prefer_flat: bool,

    /// The deepest single fall, in voxels.
    pub max_fall_height: i32,

    /// Speed used to estimate the traversal duration of a path.
    pub walk_speed_m_s: f64,
}

/// A partial parameter set, only the fields which are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathPlannerParamsUpdate {
    pub max_distance_m: Option<f64>,
    pub max_iterations: Option<usize>,
    pub allow_jump: Option<bool>,
    pub allow_swim: Option<bool>,
    pub allow_climb: Option<bool>,
    pub avoid_danger: Option<bool>,
    pub prefer_flat: Option<bool>,
    pub max_fall_height: Option<i32>,
    pub walk_speed_m_s: Option<f64>,
}

// -----------------------------------------------------------------------------------------------
// IMPLS
// -----------------------------------------------------------------------------------------------

impl Default for PathPlannerParams {
    fn default() -> Self {
        Self {
            max_distance_m: 100.0,
            max_iterations: 10_000,
            allow_jump: true,
            allow_swim: true,
            allow_climb: true,
            avoid_danger: true,
            prefer_flat: false,
            max_fall_height: 3,
            walk_speed_m_s: 4.317,
        }
    }
}

impl PathPlannerParams {
    /// Apply a partial update on top of these parameters.
    pub fn apply(&mut self, update: &PathPlannerParamsUpdate) {
        macro_rules! apply_field {
            ($($field:ident),*) => {
                $(
                    if let Some(v) = update.$field {
                        self.$field = v;
                    }
                )*
            };
        }

        apply_field!(
            max_distance_m,
            max_iterations,
            allow_jump,
            allow_swim,
            allow_climb,
            avoid_danger,
            prefer_flat,
            max_fall_height,
            walk_speed_m_s
        );
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply_update() {
        let mut params = PathPlannerParams::default();
        params.apply(&PathPlannerParamsUpdate {
            allow_jump: Some(false),
            max_fall_height: Some(5),
            ..Default::default()
        });

        assert!(!params.allow_jump);
        assert_eq!(params.max_fall_height, 5);
        assert_eq!(params.max_iterations, 10_000);
        assert!(params.allow_swim);
    }

    #[test]
    fn test_partial_deserialise() {
        let params: PathPlannerParams =
            toml::from_str("max_iterations = 50\nprefer_flat = true\n").unwrap();
        assert_eq!(params.max_iterations, 50);
        assert!(params.prefer_flat);
        assert_eq!(params.max_distance_m, 100.0);
    }
}
