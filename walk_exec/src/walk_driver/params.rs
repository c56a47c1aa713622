//! Walk driver parameters.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the walk driver control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkDriverParams {
    /// Period of the control cycle
    pub cycle_period_s: f64,

    /// Maximum forward speed in solo mode
    pub max_linear_speed_ms: f64,

    /// Lateral speed used to sidestep the dog
    pub avoidance_speed_ms: f64,

    /// Half-width (and depth) of the avoidance box ahead of the base
    pub avoidance_threshold_m: f64,

    /// Distance over which the solo speed ramps down to zero at the goal
    pub deceleration_distance_m: f64,

    /// Below this distance to the goal no movement is commanded
    pub distance_threshold_m: f64,

    /// Minimum interval between coordination goals
    pub goal_reissue_interval_s: f64,

    /// Timeout on transform lookups
    pub transform_timeout_s: f64,

    /// Drive the base directly instead of issuing coordination goals
    pub solo_mode: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for WalkDriverParams {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.25,
            max_linear_speed_ms: 2.0,
            avoidance_speed_ms: 0.5,
            avoidance_threshold_m: 1.0,
            deceleration_distance_m: 1.0,
            distance_threshold_m: 0.01,
            goal_reissue_interval_s: 1.0,
            transform_timeout_s: 1.0,
            solo_mode: false,
        }
    }
}
