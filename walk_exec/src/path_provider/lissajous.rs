//! # Lissajous path provider
//!
//! An analytic closed curve, the default shape for demo walks. Unlike the
//! piecewise linear shapes the parameterisation is directly in time, so the
//! dog's speed varies smoothly along the curve rather than being constant.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use walk_if::geom::{Frame, TimedPose};

use super::{PathParams, PathProvider};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shape parameters for the lissajous curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LissajousParams {
    /// Amplitude along X
    pub amplitude_x_m: f64,

    /// Amplitude along Y
    pub amplitude_y_m: f64,

    /// Phase offset of the X term
    pub delta_rad: f64,

    /// Angular frequency multiplier of the X term
    pub a: f64,

    /// Angular frequency multiplier of the Y term
    pub b: f64,

    /// Seconds of walk time per radian of curve parameter
    pub time_scale_s: f64,
}

/// Lissajous curve provider.
pub struct LissajousPath {
    params: LissajousParams,
    origin_offset_x_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LissajousParams {
    fn default() -> Self {
        Self {
            amplitude_x_m: 5.0,
            amplitude_y_m: 2.5,
            delta_rad: FRAC_PI_2,
            a: 1.0,
            b: 2.0,
            time_scale_s: 50.0,
        }
    }
}

impl LissajousPath {
    pub fn new(params: &PathParams) -> Self {
        Self {
            params: params.lissajous.clone(),
            origin_offset_x_m: params.origin_offset_x_m,
        }
    }
}

impl PathProvider for LissajousPath {
    fn init(&mut self) {
        // Analytic curve, nothing to precompute
    }

    fn pose_at_time(&self, t_s: f64) -> TimedPose {
        let p = &self.params;
        let max = self.maximum_time_s();

        // Clamp into the single traversal of the curve
        let tau = util::maths::clamp(&t_s, &0.0, &max) / p.time_scale_s;

        let x = p.amplitude_x_m * (p.a * tau + p.delta_rad).sin() + self.origin_offset_x_m;
        let y = p.amplitude_y_m * (p.b * tau).sin();

        TimedPose::new_ground(x, y, 0.0, Frame::Map, t_s)
    }

    fn maximum_time_s(&self) -> f64 {
        // One full period of the curve
        2.0 * PI * self.params.time_scale_s
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
