//! # Common geometry types
//!
//! All poses and points carry the coordinate frame they are expressed in, in
//! the style of a stamped message. Positions are in meters, angles in radians
//! and timestamps in seconds since an arbitrary epoch (normally the session
//! epoch).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Coordinate frames known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    /// The fixed world frame the paths are planned in.
    Map,

    /// The frame at the centre of the robot's base, projected to the ground.
    BaseFootprint,

    /// The frame of the robot's wrist (the leash attachment point).
    WristRoll,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position and orientation in a given frame at a given time.
///
/// Immutable value type, a new instance is produced for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedPose {
    /// The position in `frame`
    pub position_m: Point3<f64>,

    /// The orientation in `frame`
    pub orientation_q: UnitQuaternion<f64>,

    /// The frame this pose is expressed in
    pub frame: Frame,

    /// The time this pose is valid at
    pub stamp_s: f64,
}

/// A velocity command for the robot's base.
///
/// Transient, recomputed every control cycle and never retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityCmd {
    /// Forward velocity demand
    pub linear_x_ms: f64,

    /// Lateral velocity demand (positive to the left)
    pub linear_y_ms: f64,

    /// Yaw rate demand about the base Z+ axis
    pub angular_z_rads: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TimedPose {
    /// Create a new pose on the ground plane (z = 0) with the given yaw.
    pub fn new_ground(x_m: f64, y_m: f64, yaw_rad: f64, frame: Frame, stamp_s: f64) -> Self {
        Self {
            position_m: Point3::new(x_m, y_m, 0.0),
            orientation_q: quat_from_yaw(yaw_rad),
            frame,
            stamp_s,
        }
    }

    /// Get the heading (yaw angle about Z+) of this pose.
    pub fn heading_rad(&self) -> f64 {
        yaw_from_quat(&self.orientation_q)
    }
}

impl VelocityCmd {
    /// A command which brings the base to a full stop.
    pub fn zero() -> Self {
        Self::default()
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a quaternion representing a rotation of `yaw_rad` about the Z+ axis.
pub fn quat_from_yaw(yaw_rad: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw_rad)
}

/// Extract the yaw angle about Z+ from a quaternion.
pub fn yaw_from_quat(q: &UnitQuaternion<f64>) -> f64 {
    q.euler_angles().2
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_yaw_round_trip() {
        for &yaw in [0.0, 0.5, -0.5, PI / 2.0, -PI / 2.0].iter() {
            let q = quat_from_yaw(yaw);
            assert!((yaw_from_quat(&q) - yaw).abs() < 1e-12);
        }
    }

    #[test]
    fn test_ground_pose() {
        let pose = TimedPose::new_ground(1.0, 2.0, 0.25, Frame::Map, 10.0);
        assert_eq!(pose.position_m.z, 0.0);
        assert!((pose.heading_rad() - 0.25).abs() < 1e-12);
        assert_eq!(pose.frame, Frame::Map);
    }
}
