//! # Leash constraint solver
//!
//! Given the dog's position and a goal position ahead of it on the path, this
//! solver places the robot's end-effector and base so the fully extended
//! leash pulls the dog towards the goal.
//!
//! The leash hangs from the end-effector to the dog, so its usable ground
//! projection is the leash length foreshortened by the end-effector's height.
//! The end-effector target sits that projected distance beyond the goal along
//! the dog-to-goal direction, and the base target sits behind it by the base
//! to end-effector ground offset.
//!
//! All inputs and outputs are in the robot's base frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::maths::square;

use walk_if::geom::Frame;

use crate::clients::MarkerSink;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Leash solver parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeashCtrlParams {
    /// The fixed length of the leash
    pub leash_length_m: f64,

    /// Nominal end-effector height, used for the startup feasibility check
    pub nominal_arm_height_m: f64,
}

/// The solved target positions, in the base frame.
#[derive(Debug, Clone, Copy)]
pub struct LeashSolution {
    /// Target position of the end-effector
    pub arm_target_m: Point3<f64>,

    /// Target position of the base, on the ground plane
    pub base_target_m: Point3<f64>,
}

/// Telemetry from the last solve.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeashReport {
    /// Ground projection of the taut leash
    pub planar_leash_m: f64,

    /// Distance from the dog to its goal
    pub dog_to_goal_m: f64,

    /// True if the dog was already on its goal and the direction defaulted
    pub degenerate_direction: bool,
}

/// The leash constraint solver.
pub struct LeashCtrl {
    params: LeashCtrlParams,
    marker_sink: Option<Box<dyn MarkerSink>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the leash solver.
#[derive(Debug, Error)]
pub enum LeashCtrlError {
    #[error(
        "Leash length ({leash_m} m) does not reach the ground from the \
        end-effector height ({arm_height_m} m)"
    )]
    LeashShorterThanArm { leash_m: f64, arm_height_m: f64 },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LeashCtrlParams {
    fn default() -> Self {
        Self {
            leash_length_m: 2.0,
            nominal_arm_height_m: 1.0,
        }
    }
}

impl LeashCtrl {
    /// Initialise the solver, checking the leash is feasible.
    ///
    /// A leash shorter than the nominal end-effector height could never be
    /// taut with the dog on the ground, so it is rejected up front rather
    /// than at the first solve.
    pub fn init(params: LeashCtrlParams) -> Result<Self, LeashCtrlError> {
        if params.leash_length_m < params.nominal_arm_height_m {
            return Err(LeashCtrlError::LeashShorterThanArm {
                leash_m: params.leash_length_m,
                arm_height_m: params.nominal_arm_height_m,
            });
        }

        Ok(Self {
            params,
            marker_sink: None,
        })
    }

    /// Attach a sink for the solver's visualisation markers.
    pub fn set_marker_sink(&mut self, sink: Box<dyn MarkerSink>) {
        self.marker_sink = Some(sink);
    }

    /// Solve for the end-effector and base targets.
    ///
    /// `dog_position_m` and `goal_m` are ground points and `hand_m` is the
    /// current end-effector position, all in the base frame.
    pub fn solve(
        &self,
        dog_position_m: &Point3<f64>,
        goal_m: &Point3<f64>,
        hand_m: &Point3<f64>,
    ) -> Result<(LeashSolution, LeashReport), LeashCtrlError> {
        let arm_height_m = hand_m.z;
        if self.params.leash_length_m < arm_height_m {
            return Err(LeashCtrlError::LeashShorterThanArm {
                leash_m: self.params.leash_length_m,
                arm_height_m,
            });
        }

        let mut report = LeashReport::default();

        // Ground projection of the taut leash
        report.planar_leash_m =
            (square(self.params.leash_length_m) - square(arm_height_m)).sqrt();

        // Unit direction from the dog towards its goal
        let mut ux = goal_m.x - dog_position_m.x;
        let mut uy = goal_m.y - dog_position_m.y;
        report.dog_to_goal_m = (square(ux) + square(uy)).sqrt();

        if report.dog_to_goal_m > f64::MIN_POSITIVE {
            ux /= report.dog_to_goal_m;
            uy /= report.dog_to_goal_m;
        } else {
            // Dog already on its goal, no direction to pull in
            warn!("Dog is on its goal, holding the current leash direction");
            report.degenerate_direction = true;
            ux = 0.0;
            uy = 0.0;
        }

        // Hand goes the planar leash length past the goal, so the taut leash
        // lands the dog on the goal
        let reach_m = report.planar_leash_m + report.dog_to_goal_m;
        let arm_target_m = Point3::new(
            dog_position_m.x + reach_m * ux,
            dog_position_m.y + reach_m * uy,
            arm_height_m,
        );

        if let Some(sink) = &self.marker_sink {
            sink.publish_point(
                "leash_arm_target",
                &Point3::new(arm_target_m.x, arm_target_m.y, 0.0),
                Frame::BaseFootprint,
            );
        }

        // Base keeps its current ground offset to the hand
        let base_to_hand_m = (square(hand_m.x) + square(hand_m.y)).sqrt();
        let base_target_m = Point3::new(
            arm_target_m.x - ux * base_to_hand_m,
            arm_target_m.y - uy * base_to_hand_m,
            0.0,
        );

        debug!(
            "Leash solve: planar = {:.3} m, arm target = ({:.3}, {:.3}), base target = ({:.3}, {:.3})",
            report.planar_leash_m,
            arm_target_m.x,
            arm_target_m.y,
            base_target_m.x,
            base_target_m.y
        );

        Ok((
            LeashSolution {
                arm_target_m,
                base_target_m,
            },
            report,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_planar_leash_projection() {
        let ctrl = LeashCtrl::init(LeashCtrlParams::default()).unwrap();

        // Dog at the origin, goal 5 m ahead on +X, hand 1 m up
        let dog = Point3::new(0.0, 0.0, 0.1);
        let goal = Point3::new(5.0, 0.0, 0.0);
        let hand = Point3::new(0.6, 0.0, 1.0);

        let (solution, report) = ctrl.solve(&dog, &goal, &hand).unwrap();

        // Leash 2 m at height 1 m projects to sqrt(3) on the ground
        let sqrt3 = 3.0_f64.sqrt();
        assert!((report.planar_leash_m - sqrt3).abs() < 1e-12);

        assert!((solution.arm_target_m.x - (sqrt3 + 5.0)).abs() < 1e-12);
        assert!(solution.arm_target_m.y.abs() < 1e-12);
        assert!((solution.arm_target_m.z - 1.0).abs() < 1e-12);

        // Base sits the base-to-hand ground offset behind the hand target
        assert!((solution.base_target_m.x - (sqrt3 + 5.0 - 0.6)).abs() < 1e-12);
        assert!(solution.base_target_m.z.abs() < 1e-12);
    }

    #[test]
    fn test_direction_follows_goal() {
        let ctrl = LeashCtrl::init(LeashCtrlParams::default()).unwrap();

        let dog = Point3::new(1.0, 1.0, 0.1);
        let goal = Point3::new(1.0, 4.0, 0.0);
        let hand = Point3::new(0.0, 0.0, 1.0);

        let (solution, report) = ctrl.solve(&dog, &goal, &hand).unwrap();

        assert!(!report.degenerate_direction);
        assert!((report.dog_to_goal_m - 3.0).abs() < 1e-12);

        // Pull direction is +Y so the targets stay on the dog's X
        assert!((solution.arm_target_m.x - 1.0).abs() < 1e-12);
        assert!(solution.arm_target_m.y > goal.y);
    }

    #[test]
    fn test_degenerate_direction() {
        let ctrl = LeashCtrl::init(LeashCtrlParams::default()).unwrap();

        let dog = Point3::new(2.0, 3.0, 0.1);
        let goal = Point3::new(2.0, 3.0, 0.0);
        let hand = Point3::new(0.6, 0.0, 1.0);

        let (solution, report) = ctrl.solve(&dog, &goal, &hand).unwrap();

        assert!(report.degenerate_direction);
        // With no direction the hand target collapses onto the dog
        assert!((solution.arm_target_m.x - 2.0).abs() < 1e-12);
        assert!((solution.arm_target_m.y - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_leash_shorter_than_arm_rejected_at_init() {
        let result = LeashCtrl::init(LeashCtrlParams {
            leash_length_m: 0.5,
            nominal_arm_height_m: 1.0,
        });
        assert!(matches!(
            result,
            Err(LeashCtrlError::LeashShorterThanArm { .. })
        ));
    }

    #[test]
    fn test_leash_shorter_than_arm_rejected_at_solve() {
        let ctrl = LeashCtrl::init(LeashCtrlParams {
            leash_length_m: 2.0,
            nominal_arm_height_m: 1.0,
        })
        .unwrap();

        // Hand raised above the leash length at solve time
        let result = ctrl.solve(
            &Point3::new(0.0, 0.0, 0.1),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.6, 0.0, 2.5),
        );
        assert!(matches!(
            result,
            Err(LeashCtrlError::LeashShorterThanArm { .. })
        ));
    }
}
