//! # Client traits
//!
//! The walk driver and the coordination action talk to the outside world (the
//! clock, the transform tree, the dog's simulated state, the path server and
//! the movement actions) exclusively through these traits. The executable
//! wires in the simulation backend, the tests wire in stubs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point3;

use walk_if::action::{GoalHandle, MoveArmGoal, MoveRobotGoal};
use walk_if::geom::{Frame, TimedPose};
use walk_if::services::{ClientError, GetPathRequest, GetPathResponse};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of the current time, in seconds since the session epoch.
pub trait Clock {
    fn now_s(&self) -> f64;
}

/// Transforms points and poses between [`Frame`]s.
///
/// Lookups wait up to `timeout_s` for the transform to become available and
/// fail with a [`ClientError`] rather than blocking beyond that.
pub trait FrameResolver {
    fn transform_point(
        &self,
        target: Frame,
        source: Frame,
        point_m: &Point3<f64>,
        timeout_s: f64,
    ) -> Result<Point3<f64>, ClientError>;

    fn transform_pose(
        &self,
        target: Frame,
        pose: &TimedPose,
        timeout_s: f64,
    ) -> Result<TimedPose, ClientError>;
}

/// Source of the dog's true (simulated) pose.
pub trait ModelStateSource {
    fn dog_state(&self) -> Result<TimedPose, ClientError>;
}

/// Query interface onto the path server.
pub trait PathQuery {
    fn get_path(&self, req: GetPathRequest) -> Result<GetPathResponse, ClientError>;
}

/// Client for the base movement action.
pub trait MoveRobotClient: Send + Sync {
    /// Issue a goal and return immediately with a handle on it.
    fn send_goal(&self, goal: MoveRobotGoal) -> GoalHandle;
}

/// Client for the arm movement action.
pub trait MoveArmClient: Send + Sync {
    /// Issue a goal and return immediately with a handle on it.
    fn send_goal(&self, goal: MoveArmGoal) -> GoalHandle;
}

/// Sink for visualisation markers.
///
/// The solver publishes its intermediate target points through this so a
/// viewer can display them. Implementations may simply log.
pub trait MarkerSink: Send + Sync {
    fn publish_point(&self, ns: &str, position_m: &Point3<f64>, frame: Frame);
}
