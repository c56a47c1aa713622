//! # Simulation backend
//!
//! A minimal in-process world standing in for the physics simulation: a dog
//! that chases its planned point with a first order lag, and a holonomic base
//! with an attached leash hand.
//!
//! [`SharedSim`] wraps the world in a shared handle and implements all the
//! client traits, so the same object can be wired into the walk driver and
//! the coordination action. The world only advances when the executable calls
//! [`SharedSim::step`], which keeps runs deterministic for a given parameter
//! set.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use util::maths::clamp;

use walk_if::action::{GoalHandle, MoveArmGoal, MoveRobotGoal};
use walk_if::geom::{Frame, TimedPose, VelocityCmd};
use walk_if::services::ClientError;

use crate::clients::{
    Clock, FrameResolver, MarkerSink, ModelStateSource, MoveArmClient, MoveRobotClient,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimWorldParams {
    /// First order gain of the dog chasing its planned point
    pub dog_tracking_gain: f64,

    /// The dog's standing height
    pub dog_height_m: f64,

    /// Hand position in the base frame: forward offset
    pub hand_forward_m: f64,

    /// Hand position in the base frame: height
    pub hand_height_m: f64,

    /// Speed of the base while executing a movement goal
    pub base_speed_ms: f64,

    /// A movement goal completes once the base is within this distance
    pub goal_tolerance_m: f64,
}

/// The simulated world.
pub struct SimWorld {
    params: SimWorldParams,
    time_s: f64,
    dog_position_m: Point3<f64>,
    robot_position_m: Point3<f64>,
    robot_yaw_rad: f64,
    /// In-flight base movement goal: target in the map frame plus its handle
    base_goal: Option<(Point3<f64>, GoalHandle)>,
}

/// Shared, thread-safe handle on the simulated world.
#[derive(Clone)]
pub struct SharedSim(Arc<Mutex<SimWorld>>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimWorldParams {
    fn default() -> Self {
        Self {
            dog_tracking_gain: 1.5,
            dog_height_m: 0.1,
            hand_forward_m: 0.6,
            hand_height_m: 1.0,
            base_speed_ms: 0.8,
            goal_tolerance_m: 0.05,
        }
    }
}

impl SimWorld {
    pub fn new(params: SimWorldParams, dog_start_m: Point3<f64>) -> Self {
        let dog_height_m = params.dog_height_m;
        Self {
            params,
            time_s: 0.0,
            dog_position_m: Point3::new(dog_start_m.x, dog_start_m.y, dog_height_m),
            robot_position_m: Point3::origin(),
            robot_yaw_rad: 0.0,
            base_goal: None,
        }
    }

    /// Advance the world by `dt_s`.
    ///
    /// The dog chases `dog_target_m`, the base integrates `cmd` and, if a
    /// movement goal is in flight, steps towards its target.
    pub fn step(&mut self, dt_s: f64, dog_target_m: &Point3<f64>, cmd: &VelocityCmd) {
        self.time_s += dt_s;

        // Dog: first order chase of its planned point
        let k = clamp(&(self.params.dog_tracking_gain * dt_s), &0.0, &1.0);
        self.dog_position_m += (*dog_target_m - self.dog_position_m) * k;
        self.dog_position_m.z = self.params.dog_height_m;

        // Base: integrate the velocity command in the base frame
        let (sin_yaw, cos_yaw) = self.robot_yaw_rad.sin_cos();
        self.robot_position_m.x += (cmd.linear_x_ms * cos_yaw - cmd.linear_y_ms * sin_yaw) * dt_s;
        self.robot_position_m.y += (cmd.linear_x_ms * sin_yaw + cmd.linear_y_ms * cos_yaw) * dt_s;
        self.robot_yaw_rad += cmd.angular_z_rads * dt_s;

        // Base: step towards the movement goal target
        if let Some((target_m, handle)) = self.base_goal.clone() {
            if !handle.is_active() {
                self.base_goal = None;
            } else {
                let to_target = Vector2::new(
                    target_m.x - self.robot_position_m.x,
                    target_m.y - self.robot_position_m.y,
                );
                let distance_m = to_target.norm();

                if distance_m <= self.params.goal_tolerance_m {
                    handle.complete();
                    self.base_goal = None;
                } else {
                    let step_m = clamp(&(self.params.base_speed_ms * dt_s), &0.0, &distance_m);
                    let direction = to_target / distance_m;
                    self.robot_position_m.x += direction.x * step_m;
                    self.robot_position_m.y += direction.y * step_m;
                    self.robot_yaw_rad = direction.y.atan2(direction.x);
                }
            }
        }
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    pub fn dog_position_m(&self) -> Point3<f64> {
        self.dog_position_m
    }

    pub fn robot_position_m(&self) -> Point3<f64> {
        self.robot_position_m
    }

    fn map_from_base(&self, p: &Point3<f64>) -> Point3<f64> {
        let (sin_yaw, cos_yaw) = self.robot_yaw_rad.sin_cos();
        Point3::new(
            self.robot_position_m.x + p.x * cos_yaw - p.y * sin_yaw,
            self.robot_position_m.y + p.x * sin_yaw + p.y * cos_yaw,
            p.z,
        )
    }

    fn base_from_map(&self, p: &Point3<f64>) -> Point3<f64> {
        let (sin_yaw, cos_yaw) = self.robot_yaw_rad.sin_cos();
        let dx = p.x - self.robot_position_m.x;
        let dy = p.y - self.robot_position_m.y;
        Point3::new(dx * cos_yaw + dy * sin_yaw, -dx * sin_yaw + dy * cos_yaw, p.z)
    }

    fn hand_in_base(&self) -> Vector3<f64> {
        Vector3::new(self.params.hand_forward_m, 0.0, self.params.hand_height_m)
    }
}

impl SharedSim {
    pub fn new(world: SimWorld) -> Self {
        Self(Arc::new(Mutex::new(world)))
    }

    /// Advance the world by `dt_s`, see [`SimWorld::step`].
    pub fn step(&self, dt_s: f64, dog_target_m: &Point3<f64>, cmd: &VelocityCmd) {
        self.lock().step(dt_s, dog_target_m, cmd)
    }

    pub fn robot_position_m(&self) -> Point3<f64> {
        self.lock().robot_position_m()
    }

    pub fn dog_position_m(&self) -> Point3<f64> {
        self.lock().dog_position_m()
    }

    fn lock(&self) -> MutexGuard<'_, SimWorld> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for SharedSim {
    fn now_s(&self) -> f64 {
        self.lock().time_s
    }
}

impl ModelStateSource for SharedSim {
    fn dog_state(&self) -> Result<TimedPose, ClientError> {
        let world = self.lock();
        Ok(TimedPose {
            position_m: world.dog_position_m,
            orientation_q: walk_if::geom::quat_from_yaw(0.0),
            frame: Frame::Map,
            stamp_s: world.time_s,
        })
    }
}

impl FrameResolver for SharedSim {
    fn transform_point(
        &self,
        target: Frame,
        source: Frame,
        point_m: &Point3<f64>,
        _timeout_s: f64,
    ) -> Result<Point3<f64>, ClientError> {
        let world = self.lock();

        match (target, source) {
            (t, s) if t == s => Ok(*point_m),
            (Frame::BaseFootprint, Frame::Map) => Ok(world.base_from_map(point_m)),
            (Frame::Map, Frame::BaseFootprint) => Ok(world.map_from_base(point_m)),
            (Frame::BaseFootprint, Frame::WristRoll) => Ok(*point_m + world.hand_in_base()),
            (Frame::Map, Frame::WristRoll) => {
                Ok(world.map_from_base(&(*point_m + world.hand_in_base())))
            }
            (t, s) => Err(ClientError::ServiceUnavailable(format!(
                "transform {:?} -> {:?}",
                s, t
            ))),
        }
    }

    fn transform_pose(
        &self,
        target: Frame,
        pose: &TimedPose,
        timeout_s: f64,
    ) -> Result<TimedPose, ClientError> {
        let position_m = self.transform_point(target, pose.frame, &pose.position_m, timeout_s)?;

        let yaw_shift = {
            let world = self.lock();
            match (target, pose.frame) {
                (Frame::BaseFootprint, Frame::Map) => -world.robot_yaw_rad,
                (Frame::Map, Frame::BaseFootprint) => world.robot_yaw_rad,
                _ => 0.0,
            }
        };

        Ok(TimedPose {
            position_m,
            orientation_q: walk_if::geom::quat_from_yaw(pose.heading_rad() + yaw_shift),
            frame: target,
            stamp_s: pose.stamp_s,
        })
    }
}

impl MoveRobotClient for SharedSim {
    fn send_goal(&self, goal: MoveRobotGoal) -> GoalHandle {
        let mut world = self.lock();

        let target_map_m = match goal.frame {
            Frame::Map => goal.target_m,
            _ => world.map_from_base(&goal.target_m),
        };

        // A new goal replaces whatever the base was doing
        if let Some((_, old)) = world.base_goal.take() {
            old.cancel();
        }

        let handle = GoalHandle::new();
        world.base_goal = Some((target_map_m, handle.clone()));
        debug!(
            "Base goal: ({:.2}, {:.2}) in map",
            target_map_m.x, target_map_m.y
        );
        handle
    }
}

impl MoveArmClient for SharedSim {
    fn send_goal(&self, goal: MoveArmGoal) -> GoalHandle {
        // The sim base has no articulated arm, the hand rides along with the
        // base at a fixed offset. Accept the goal and report it done.
        debug!(
            "Arm goal accepted: ({:.2}, {:.2}, {:.2})",
            goal.target_m.x, goal.target_m.y, goal.target_m.z
        );
        let handle = GoalHandle::new();
        handle.complete();
        handle
    }
}

impl MarkerSink for SharedSim {
    fn publish_point(&self, ns: &str, position_m: &Point3<f64>, frame: Frame) {
        debug!(
            "Marker [{}]: ({:.2}, {:.2}, {:.2}) in {:?}",
            ns, position_m.x, position_m.y, position_m.z, frame
        );
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn shared_sim() -> SharedSim {
        SharedSim::new(SimWorld::new(
            SimWorldParams::default(),
            Point3::new(1.0, 0.0, 0.0),
        ))
    }

    #[test]
    fn test_dog_chases_target() {
        let sim = shared_sim();
        let target = Point3::new(3.0, 2.0, 0.0);

        for _ in 0..100 {
            sim.step(0.25, &target, &VelocityCmd::zero());
        }

        let dog = sim.dog_position_m();
        assert!((dog.x - 3.0).abs() < 0.01);
        assert!((dog.y - 2.0).abs() < 0.01);
        assert!((dog.z - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_base_integrates_command() {
        let sim = shared_sim();
        let cmd = VelocityCmd {
            linear_x_ms: 1.0,
            linear_y_ms: 0.0,
            angular_z_rads: 0.0,
        };

        for _ in 0..4 {
            sim.step(0.25, &Point3::new(1.0, 0.0, 0.0), &cmd);
        }

        let robot = sim.robot_position_m();
        assert!((robot.x - 1.0).abs() < 1e-9);
        assert!(robot.y.abs() < 1e-9);
    }

    #[test]
    fn test_map_base_round_trip() {
        let sim = shared_sim();
        // Turn and translate the base so the frames differ
        let cmd = VelocityCmd {
            linear_x_ms: 1.0,
            linear_y_ms: 0.0,
            angular_z_rads: 0.5,
        };
        sim.step(0.25, &Point3::new(1.0, 0.0, 0.0), &cmd);

        let p = Point3::new(2.0, -1.0, 0.0);
        let in_base = sim
            .transform_point(Frame::BaseFootprint, Frame::Map, &p, 0.1)
            .unwrap();
        let back = sim
            .transform_point(Frame::Map, Frame::BaseFootprint, &in_base, 0.1)
            .unwrap();

        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn test_hand_transform() {
        let sim = shared_sim();
        let hand = sim
            .transform_point(Frame::BaseFootprint, Frame::WristRoll, &Point3::origin(), 0.1)
            .unwrap();

        assert!((hand.x - 0.6).abs() < 1e-9);
        assert!(hand.y.abs() < 1e-9);
        assert!((hand.z - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_base_goal_completes() {
        let sim = shared_sim();
        let handle = MoveRobotClient::send_goal(
            &sim,
            MoveRobotGoal {
                target_m: Point3::new(2.0, 0.0, 0.0),
                frame: Frame::Map,
            },
        );

        for _ in 0..20 {
            sim.step(0.25, &Point3::new(1.0, 0.0, 0.0), &VelocityCmd::zero());
        }

        assert!(!handle.is_active());
        let robot = sim.robot_position_m();
        assert!((robot.x - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_cancelled_goal_stops_base() {
        let sim = shared_sim();
        let handle = MoveRobotClient::send_goal(
            &sim,
            MoveRobotGoal {
                target_m: Point3::new(10.0, 0.0, 0.0),
                frame: Frame::Map,
            },
        );

        sim.step(0.25, &Point3::new(1.0, 0.0, 0.0), &VelocityCmd::zero());
        handle.cancel();
        let before = sim.robot_position_m();

        sim.step(0.25, &Point3::new(1.0, 0.0, 0.0), &VelocityCmd::zero());
        let after = sim.robot_position_m();

        assert!((before.x - after.x).abs() < 1e-9);
    }
}
