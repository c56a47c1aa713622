//! # Walk driver
//!
//! The periodic follower loop. Each cycle the driver queries the path server
//! for the dog's current goal point, checks whether the dog is underfoot, and
//! either issues a coordination goal (normal mode) or synthesises a base
//! velocity command directly (solo mode).
//!
//! A cycle never blocks on its collaborators and never aborts the walk: any
//! upstream failure is logged and the cycle skipped, the loop picks up again
//! on the next tick.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

pub use params::WalkDriverParams;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info, warn};
use nalgebra::{Point3, Vector2};
use std::sync::Arc;
use thiserror::Error;
use util::maths::lin_map;

use walk_if::action::AdjustDogGoal;
use walk_if::geom::{Frame, VelocityCmd};
use walk_if::services::GetPathRequest;

use crate::clients::{Clock, FrameResolver, ModelStateSource, PathQuery};
use crate::coord_action::AdjustDogAction;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The collaborators a cycle runs against.
pub struct WalkCtx<'a> {
    pub clock: &'a dyn Clock,
    pub frames: &'a dyn FrameResolver,
    pub paths: &'a dyn PathQuery,
    pub dog: &'a dyn ModelStateSource,

    /// The coordination action, absent in solo mode
    pub coord: Option<&'a Arc<AdjustDogAction>>,
}

/// Telemetry from the last cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDriverReport {
    /// True once the walk has started
    pub started: bool,

    /// True once the walk has ended. Terminal.
    pub ended: bool,

    /// True if the dog was inside the avoidance box this cycle
    pub avoidance_active: bool,

    /// True if a coordination goal was issued this cycle
    pub goal_issued: bool,

    /// True if the cycle was skipped due to an upstream failure
    pub cycle_skipped: bool,

    /// Solo mode distance from the base to its shortened goal
    pub distance_to_goal_m: f64,
}

/// The walk driver.
pub struct WalkDriver {
    params: WalkDriverParams,
    report: WalkDriverReport,
    last_goal_time_s: Option<f64>,
    ended: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors raised by the walk driver.
#[derive(Debug, Error)]
pub enum WalkDriverError {
    #[error("Invalid parameter: {0}")]
    InvalidParams(&'static str),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WalkDriver {
    /// Initialise the driver, validating its parameters.
    pub fn init(params: WalkDriverParams) -> Result<Self, WalkDriverError> {
        if params.cycle_period_s <= 0.0 {
            return Err(WalkDriverError::InvalidParams(
                "cycle_period_s must be greater than zero",
            ));
        }
        if params.deceleration_distance_m <= 0.0 {
            return Err(WalkDriverError::InvalidParams(
                "deceleration_distance_m must be greater than zero",
            ));
        }
        if params.avoidance_threshold_m <= 0.0 {
            return Err(WalkDriverError::InvalidParams(
                "avoidance_threshold_m must be greater than zero",
            ));
        }

        Ok(Self {
            params,
            report: WalkDriverReport::default(),
            last_goal_time_s: None,
            ended: false,
        })
    }

    /// True once the walk has ended.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Run one control cycle.
    ///
    /// Returns the base command to apply this cycle, if any, plus the cycle's
    /// telemetry. `None` means no command this cycle.
    pub fn proc(&mut self, ctx: &WalkCtx) -> (Option<VelocityCmd>, WalkDriverReport) {
        self.report = WalkDriverReport::default();

        if self.ended {
            self.report.ended = true;
            return (None, self.report);
        }

        let now_s = ctx.clock.now_s();

        let path = match ctx.paths.get_path(GetPathRequest { time_s: now_s }) {
            Ok(path) => path,
            Err(e) => {
                warn!("Path query failed, skipping cycle: {}", e);
                self.report.cycle_skipped = true;
                return (None, self.report);
            }
        };

        if !path.started {
            debug!("Walk not started yet");
            return (None, self.report);
        }
        self.report.started = true;

        if path.ended {
            info!("Walk complete, stopping the base");
            self.ended = true;
            self.report.ended = true;
            return (Some(VelocityCmd::zero()), self.report);
        }

        // Dog pose and goal point, both in the base frame
        let dog_pose = match ctx.dog.dog_state() {
            Ok(pose) => pose,
            Err(e) => {
                warn!("Dog state unavailable, skipping cycle: {}", e);
                self.report.cycle_skipped = true;
                return (None, self.report);
            }
        };

        let timeout_s = self.params.transform_timeout_s;
        let dog_in_base =
            match ctx
                .frames
                .transform_pose(Frame::BaseFootprint, &dog_pose, timeout_s)
            {
                Ok(pose) => pose,
                Err(e) => {
                    warn!("Dog transform failed, skipping cycle: {}", e);
                    self.report.cycle_skipped = true;
                    return (None, self.report);
                }
            };

        let goal_in_base = match ctx.frames.transform_point(
            Frame::BaseFootprint,
            path.frame,
            &path.position_m,
            timeout_s,
        ) {
            Ok(point) => point,
            Err(e) => {
                warn!("Goal transform failed, skipping cycle: {}", e);
                self.report.cycle_skipped = true;
                return (None, self.report);
            }
        };

        // Is the dog in the box directly ahead of the base?
        let dog = dog_in_base.position_m;
        let threshold = self.params.avoidance_threshold_m;
        let avoid = dog.y.abs() < threshold && dog.x > 0.0 && dog.x < threshold;
        self.report.avoidance_active = avoid;

        if self.params.solo_mode {
            let cmd = self.solo_cmd(&goal_in_base, avoid, dog.y);
            return (cmd, self.report);
        }

        if avoid {
            info!("Dog underfoot, sidestepping");

            // Moving towards the leash targets would run the dog over, drop
            // any in-flight coordination goal
            if let Some(coord) = ctx.coord {
                coord.preempt();
            }

            let mut cmd = VelocityCmd::zero();
            cmd.linear_y_ms = -self.params.avoidance_speed_ms.copysign(dog.y);
            return (Some(cmd), self.report);
        }

        // Re-issue the coordination goal at a bounded rate
        let due = match self.last_goal_time_s {
            None => true,
            Some(t) => now_s - t >= self.params.goal_reissue_interval_s,
        };
        if due {
            if let Some(coord) = ctx.coord {
                coord.send_goal(AdjustDogGoal {
                    dog_pose,
                    goal_position_m: path.position_m,
                    goal_frame: path.frame,
                });
                self.last_goal_time_s = Some(now_s);
                self.report.goal_issued = true;
            }
        }

        (None, self.report)
    }

    /// Synthesise a base command straight towards the goal (solo mode).
    fn solo_cmd(
        &mut self,
        goal_in_base: &Point3<f64>,
        avoid: bool,
        dog_lateral_m: f64,
    ) -> Option<VelocityCmd> {
        // Aim one meter short of the goal so the base never closes right up
        // on the dog
        let mut goal = Vector2::new(goal_in_base.x, goal_in_base.y);
        let norm = goal.norm();
        if norm > f64::MIN_POSITIVE {
            goal -= goal / norm;
        }

        let distance_m = goal.norm();
        self.report.distance_to_goal_m = distance_m;

        let mut cmd = VelocityCmd::zero();

        if distance_m > self.params.deceleration_distance_m {
            cmd.linear_x_ms = self.params.max_linear_speed_ms;
        } else if distance_m < self.params.distance_threshold_m {
            debug!("On goal, holding position");
            return None;
        } else {
            // Proportional slow-down through the deceleration zone
            cmd.linear_x_ms = lin_map(
                (0.0, self.params.deceleration_distance_m),
                (0.0, self.params.max_linear_speed_ms),
                distance_m,
            );
        }

        if avoid {
            info!("Dog underfoot, sidestepping");
            cmd.linear_y_ms = -self.params.avoidance_speed_ms.copysign(dog_lateral_m);
        }

        cmd.angular_z_rads = goal.y.atan2(goal.x);

        Some(cmd)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Point3;
    use walk_if::geom::TimedPose;
    use walk_if::services::{ClientError, GetPathResponse};

    struct FixedClock(f64);

    impl Clock for FixedClock {
        fn now_s(&self) -> f64 {
            self.0
        }
    }

    /// Path query returning a canned response.
    struct StubPaths {
        resp: Result<GetPathResponse, ()>,
    }

    impl PathQuery for StubPaths {
        fn get_path(&self, _req: GetPathRequest) -> Result<GetPathResponse, ClientError> {
            self.resp
                .map_err(|_| ClientError::ServiceUnavailable("path server".into()))
        }
    }

    /// Identity transforms, everything is already in the base frame.
    struct IdentityFrames;

    impl FrameResolver for IdentityFrames {
        fn transform_point(
            &self,
            _target: Frame,
            _source: Frame,
            point_m: &Point3<f64>,
            _timeout_s: f64,
        ) -> Result<Point3<f64>, ClientError> {
            Ok(*point_m)
        }

        fn transform_pose(
            &self,
            target: Frame,
            pose: &TimedPose,
            _timeout_s: f64,
        ) -> Result<TimedPose, ClientError> {
            Ok(TimedPose {
                frame: target,
                ..*pose
            })
        }
    }

    struct StubDog {
        pose: TimedPose,
    }

    impl ModelStateSource for StubDog {
        fn dog_state(&self) -> Result<TimedPose, ClientError> {
            Ok(self.pose)
        }
    }

    fn path_response(started: bool, ended: bool, goal: Point3<f64>) -> GetPathResponse {
        GetPathResponse {
            position_m: goal,
            frame: Frame::Map,
            stamp_s: 0.0,
            started,
            ended,
            elapsed_s: 0.0,
        }
    }

    fn solo_driver(avoidance_threshold_m: f64) -> WalkDriver {
        WalkDriver::init(WalkDriverParams {
            solo_mode: true,
            avoidance_threshold_m,
            ..Default::default()
        })
        .unwrap()
    }

    fn run_cycle(
        driver: &mut WalkDriver,
        resp: Result<GetPathResponse, ()>,
        dog: TimedPose,
    ) -> (Option<VelocityCmd>, WalkDriverReport) {
        let clock = FixedClock(10.0);
        let frames = IdentityFrames;
        let paths = StubPaths { resp };
        let dog = StubDog { pose: dog };

        let ctx = WalkCtx {
            clock: &clock,
            frames: &frames,
            paths: &paths,
            dog: &dog,
            coord: None,
        };
        driver.proc(&ctx)
    }

    fn far_dog() -> TimedPose {
        TimedPose::new_ground(8.0, 8.0, 0.0, Frame::BaseFootprint, 0.0)
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = WalkDriver::init(WalkDriverParams {
            cycle_period_s: 0.0,
            ..Default::default()
        });
        assert!(matches!(result, Err(WalkDriverError::InvalidParams(_))));
    }

    #[test]
    fn test_not_started_no_command() {
        let mut driver = solo_driver(1.0);
        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(false, false, Point3::new(5.0, 0.0, 0.0))),
            far_dog(),
        );
        assert!(cmd.is_none());
        assert!(!report.started);
    }

    #[test]
    fn test_path_failure_skips_cycle() {
        let mut driver = solo_driver(1.0);
        let (cmd, report) = run_cycle(&mut driver, Err(()), far_dog());
        assert!(cmd.is_none());
        assert!(report.cycle_skipped);
    }

    #[test]
    fn test_ended_stops_base_and_is_terminal() {
        let mut driver = solo_driver(1.0);

        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, true, Point3::new(5.0, 0.0, 0.0))),
            far_dog(),
        );
        assert_eq!(cmd, Some(VelocityCmd::zero()));
        assert!(report.ended);

        // Later cycles stay ended without issuing further commands
        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(5.0, 0.0, 0.0))),
            far_dog(),
        );
        assert!(cmd.is_none());
        assert!(report.ended);
    }

    #[test]
    fn test_solo_full_speed_far_from_goal() {
        let mut driver = solo_driver(1.0);
        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(10.0, 0.0, 0.0))),
            far_dog(),
        );

        let cmd = cmd.unwrap();
        assert!((cmd.linear_x_ms - 2.0).abs() < 1e-9);
        assert!(cmd.linear_y_ms.abs() < 1e-9);
        // Goal shortened by 1 m along the approach direction
        assert!((report.distance_to_goal_m - 9.0).abs() < 1e-9);
        assert!(!report.avoidance_active);
    }

    #[test]
    fn test_solo_decelerates_near_goal() {
        let mut driver = solo_driver(1.0);
        // Goal at 1.5 m shortens to 0.5 m, inside the deceleration zone
        let (cmd, _) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(1.5, 0.0, 0.0))),
            far_dog(),
        );

        let cmd = cmd.unwrap();
        assert!((cmd.linear_x_ms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_solo_holds_on_goal() {
        let mut driver = solo_driver(1.0);
        // Goal at 1.005 m shortens to 5 mm, below the distance threshold
        let (cmd, _) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(1.005, 0.0, 0.0))),
            far_dog(),
        );
        assert!(cmd.is_none());
    }

    #[test]
    fn test_avoidance_triggers_inside_box() {
        let mut driver = solo_driver(1.25);
        let dog = TimedPose::new_ground(0.5, 0.2, 0.0, Frame::BaseFootprint, 0.0);

        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(10.0, 0.0, 0.0))),
            dog,
        );

        assert!(report.avoidance_active);
        // Dog to the left, sidestep right
        let cmd = cmd.unwrap();
        assert!((cmd.linear_y_ms + 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_avoidance_clear_outside_box() {
        let mut driver = solo_driver(1.25);
        let dog = TimedPose::new_ground(2.0, 0.2, 0.0, Frame::BaseFootprint, 0.0);

        let (cmd, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(10.0, 0.0, 0.0))),
            dog,
        );

        assert!(!report.avoidance_active);
        assert!(cmd.unwrap().linear_y_ms.abs() < 1e-9);
    }

    #[test]
    fn test_goal_reissue_interval() {
        use crate::coord_action::{AdjustDogAction, CoordActionParams};
        use crate::leash_ctrl::{LeashCtrl, LeashCtrlParams};
        use walk_if::action::{GoalHandle, MoveArmGoal, MoveRobotGoal};

        struct InstantMoveClient;

        impl crate::clients::MoveRobotClient for InstantMoveClient {
            fn send_goal(&self, _goal: MoveRobotGoal) -> GoalHandle {
                let handle = GoalHandle::new();
                handle.complete();
                handle
            }
        }

        impl crate::clients::MoveArmClient for InstantMoveClient {
            fn send_goal(&self, _goal: MoveArmGoal) -> GoalHandle {
                let handle = GoalHandle::new();
                handle.complete();
                handle
            }
        }

        let coord = Arc::new(AdjustDogAction::new(
            CoordActionParams {
                settle_wait_s: 0.01,
                transform_timeout_s: 0.1,
            },
            LeashCtrl::init(LeashCtrlParams::default()).unwrap(),
            Box::new(IdentityFrames),
            Box::new(InstantMoveClient),
            Box::new(InstantMoveClient),
        ));

        let mut driver = WalkDriver::init(WalkDriverParams::default()).unwrap();
        let frames = IdentityFrames;
        let paths = StubPaths {
            resp: Ok(path_response(true, false, Point3::new(10.0, 0.0, 0.0))),
        };
        let dog = StubDog { pose: far_dog() };

        let run_at = |driver: &mut WalkDriver, time_s: f64| {
            let clock = FixedClock(time_s);
            let ctx = WalkCtx {
                clock: &clock,
                frames: &frames,
                paths: &paths,
                dog: &dog,
                coord: Some(&coord),
            };
            driver.proc(&ctx).1
        };

        // First cycle issues a goal, a second cycle inside the interval does
        // not, a cycle past the interval does
        assert!(run_at(&mut driver, 10.0).goal_issued);
        assert!(!run_at(&mut driver, 10.5).goal_issued);
        assert!(run_at(&mut driver, 11.0).goal_issued);
    }

    #[test]
    fn test_avoidance_ignores_dog_behind() {
        let mut driver = solo_driver(1.25);
        let dog = TimedPose::new_ground(-0.5, 0.2, 0.0, Frame::BaseFootprint, 0.0);

        let (_, report) = run_cycle(
            &mut driver,
            Ok(path_response(true, false, Point3::new(10.0, 0.0, 0.0))),
            dog,
        );
        assert!(!report.avoidance_active);
    }
}
